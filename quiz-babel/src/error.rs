//! Error types for quiz conversion

use thiserror::Error;

/// Errors that can occur while reading, building or writing a quiz.
///
/// Every variant that concerns a single question carries its name so the
/// operator can find the offending block in the source document.
#[derive(Debug, Error)]
pub enum QuizError {
    /// Format not found in registry
    #[error("Format '{0}' not found")]
    FormatNotFound(String),

    /// A question breaks the rules of its type (weights, drag capacity, unknown type)
    #[error("Question '{question}': {message}")]
    SchemaViolation { question: String, message: String },

    /// A variable is referenced but not defined in any visible scope
    #[error("Question '{question}': variable '{name}' is undefined")]
    UndefinedReference { question: String, name: String },

    /// A shared variable is declared twice with different definitions
    #[error("Category '{category}': shared variable '{name}' is declared twice with different definitions")]
    ConflictingDefinition { category: String, name: String },

    /// Malformed plain-text notation
    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed or incomplete XML
    #[error("XML error: {0}")]
    Xml(String),

    /// An arithmetic expression could not be evaluated
    #[error("Expression error in '{expression}': {message}")]
    Expression { expression: String, message: String },

    /// A cloze constructor call has arguments of an unsupported shape
    #[error("Question '{question}': cloze error in {call}(...): {message}")]
    Cloze {
        question: String,
        call: String,
        message: String,
    },

    /// Reading, writing or fetching an image failed
    #[error("Asset error for '{path}': {message}")]
    Asset { path: String, message: String },

    /// Conflicting converter options
    #[error("Invalid options: {0}")]
    Options(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuizError {
    pub fn schema(question: impl Into<String>, message: impl Into<String>) -> Self {
        QuizError::SchemaViolation {
            question: question.into(),
            message: message.into(),
        }
    }

    pub fn undefined(question: impl Into<String>, name: impl Into<String>) -> Self {
        QuizError::UndefinedReference {
            question: question.into(),
            name: name.into(),
        }
    }
}

impl From<roxmltree::Error> for QuizError {
    fn from(err: roxmltree::Error) -> Self {
        QuizError::Xml(err.to_string())
    }
}

pub type Result<T, E = QuizError> = std::result::Result<T, E>;
