//! In-memory quiz shared by both encodings
//!
//! A [`Quiz`] is an ordered list of [`Question`]s. Category boundaries are
//! questions of kind [`QuestionKind::Category`]; everything after one belongs
//! to it until the next.
//!
//! Bodies are always held in the text notation: `$...$` math, `DOLLAR_SIGN`
//! for a literal dollar, `![](path){width=N}` images. The XML codec converts
//! at the boundary.

mod gaps;
mod types;
mod validate;

use std::fmt;
use std::str::FromStr;

use crate::common::natural::natural_cmp;
use crate::error::Result;
use crate::variables::Variable;

pub use gaps::{gap_markers, GapMarker};
pub use types::*;
pub use validate::validate_question;

/// Default `N_SAMPLES:`.
pub const DEFAULT_SAMPLES: usize = 200;

/// Every supported question type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionType {
    Category,
    Description,
    Essay,
    ShortAnswer,
    TrueFalse,
    MultiChoice,
    Matching,
    Numerical,
    Calculated,
    CalculatedSimple,
    CalculatedMulti,
    GapSelect,
    DragWords,
    DragImageOrText,
    DragMarker,
    RandomShortAnswerMatch,
    Cloze,
}

impl QuestionType {
    pub const ALL: [QuestionType; 17] = [
        QuestionType::Category,
        QuestionType::Description,
        QuestionType::Essay,
        QuestionType::ShortAnswer,
        QuestionType::TrueFalse,
        QuestionType::MultiChoice,
        QuestionType::Matching,
        QuestionType::Numerical,
        QuestionType::Calculated,
        QuestionType::CalculatedSimple,
        QuestionType::CalculatedMulti,
        QuestionType::GapSelect,
        QuestionType::DragWords,
        QuestionType::DragImageOrText,
        QuestionType::DragMarker,
        QuestionType::RandomShortAnswerMatch,
        QuestionType::Cloze,
    ];

    /// The `type` attribute and `TYPE:` value.
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Category => "category",
            QuestionType::Description => "description",
            QuestionType::Essay => "essay",
            QuestionType::ShortAnswer => "shortanswer",
            QuestionType::TrueFalse => "truefalse",
            QuestionType::MultiChoice => "multichoice",
            QuestionType::Matching => "matching",
            QuestionType::Numerical => "numerical",
            QuestionType::Calculated => "calculated",
            QuestionType::CalculatedSimple => "calculatedsimple",
            QuestionType::CalculatedMulti => "calculatedmulti",
            QuestionType::GapSelect => "gapselect",
            QuestionType::DragWords => "ddwtos",
            QuestionType::DragImageOrText => "ddimageortext",
            QuestionType::DragMarker => "ddmarker",
            QuestionType::RandomShortAnswerMatch => "randomsamatch",
            QuestionType::Cloze => "cloze",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fails with the message a format attaches to the offending question.
impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();
        let alias = match s {
            "missing_words" => "gapselect",
            "calculated_simple" => "calculatedsimple",
            other => other,
        };
        QuestionType::ALL
            .into_iter()
            .find(|t| t.as_str() == alias)
            .ok_or_else(|| format!("unknown question type '{s}'"))
    }
}

/// Question text plus the `MARKDOWN` marker.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub text: String,
    pub markdown: bool,
}

impl Body {
    pub fn new(text: impl Into<String>, markdown: bool) -> Self {
        Body {
            text: text.into(),
            markdown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    /// For categories, the category path `X/Y`.
    pub name: String,
    pub body: Body,
    pub kind: QuestionKind,
}

impl Question {
    pub fn new(name: impl Into<String>, body: Body, kind: QuestionKind) -> Self {
        Question {
            name: name.into(),
            body,
            kind,
        }
    }

    pub fn category(path: impl Into<String>, markdown: bool) -> Self {
        Question::new(path, Body::new("", markdown), QuestionKind::Category)
    }

    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    pub fn is_category(&self) -> bool {
        matches!(self.kind, QuestionKind::Category)
    }

    /// Datasets of a calculated question.
    pub fn variables(&self) -> &[Variable] {
        match &self.kind {
            QuestionKind::Calculated(calc)
            | QuestionKind::CalculatedSimple(calc)
            | QuestionKind::CalculatedMulti { calc, .. } => &calc.variables,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quiz {
    pub n_samples: usize,
    pub seed: u64,
    pub questions: Vec<Question>,
}

impl Default for Quiz {
    fn default() -> Self {
        Quiz {
            n_samples: DEFAULT_SAMPLES,
            seed: 0,
            questions: Vec::new(),
        }
    }
}

impl Quiz {
    pub fn new(questions: Vec<Question>) -> Self {
        Quiz {
            questions,
            ..Default::default()
        }
    }

    /// Check every question against the rules of its type.
    pub fn validate(&self) -> Result<()> {
        self.questions.iter().try_for_each(validate_question)
    }

    /// A copy with questions in natural name order within each category.
    /// Categories keep their positions.
    pub fn sorted(&self) -> Quiz {
        let mut questions = Vec::with_capacity(self.questions.len());
        let mut run: Vec<Question> = Vec::new();
        let flush = |run: &mut Vec<Question>, out: &mut Vec<Question>| {
            run.sort_by(|a, b| natural_cmp(&a.name, &b.name));
            out.append(run);
        };
        for question in &self.questions {
            if question.is_category() {
                flush(&mut run, &mut questions);
                questions.push(question.clone());
            } else {
                run.push(question.clone());
            }
        }
        flush(&mut run, &mut questions);
        Quiz {
            questions,
            ..self.clone()
        }
    }
}
