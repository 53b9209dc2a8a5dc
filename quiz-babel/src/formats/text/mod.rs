//! Plain-text quiz notation
//!
//! A document is a preamble followed by question blocks separated by dash
//! rules (ten or more `-` on a line of their own):
//!
//! ```text
//!    N_SAMPLES:        200
//!
//!    -------------------------------------------------------------
//!
//! # NAME:              Kinematics
//!
//!    TYPE:             category
//!
//!    -------------------------------------------------------------
//!
//! 1. NAME:             Falling stone
//!
//!    TYPE:             calculated
//!
//!    PRIVATE_VARS:     h=[5.0, 50.0];
//!
//!    EQUATION:         sqrt(2*{h}/9.81)
//!
//!    TOLERANCE:        0.0125
//!
//!    TEXT:
//!
//!    A stone falls from {h} m. How long does it take?
//! ```
//!
//! Everything above `TEXT:` is the header: one label per line, repeated labels
//! give repeated entries, and `1.` / `#` prefixes are ignored. Everything
//! below it is the body, up to an optional `DRAG_DROP:` table that ends at a
//! `%%%` line.
//!
//! Weighted entries are written `weight +++ value`; numerical answers and
//! equations accept a third field with an absolute tolerance, equations a
//! fourth with the answer length.
//!
//! Shared variables belong to the run of blocks between two categories and
//! may be declared in any block of the run. Private variables belong to their
//! question. A calculated question keeps the variables its body and equations
//! reference, plus whatever those are computed from.

pub mod dragdrop;
mod parser;
mod serializer;

use crate::assets::AssetStore;
use crate::error::Result;
use crate::format::Format;
use crate::quiz::{Quiz, DEFAULT_SAMPLES};

pub use parser::parse_text;
pub use serializer::serialize_text;

/// Relative tolerance of numerical answers and absolute tolerance of
/// calculated equations when no `TOLERANCE:` is given.
pub const DEFAULT_TOLERANCE: f64 = 0.0125;
/// Absolute tolerance added to numerical answers when no `ACCURACY:` is given.
pub const DEFAULT_ACCURACY: f64 = 0.0125;

/// Header labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Label {
    Name,
    Type,
    Answer,
    Tolerance,
    Accuracy,
    Sigfigs,
    SharedVars,
    PrivateVars,
    Equation,
    WrongAnswer,
    Pair,
    Shuffle,
    SingleAnswer,
    Case,
    Choose,
    Subcats,
    ShowMisplaced,
    Markdown,
}

impl Label {
    pub(crate) const ALL: [Label; 18] = [
        Label::Name,
        Label::Type,
        Label::Answer,
        Label::Tolerance,
        Label::Accuracy,
        Label::Sigfigs,
        Label::SharedVars,
        Label::PrivateVars,
        Label::Equation,
        Label::WrongAnswer,
        Label::Pair,
        Label::Shuffle,
        Label::SingleAnswer,
        Label::Case,
        Label::Choose,
        Label::Subcats,
        Label::ShowMisplaced,
        Label::Markdown,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Label::Name => "NAME:",
            Label::Type => "TYPE:",
            Label::Answer => "ANSWER:",
            Label::Tolerance => "TOLERANCE:",
            Label::Accuracy => "ACCURACY:",
            Label::Sigfigs => "SIGFIGS:",
            Label::SharedVars => "SHARED_VARS:",
            Label::PrivateVars => "PRIVATE_VARS:",
            Label::Equation => "EQUATION:",
            Label::WrongAnswer => "CAT&WRONG_ANS:",
            Label::Pair => "Q&A:",
            Label::Shuffle => "SHUFFLE:",
            Label::SingleAnswer => "SINGLE_ANSWER_Q:",
            Label::Case => "CASE:",
            Label::Choose => "CHOOSE:",
            Label::Subcats => "SUBCATS:",
            Label::ShowMisplaced => "SHOWMISPLACED:",
            Label::Markdown => "MARKDOWN",
        }
    }
}

/// Defaults for documents whose preamble leaves settings out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOptions {
    pub n_samples: usize,
    pub seed: u64,
}

impl Default for TextOptions {
    fn default() -> Self {
        TextOptions {
            n_samples: DEFAULT_SAMPLES,
            seed: 0,
        }
    }
}

/// Format implementation for the plain-text notation
#[derive(Debug, Clone, Default)]
pub struct TextFormat {
    options: TextOptions,
}

impl TextFormat {
    pub fn new(options: TextOptions) -> Self {
        TextFormat { options }
    }

    pub fn options(&self) -> &TextOptions {
        &self.options
    }
}

impl Format for TextFormat {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Plain-text quiz notation with optional Markdown bodies"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "txt"]
    }

    fn parse(&self, source: &str, _assets: &mut dyn AssetStore) -> Result<Quiz> {
        parse_text(source, &self.options)
    }

    fn serialize(&self, quiz: &Quiz, _assets: &mut dyn AssetStore) -> Result<String> {
        serialize_text(quiz)
    }
}
