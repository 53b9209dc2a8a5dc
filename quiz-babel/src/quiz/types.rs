use std::fmt;
use std::str::FromStr;

use super::QuestionType;
use crate::variables::Variable;

/// A text answer and its grade in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub fraction: f64,
}

impl Answer {
    pub fn new(text: impl Into<String>, fraction: f64) -> Self {
        Answer {
            text: text.into(),
            fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericalAnswer {
    pub value: f64,
    pub fraction: f64,
    /// Absolute.
    pub tolerance: f64,
}

/// One graded formula of a calculated question.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub formula: String,
    pub fraction: f64,
    /// Relative tolerance.
    pub tolerance: f64,
    /// Significant figures shown in the correct answer.
    pub answer_length: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Calculated {
    pub answers: Vec<Formula>,
    /// Sorted by [`Variable::sort_key`].
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchPair {
    pub question: String,
    pub answer: String,
}

/// A choice of a gap question: `[[group@text]]` in the body or a
/// distractor line. `unlimited` is written as a `U` after the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapChoice {
    pub group: u32,
    pub unlimited: bool,
    pub text: String,
}

impl GapChoice {
    /// `1` or `1U`.
    pub fn group_label(&self) -> String {
        if self.unlimited {
            format!("{}U", self.group)
        } else {
            self.group.to_string()
        }
    }

    /// Parse `1` / `1U` into a group number and unlimited flag.
    pub fn parse_group(label: &str) -> Option<(u32, bool)> {
        let label = label.trim();
        let (number, unlimited) = match label.strip_suffix('U') {
            Some(number) => (number, true),
            None => (label, false),
        };
        number.trim().parse().ok().map(|group| (group, unlimited))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragContent {
    Text(String),
    /// Image reference path.
    Image(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragItem {
    pub group: u32,
    pub content: DragContent,
    pub infinite: bool,
}

/// A drop target; `choice` is the 1-based index of a drag item.
#[derive(Debug, Clone, PartialEq)]
pub struct DropZone {
    pub x: i64,
    pub y: i64,
    pub choice: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerUses {
    Infinite,
    Limited(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub text: String,
    pub uses: MarkerUses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Circle,
    Rectangle,
    Polygon,
}

impl Shape {
    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Circle => "circle",
            Shape::Rectangle => "rectangle",
            Shape::Polygon => "polygon",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s.trim() {
            "c" | "C" | "circle" | "Circle" | "CIRCLE" => Ok(Shape::Circle),
            "r" | "R" | "rectangle" | "Rectangle" | "RECTANGLE" => Ok(Shape::Rectangle),
            "p" | "P" | "polygon" | "Polygon" | "POLYGON" => Ok(Shape::Polygon),
            other => Err(format!("unknown shape mask '{other}'")),
        }
    }
}

/// A marker target: shape, its coordinates as written, and the marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerZone {
    pub shape: Shape,
    pub coords: String,
    pub choice: usize,
}

/// Variant-dependent payload of a question.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    Category,
    Description,
    Essay,
    /// Embedded-answer tokens live in the body.
    Cloze,
    ShortAnswer {
        case_sensitive: bool,
        answers: Vec<Answer>,
    },
    TrueFalse {
        answers: Vec<Answer>,
    },
    MultiChoice {
        single: bool,
        shuffle: bool,
        answers: Vec<Answer>,
    },
    Matching {
        shuffle: bool,
        pairs: Vec<MatchPair>,
    },
    Numerical {
        answers: Vec<NumericalAnswer>,
    },
    Calculated(Calculated),
    CalculatedSimple(Calculated),
    CalculatedMulti {
        single: bool,
        calc: Calculated,
    },
    /// Correct choices are the `[[group@text]]` markers of the body.
    GapSelect {
        shuffle: bool,
        distractors: Vec<GapChoice>,
    },
    DragWords {
        shuffle: bool,
        distractors: Vec<GapChoice>,
    },
    DragImageOrText {
        shuffle: bool,
        background: Option<String>,
        drags: Vec<DragItem>,
        drops: Vec<DropZone>,
    },
    DragMarker {
        shuffle: bool,
        show_misplaced: bool,
        background: Option<String>,
        markers: Vec<Marker>,
        zones: Vec<MarkerZone>,
    },
    RandomShortAnswerMatch {
        choose: u32,
        subcats: bool,
    },
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Category => QuestionType::Category,
            QuestionKind::Description => QuestionType::Description,
            QuestionKind::Essay => QuestionType::Essay,
            QuestionKind::Cloze => QuestionType::Cloze,
            QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::MultiChoice { .. } => QuestionType::MultiChoice,
            QuestionKind::Matching { .. } => QuestionType::Matching,
            QuestionKind::Numerical { .. } => QuestionType::Numerical,
            QuestionKind::Calculated(_) => QuestionType::Calculated,
            QuestionKind::CalculatedSimple(_) => QuestionType::CalculatedSimple,
            QuestionKind::CalculatedMulti { .. } => QuestionType::CalculatedMulti,
            QuestionKind::GapSelect { .. } => QuestionType::GapSelect,
            QuestionKind::DragWords { .. } => QuestionType::DragWords,
            QuestionKind::DragImageOrText { .. } => QuestionType::DragImageOrText,
            QuestionKind::DragMarker { .. } => QuestionType::DragMarker,
            QuestionKind::RandomShortAnswerMatch { .. } => QuestionType::RandomShortAnswerMatch,
        }
    }
}
