//! Fixtures shared by the format tests.

use std::collections::HashSet;
use std::path::Path;

use quiz_babel::formats::text::{parse_text, TextOptions};
use quiz_babel::{MemoryAssets, QuestionType, Quiz};

pub fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

/// One question of every type, in two categories.
pub fn kitchensink() -> Quiz {
    parse_text(&fixture("kitchensink.md"), &TextOptions::default()).expect("kitchensink parses")
}

/// The images the kitchensink references.
pub fn kitchensink_images() -> MemoryAssets {
    MemoryAssets::new()
        .with_file("bg.png", b"background")
        .with_file("moon.png", b"moon")
        .with_file("fig.png", b"figure")
}

#[test]
fn kitchensink_covers_every_type() {
    let quiz = kitchensink();
    let types: HashSet<QuestionType> = quiz.questions.iter().map(|q| q.question_type()).collect();
    for question_type in QuestionType::ALL {
        assert!(types.contains(&question_type), "kitchensink lacks {question_type}");
    }
    assert_eq!(quiz.questions.len(), 18);
}
