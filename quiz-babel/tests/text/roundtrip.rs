use quiz_babel::formats::text::{parse_text, serialize_text, TextOptions};
use quiz_babel::{FormatRegistry, MemoryAssets, QuestionKind, QuizError};

use crate::common::{fixture, kitchensink};

#[test]
fn kitchensink_reads_back_unchanged() {
    let quiz = kitchensink();
    let text = serialize_text(&quiz).unwrap();
    let again = parse_text(&text, &TextOptions::default()).unwrap();
    assert_eq!(again, quiz);
    assert_eq!(serialize_text(&again).unwrap(), text);
}

#[test]
fn written_text_keeps_the_layout() {
    let text = serialize_text(&kitchensink()).unwrap();
    assert!(text.starts_with("   N_SAMPLES:        200\n"));
    assert!(text.contains("## NAME:             Mechanics/Words\n"));
    assert!(text.contains("1. NAME:             Units\n"));
    assert_eq!(text.matches("SHARED_VARS:").count(), 1);
    assert!(text.contains("%%% Preview for Markdown editors"));
    assert!(text.contains("{1:MULTICHOICE_S:=W~J~N}"));
}

#[test]
fn cloze_calls_become_tokens() {
    let quiz = kitchensink();
    let units = quiz.questions.iter().find(|q| q.name == "Units").unwrap();
    assert!(matches!(units.kind, QuestionKind::Cloze));
    assert!(!units.body.text.contains("MULTICHOICE("));
    assert!(units.body.text.contains("{1:NUMERICAL:="));
}

#[test]
fn registry_detects_the_text_format() {
    let registry = FormatRegistry::default();
    assert_eq!(registry.detect_format_from_filename("quiz.md").as_deref(), Some("text"));
    assert_eq!(registry.detect_format_from_filename("quiz.txt").as_deref(), Some("text"));

    let mut assets = MemoryAssets::new();
    let quiz = registry
        .parse(&fixture("kitchensink.md"), "text", &mut assets)
        .unwrap();
    assert_eq!(quiz, kitchensink());
}

#[test]
fn sorting_keeps_categories_in_place() {
    let source = "\
1. NAME: q10
   TYPE: essay
   TEXT:
   ten
   ----------------
1. NAME: q2
   TYPE: essay
   TEXT:
   two
   ----------------
# NAME: Later
   TYPE: category
   TEXT:
   ----------------
1. NAME: b
   TYPE: essay
   TEXT:
   b
   ----------------
1. NAME: a
   TYPE: essay
   TEXT:
   a";
    let quiz = parse_text(source, &TextOptions::default()).unwrap().sorted();
    let names: Vec<&str> = quiz.questions.iter().map(|q| q.name.as_str()).collect();
    assert_eq!(names, ["q2", "q10", "Later", "a", "b"]);
}

#[test]
fn bad_weights_stop_the_whole_document() {
    let source = "\
1. NAME: sa
   TYPE: shortanswer
   ANSWER: 99 +++ x
   TEXT:
   ?";
    let err = parse_text(source, &TextOptions::default()).unwrap_err();
    assert!(matches!(err, QuizError::SchemaViolation { question, .. } if question == "sa"));
}
