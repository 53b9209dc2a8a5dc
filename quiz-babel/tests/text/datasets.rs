use quiz_babel::common::sigfig::count_sigfigs;
use quiz_babel::common::number::format_number;
use quiz_babel::formats::text::{parse_text, TextOptions};
use quiz_babel::QuizError;

use crate::common::kitchensink;

const SHARED: &str = "\
N_SAMPLES: 50
SEED: 7
   ----------------
# NAME: Waves
   TYPE: category
   SHARED_VARS: f=[100, 1000];
   TEXT:
   ----------------
1. NAME: period
   TYPE: calculated
   PRIVATE_VARS: T=1/f;
   EQUATION: {T}
   TEXT:
   A wave has frequency {f} Hz.
   ----------------
1. NAME: frequency
   TYPE: calculated
   EQUATION: {f}*2
   TEXT:
   Double {f}.";

#[test]
fn shared_variables_are_identical_across_questions() {
    let quiz = parse_text(SHARED, &TextOptions::default()).unwrap();
    assert_eq!(quiz.n_samples, 50);
    let first = quiz.questions[1].variables().iter().find(|v| v.name == "f").unwrap();
    let second = quiz.questions[2].variables().iter().find(|v| v.name == "f").unwrap();
    assert_eq!(first, second);
    assert!(first.shared);
    assert_eq!(first.values.len(), 50);
}

#[test]
fn samples_stay_in_range_with_three_figures() {
    let quiz = parse_text(SHARED, &TextOptions::default()).unwrap();
    let f = &quiz.questions[2].variables()[0];
    for value in &f.values {
        assert!((100.0..=1000.0).contains(value));
        assert!(count_sigfigs(&format_number(*value)) <= 3);
    }
}

#[test]
fn expression_variables_carry_their_order() {
    let quiz = parse_text(SHARED, &TextOptions::default()).unwrap();
    let names: Vec<(&str, u32)> = quiz.questions[1]
        .variables()
        .iter()
        .map(|v| (v.name.as_str(), v.order))
        .collect();
    assert_eq!(names, [("f", 0), ("T", 1)]);
}

#[test]
fn same_seed_same_datasets() {
    let a = parse_text(SHARED, &TextOptions::default()).unwrap();
    let b = parse_text(SHARED, &TextOptions::default()).unwrap();
    assert_eq!(a, b);

    let reseeded = SHARED.replace("SEED: 7", "SEED: 8");
    let c = parse_text(&reseeded, &TextOptions::default()).unwrap();
    assert_ne!(a.questions[1].variables(), c.questions[1].variables());
}

#[test]
fn conflicting_shared_definitions_fail() {
    let source = SHARED.replace(
        "   EQUATION: {f}*2",
        "   SHARED_VARS: f=[1, 10];\n   EQUATION: {f}*2",
    );
    let err = parse_text(&source, &TextOptions::default()).unwrap_err();
    assert!(matches!(err, QuizError::ConflictingDefinition { name, .. } if name == "f"));
}

#[test]
fn undefined_variables_are_named() {
    let source = SHARED.replace("EQUATION: {f}*2", "EQUATION: {f}*{k}");
    let err = parse_text(&source, &TextOptions::default()).unwrap_err();
    assert!(
        matches!(err, QuizError::UndefinedReference { question, name } if question == "frequency" && name == "k")
    );
}

#[test]
fn shared_variables_reset_at_each_category() {
    let quiz = kitchensink();
    let words = quiz
        .questions
        .iter()
        .skip_while(|q| q.name != "Mechanics/Words")
        .flat_map(|q| q.variables())
        .count();
    assert_eq!(words, 0);
}
