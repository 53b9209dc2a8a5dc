//! [`Quiz`] → plain-text notation

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::dragdrop::{write_image_table, write_marker_table};
use super::{Label, DEFAULT_ACCURACY, DEFAULT_TOLERANCE};
use crate::common::number::format_number;
use crate::error::Result;
use crate::quiz::{Answer, Calculated, GapChoice, Question, QuestionKind, Quiz};
use crate::variables::{Variable, DEFAULT_SIGFIGS};

/// Indentation of labels and body lines.
pub const CODESPACE: &str = "   ";
const LABEL_WIDTH: usize = 18;
const RULE: &str = "\n\n   -------------------------------------------------------------\n\n";
const WEIGHT_SEPARATOR: &str = "  +++  ";

static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Write a whole document. Fails on a quiz that breaks its schema rules.
pub fn serialize_text(quiz: &Quiz) -> Result<String> {
    quiz.validate()?;

    let mut out = String::new();
    push_line(&mut out, "N_SAMPLES:", &quiz.n_samples.to_string());
    if quiz.seed != 0 {
        push_line(&mut out, "SEED:", &quiz.seed.to_string());
    }

    let mut emitted_shared: HashSet<String> = HashSet::new();
    for question in &quiz.questions {
        if question.is_category() {
            emitted_shared.clear();
        }
        out.push_str(RULE);
        write_question(&mut out, question, &mut emitted_shared);
    }
    Ok(normalize(&out))
}

/// Right-trim every line, turn lone `.` lines blank and collapse blank runs.
fn normalize(text: &str) -> String {
    let trimmed: Vec<&str> = text.lines().map(str::trim_end).collect();
    let joined = trimmed.join("\n").replace("\n.\n", "\n\n");
    let mut out = BLANK_RUN.replace_all(&joined, "\n\n").trim_end().to_string();
    out.push('\n');
    out
}

fn push_line(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!("{CODESPACE}{label:<LABEL_WIDTH$}{value}\n\n"));
}

fn push_label(out: &mut String, label: Label, value: &str) {
    push_line(out, label.as_str(), value);
}

fn flag_text(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("{CODESPACE}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn weighted(fraction: f64, value: &str) -> String {
    format!("{}{WEIGHT_SEPARATOR}{value}", format_number(fraction))
}

fn write_question(out: &mut String, question: &Question, emitted_shared: &mut HashSet<String>) {
    let prefix = if question.is_category() {
        "#".repeat(question.name.matches('/').count() + 1)
    } else {
        "1.".to_string()
    };
    out.push_str(&format!("{prefix} {:<LABEL_WIDTH$}{}\n\n", "NAME:", question.name));
    push_label(out, Label::Type, question.question_type().as_str());

    let mut dragdrop = None;
    match &question.kind {
        QuestionKind::Category
        | QuestionKind::Description
        | QuestionKind::Essay
        | QuestionKind::Cloze => {}
        QuestionKind::ShortAnswer {
            case_sensitive,
            answers,
        } => {
            push_label(out, Label::Case, if *case_sensitive { "1" } else { "0" });
            for answer in answers {
                push_label(out, Label::Answer, &weighted(answer.fraction, &answer.text));
            }
        }
        QuestionKind::TrueFalse { answers } => {
            for answer in answers {
                push_label(out, Label::Answer, &weighted(answer.fraction, &answer.text));
            }
        }
        QuestionKind::MultiChoice {
            single,
            shuffle,
            answers,
        } => {
            push_label(out, Label::Shuffle, flag_text(*shuffle));
            push_label(out, Label::SingleAnswer, flag_text(*single));
            write_answers(out, answers);
        }
        QuestionKind::Matching { shuffle, pairs } => {
            push_label(out, Label::Shuffle, flag_text(*shuffle));
            for pair in pairs {
                push_label(out, Label::Pair, &format!("{} +++ {}", pair.question, pair.answer));
            }
        }
        QuestionKind::Numerical { answers } => {
            let default = |value: f64| (DEFAULT_TOLERANCE * value + DEFAULT_ACCURACY).abs();
            match answers.as_slice() {
                [only] if only.fraction == 100.0 && only.tolerance == default(only.value) => {
                    push_label(out, Label::Answer, &format_number(only.value));
                }
                answers => {
                    for answer in answers {
                        let mut entry = weighted(answer.fraction, &format_number(answer.value));
                        if answer.tolerance != default(answer.value) {
                            entry.push_str(WEIGHT_SEPARATOR);
                            entry.push_str(&format_number(answer.tolerance));
                        }
                        push_label(out, Label::Answer, &entry);
                    }
                }
            }
        }
        QuestionKind::Calculated(calc) | QuestionKind::CalculatedSimple(calc) => {
            write_calculated(out, calc, emitted_shared);
        }
        QuestionKind::CalculatedMulti { single, calc } => {
            push_label(out, Label::SingleAnswer, flag_text(*single));
            write_calculated(out, calc, emitted_shared);
        }
        QuestionKind::GapSelect {
            shuffle,
            distractors,
        }
        | QuestionKind::DragWords {
            shuffle,
            distractors,
        } => {
            push_label(out, Label::Shuffle, flag_text(*shuffle));
            write_distractors(out, distractors);
        }
        QuestionKind::DragImageOrText {
            shuffle,
            background,
            drags,
            drops,
        } => {
            push_label(out, Label::Shuffle, flag_text(*shuffle));
            dragdrop = Some(write_image_table(background.as_deref(), drags, drops));
        }
        QuestionKind::DragMarker {
            shuffle,
            show_misplaced,
            background,
            markers,
            zones,
        } => {
            push_label(out, Label::Shuffle, flag_text(*shuffle));
            push_label(out, Label::ShowMisplaced, flag_text(*show_misplaced));
            dragdrop = Some(write_marker_table(background.as_deref(), markers, zones));
        }
        QuestionKind::RandomShortAnswerMatch { choose, subcats } => {
            push_label(out, Label::Subcats, flag_text(*subcats));
            push_label(out, Label::Choose, &choose.to_string());
        }
    }

    if question.body.markdown {
        out.push_str(&format!("{CODESPACE}{}\n\n", Label::Markdown.as_str()));
    }
    out.push_str(&format!("{CODESPACE}TEXT:\n\n{}\n", indent(&question.body.text)));
    if let Some(table) = dragdrop {
        out.push_str(&format!("\n{CODESPACE}DRAG_DROP:\n\n{}\n\n", indent(&table)));
    }
}

/// A lone full-marks answer is written bare, anything else weighted.
fn write_answers(out: &mut String, answers: &[Answer]) {
    match answers {
        [only] if only.fraction == 100.0 => push_label(out, Label::Answer, &only.text),
        answers => {
            for answer in answers {
                push_label(out, Label::Answer, &weighted(answer.fraction, &answer.text));
            }
        }
    }
}

fn write_distractors(out: &mut String, distractors: &[GapChoice]) {
    for choice in distractors {
        let entry = format!("{}{WEIGHT_SEPARATOR}{}", choice.group_label(), choice.text);
        push_label(out, Label::WrongAnswer, &entry);
    }
}

fn declaration(variable: &Variable) -> String {
    let definition = variable
        .expression
        .clone()
        .unwrap_or_else(|| variable.range_literal());
    if variable.sigfigs == DEFAULT_SIGFIGS {
        format!("{}={definition};", variable.name)
    } else {
        format!("{}={{{definition} sigfigs:{}}};", variable.name, variable.sigfigs)
    }
}

/// Variables, equations and the shared tolerance of a calculated question.
///
/// Shared variables are written once per category, at their first use.
fn write_calculated(out: &mut String, calc: &Calculated, emitted_shared: &mut HashSet<String>) {
    let mut variables: Vec<&Variable> = calc.variables.iter().collect();
    variables.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    for variable in variables {
        let label = if variable.shared {
            if !emitted_shared.insert(variable.name.clone()) {
                continue;
            }
            Label::SharedVars
        } else {
            Label::PrivateVars
        };
        push_label(out, label, &declaration(variable));
    }

    let (tolerance, length) = calc
        .answers
        .first()
        .map_or((DEFAULT_TOLERANCE, DEFAULT_SIGFIGS), |a| (a.tolerance, a.answer_length));
    match calc.answers.as_slice() {
        [only] if only.fraction == 100.0 => push_label(out, Label::Equation, &only.formula),
        answers => {
            for answer in answers {
                let mut entry = weighted(answer.fraction, &answer.formula);
                if answer.tolerance != tolerance || answer.answer_length != length {
                    entry.push_str(WEIGHT_SEPARATOR);
                    entry.push_str(&format_number(answer.tolerance));
                }
                if answer.answer_length != length {
                    entry.push_str(WEIGHT_SEPARATOR);
                    entry.push_str(&answer.answer_length.to_string());
                }
                push_label(out, Label::Equation, &entry);
            }
        }
    }
    push_label(out, Label::Tolerance, &format_number(tolerance));
    if length != DEFAULT_SIGFIGS {
        push_label(out, Label::Sigfigs, &length.to_string());
    }
}
