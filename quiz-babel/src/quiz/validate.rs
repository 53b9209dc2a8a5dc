//! Grading and capacity rules per question type

use std::collections::HashSet;

use super::{gap_markers, Answer, GapChoice, MarkerUses, Question, QuestionKind};
use crate::error::{QuizError, Result};

/// Positive weights of a multi-answer question must reach this sum.
const MULTI_ANSWER_TOTAL: f64 = 99.99;

fn best(fractions: impl Iterator<Item = f64>) -> Option<f64> {
    fractions.fold(None, |acc, f| Some(acc.map_or(f, |a: f64| a.max(f))))
}

fn require_full_marks(question: &Question, fractions: impl Iterator<Item = f64>) -> Result<()> {
    match best(fractions) {
        Some(max) if max == 100.0 => Ok(()),
        Some(max) => Err(QuizError::schema(
            &question.name,
            format!("the best answer must be worth 100%, found {max}%"),
        )),
        None => Err(QuizError::schema(&question.name, "question has no answers")),
    }
}

fn require_total(question: &Question, fractions: impl Iterator<Item = f64>) -> Result<()> {
    let total: f64 = fractions.filter(|f| *f > 0.0).sum();
    if total >= MULTI_ANSWER_TOTAL {
        Ok(())
    } else {
        Err(QuizError::schema(
            &question.name,
            format!("positive answer weights must add up to 100%, found {total}%"),
        ))
    }
}

fn fractions(answers: &[Answer]) -> impl Iterator<Item = f64> + '_ {
    answers.iter().map(|a| a.fraction)
}

fn is_truth_value(text: &str) -> bool {
    matches!(
        text.trim(),
        "true" | "True" | "TRUE" | "1" | "false" | "False" | "FALSE" | "0"
    )
}

fn validate_true_false(question: &Question, answers: &[Answer]) -> Result<()> {
    if let Some(bad) = answers.iter().find(|a| !is_truth_value(&a.text)) {
        return Err(QuizError::schema(
            &question.name,
            format!("true/false answer '{}' is neither true nor false", bad.text),
        ));
    }
    let full = answers.iter().filter(|a| a.fraction == 100.0).count();
    let zero = answers.iter().filter(|a| a.fraction == 0.0).count();
    if full != 1 || full + zero != answers.len() {
        return Err(QuizError::schema(
            &question.name,
            "true/false needs exactly one answer at 100% and the rest at 0%",
        ));
    }
    Ok(())
}

fn validate_gaps(question: &Question, distractors: &[GapChoice], drag: bool) -> Result<()> {
    let markers = gap_markers(&question.body.text).map_err(|m| QuizError::schema(&question.name, m))?;

    if drag {
        for marker in markers.iter().filter(|m| !m.unlimited) {
            if markers.iter().filter(|m| *m == marker).count() > 1 {
                return Err(QuizError::schema(
                    &question.name,
                    format!(
                        "'{}' is used more than once but set to single use; write {}U to allow reuse",
                        marker.text, marker.group
                    ),
                ));
            }
        }
        let mut seen: HashSet<(u32, &str)> = HashSet::new();
        let mut flags: HashSet<(u32, &str, bool)> = HashSet::new();
        for marker in &markers {
            if flags.insert((marker.group, marker.text.as_str(), marker.unlimited))
                && !seen.insert((marker.group, marker.text.as_str()))
            {
                return Err(QuizError::schema(
                    &question.name,
                    format!("'{}' is not consistently marked as unlimited use", marker.text),
                ));
            }
        }
    }

    let correct: HashSet<(u32, &str)> = markers.iter().map(|m| (m.group, m.text.trim())).collect();
    if let Some(clash) = distractors
        .iter()
        .find(|d| correct.contains(&(d.group, d.text.trim())))
    {
        return Err(QuizError::schema(
            &question.name,
            format!("wrong answer '{}' is identical to a correct answer", clash.text),
        ));
    }
    Ok(())
}

fn validate_capacity(
    question: &Question,
    items: usize,
    uses: impl Fn(usize) -> Option<u32>,
    choices: impl Iterator<Item = usize>,
) -> Result<()> {
    let mut counts = vec![0u32; items];
    for choice in choices {
        let slot = choice
            .checked_sub(1)
            .and_then(|i| counts.get_mut(i))
            .ok_or_else(|| {
                QuizError::schema(&question.name, format!("drop zone refers to missing item {choice}"))
            })?;
        *slot += 1;
    }
    for (index, count) in counts.into_iter().enumerate() {
        if let Some(limit) = uses(index) {
            if count > limit {
                return Err(QuizError::schema(
                    &question.name,
                    format!(
                        "drag item {} is placed {count} times but may be used {limit} time(s)",
                        index + 1
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Check one question against the rules of its type.
pub fn validate_question(question: &Question) -> Result<()> {
    match &question.kind {
        QuestionKind::ShortAnswer { answers, .. } => require_full_marks(question, fractions(answers)),
        QuestionKind::TrueFalse { answers } => validate_true_false(question, answers),
        QuestionKind::MultiChoice { single, answers, .. } => {
            if *single {
                require_full_marks(question, fractions(answers))
            } else {
                require_total(question, fractions(answers))
            }
        }
        QuestionKind::Numerical { answers } => {
            require_full_marks(question, answers.iter().map(|a| a.fraction))
        }
        QuestionKind::Calculated(calc) | QuestionKind::CalculatedSimple(calc) => {
            require_full_marks(question, calc.answers.iter().map(|a| a.fraction))
        }
        QuestionKind::CalculatedMulti { single, calc } => {
            let weights = calc.answers.iter().map(|a| a.fraction);
            if *single {
                require_full_marks(question, weights)
            } else {
                require_total(question, weights)
            }
        }
        QuestionKind::GapSelect { distractors, .. } => validate_gaps(question, distractors, false),
        QuestionKind::DragWords { distractors, .. } => validate_gaps(question, distractors, true),
        QuestionKind::DragImageOrText { drags, drops, .. } => validate_capacity(
            question,
            drags.len(),
            |i| (!drags[i].infinite).then_some(1),
            drops.iter().map(|d| d.choice),
        ),
        QuestionKind::DragMarker { markers, zones, .. } => validate_capacity(
            question,
            markers.len(),
            |i| match markers[i].uses {
                MarkerUses::Infinite => None,
                MarkerUses::Limited(n) => Some(n),
            },
            zones.iter().map(|z| z.choice),
        ),
        QuestionKind::Category
        | QuestionKind::Description
        | QuestionKind::Essay
        | QuestionKind::Cloze
        | QuestionKind::Matching { .. }
        | QuestionKind::RandomShortAnswerMatch { .. } => Ok(()),
    }
}
