//! Plain-text notation → [`Quiz`]

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::dragdrop::{parse_image_table, parse_marker_table, PREVIEW_MARKER};
use super::{Label, TextOptions, DEFAULT_ACCURACY, DEFAULT_TOLERANCE};
use crate::cloze::evaluate_cloze;
use crate::common::latex::strip_math;
use crate::common::number::parse_number;
use crate::error::{QuizError, Result};
use crate::quiz::{
    Answer, Body, Calculated, Formula, GapChoice, MatchPair, NumericalAnswer, Question, QuestionKind,
    QuestionType, Quiz,
};
use crate::variables::expression::referenced_names;
use crate::variables::{Declaration, SamplingContext, Scope, Variable, DEFAULT_SIGFIGS};

static SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*-{10,}[ \t]*$").expect("valid regex"));

/// `{name}` references in bodies and equations.
static VARIABLE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}").expect("valid regex"));

const COURSE_PREFIX: &str = "$course$/";
const BODY_INDENT: usize = 3;

#[derive(Debug, Clone, Copy)]
struct Settings {
    n_samples: usize,
    seed: u64,
}

impl Settings {
    fn context<'q>(&self, question: &'q str) -> SamplingContext<'q> {
        SamplingContext {
            n_samples: self.n_samples,
            seed: self.seed,
            question,
        }
    }
}

/// Header lines lose their `1.` (any number) or `#` prefix before labels
/// are matched.
fn strip_heading(line: &str) -> &str {
    let line = line.trim();
    let unnumbered = line.trim_start_matches(|c: char| c.is_ascii_digit());
    let line = match unnumbered.strip_prefix('.') {
        Some(rest) if unnumbered.len() < line.len() => rest,
        _ => line,
    };
    line.trim_start_matches('#').trim()
}

/// Labelled entries of a block header, in source order.
#[derive(Debug, Default)]
struct Header {
    entries: Vec<(Label, String)>,
}

impl Header {
    fn parse<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut entries = Vec::new();
        for line in lines {
            let line = strip_heading(line);
            if let Some(label) = Label::ALL.into_iter().find(|l| line.starts_with(l.as_str())) {
                entries.push((label, line[label.as_str().len()..].trim().to_string()));
            }
        }
        Header { entries }
    }

    fn first(&self, label: Label) -> Option<&str> {
        self.all(label).next()
    }

    fn all(&self, label: Label) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |(l, _)| *l == label)
            .map(|(_, value)| value.as_str())
    }

    fn has(&self, label: Label) -> bool {
        self.first(label).is_some()
    }
}

/// One question block split into header, body and drag-drop section.
#[derive(Debug)]
struct Block {
    header: Header,
    body: String,
    dragdrop: Option<String>,
}

fn dedent(line: &str) -> &str {
    let spaces = line.len() - line.trim_start_matches(' ').len();
    line[spaces.min(BODY_INDENT)..].trim_end()
}

impl Block {
    fn parse(chunk: &str) -> Self {
        let lines: Vec<&str> = chunk.lines().collect();
        let Some(text_at) = lines
            .iter()
            .position(|line| strip_heading(line).starts_with("TEXT:"))
        else {
            return Block {
                header: Header::parse(lines),
                body: String::new(),
                dragdrop: None,
            };
        };

        let mut body: Vec<&str> = Vec::new();
        let inline = strip_heading(lines[text_at])["TEXT:".len()..].trim();
        if !inline.is_empty() {
            body.push(inline);
        }
        let mut rest = lines[text_at + 1..].iter();
        let mut dragdrop = None;
        for line in rest.by_ref() {
            if line.trim_start().starts_with("DRAG_DROP:") {
                dragdrop = Some(String::new());
                break;
            }
            body.push(dedent(line));
        }
        if let Some(section) = dragdrop.as_mut() {
            for line in rest.take_while(|line| !line.trim_start().starts_with(PREVIEW_MARKER)) {
                section.push_str(line.trim());
                section.push('\n');
            }
        }

        Block {
            header: Header::parse(lines[..text_at].iter().copied()),
            body: body.join("\n").trim().to_string(),
            dragdrop,
        }
    }

    fn name(&self) -> Result<&str> {
        self.header
            .first(Label::Name)
            .ok_or_else(|| QuizError::Parse("question block without NAME:".into()))
    }

    fn is_category(&self) -> bool {
        self.header.first(Label::Type) == Some("category")
    }
}

fn read_preamble(chunk: &str, settings: &mut Settings) -> Result<()> {
    for line in chunk.lines().map(str::trim) {
        if let Some(value) = line.strip_prefix("N_SAMPLES:") {
            settings.n_samples = value
                .trim()
                .parse()
                .map_err(|_| QuizError::Parse(format!("invalid N_SAMPLES: '{}'", value.trim())))?;
        } else if let Some(value) = line.strip_prefix("SEED:") {
            settings.seed = value
                .trim()
                .parse()
                .map_err(|_| QuizError::Parse(format!("invalid SEED: '{}'", value.trim())))?;
        }
    }
    Ok(())
}

/// Parse a whole document. The result has been validated.
pub fn parse_text(source: &str, options: &TextOptions) -> Result<Quiz> {
    let mut settings = Settings {
        n_samples: options.n_samples,
        seed: options.seed,
    };
    let mut chunks: Vec<&str> = SEPARATOR.split(source).collect();
    if chunks.first().is_some_and(|chunk| !chunk.contains("TYPE:")) {
        read_preamble(chunks.remove(0), &mut settings)?;
    }
    let blocks: Vec<Block> = chunks
        .into_iter()
        .filter(|chunk| !chunk.trim().is_empty())
        .map(Block::parse)
        .collect();

    let mut questions = Vec::with_capacity(blocks.len());
    let mut start = 0;
    while start < blocks.len() {
        let end = blocks[start + 1..]
            .iter()
            .position(Block::is_category)
            .map_or(blocks.len(), |offset| start + 1 + offset);
        questions.extend(build_run(&blocks[start..end], settings)?);
        start = end;
    }

    let quiz = Quiz {
        n_samples: settings.n_samples,
        seed: settings.seed,
        questions,
    };
    quiz.validate()?;
    Ok(quiz)
}

fn category_path(name: &str) -> String {
    name.replace(COURSE_PREFIX, "")
}

/// Build the questions of one category run. Shared variables are gathered
/// from every block of the run before any question is built.
fn build_run(blocks: &[Block], settings: Settings) -> Result<Vec<Question>> {
    let key = match blocks.first() {
        Some(block) if block.is_category() => category_path(block.name()?),
        _ => String::new(),
    };
    let mut shared = Scope::shared(key);
    for block in blocks {
        let context = settings.context(block.name()?);
        for line in block.header.all(Label::SharedVars) {
            for declaration in Declaration::parse_line(line)? {
                shared.define(&declaration, &context)?;
            }
        }
    }
    blocks
        .iter()
        .map(|block| build_question(block, &shared, settings))
        .collect()
}

fn build_question(block: &Block, shared: &Scope<'_>, settings: Settings) -> Result<Question> {
    let name = block.name()?;
    let header = &block.header;
    let question_type: QuestionType = header
        .first(Label::Type)
        .ok_or_else(|| QuizError::schema(name, "missing TYPE:"))?
        .parse()
        .map_err(|message: String| QuizError::schema(name, message))?;
    let markdown = header.has(Label::Markdown);
    tracing::debug!(question = name, kind = %question_type, "reading question");

    let kind = match question_type {
        QuestionType::Category => {
            return Ok(Question::new(
                category_path(name),
                Body::new(block.body.clone(), markdown),
                QuestionKind::Category,
            ));
        }
        QuestionType::Description => QuestionKind::Description,
        QuestionType::Essay => QuestionKind::Essay,
        QuestionType::Cloze => QuestionKind::Cloze,
        QuestionType::ShortAnswer => QuestionKind::ShortAnswer {
            case_sensitive: flag(name, header, Label::Case, false)?,
            answers: answers(name, header)?,
        },
        QuestionType::TrueFalse => QuestionKind::TrueFalse {
            answers: truth_values(name, header)?,
        },
        QuestionType::MultiChoice => QuestionKind::MultiChoice {
            single: flag(name, header, Label::SingleAnswer, true)?,
            shuffle: flag(name, header, Label::Shuffle, true)?,
            answers: answers(name, header)?,
        },
        QuestionType::Matching => QuestionKind::Matching {
            shuffle: flag(name, header, Label::Shuffle, true)?,
            pairs: pairs(name, header)?,
        },
        QuestionType::Numerical => QuestionKind::Numerical {
            answers: numerical_answers(name, header)?,
        },
        QuestionType::Calculated => {
            QuestionKind::Calculated(calculated(name, block, shared, settings)?)
        }
        QuestionType::CalculatedSimple => {
            QuestionKind::CalculatedSimple(calculated(name, block, shared, settings)?)
        }
        QuestionType::CalculatedMulti => QuestionKind::CalculatedMulti {
            single: flag(name, header, Label::SingleAnswer, true)?,
            calc: calculated(name, block, shared, settings)?,
        },
        QuestionType::GapSelect => QuestionKind::GapSelect {
            shuffle: flag(name, header, Label::Shuffle, true)?,
            distractors: distractors(name, header)?,
        },
        QuestionType::DragWords => QuestionKind::DragWords {
            shuffle: flag(name, header, Label::Shuffle, true)?,
            distractors: distractors(name, header)?,
        },
        QuestionType::DragImageOrText => {
            let table = parse_image_table(name, block.dragdrop.as_deref().unwrap_or(""))?;
            QuestionKind::DragImageOrText {
                shuffle: flag(name, header, Label::Shuffle, true)?,
                background: table.background,
                drags: table.drags,
                drops: table.drops,
            }
        }
        QuestionType::DragMarker => {
            let table = parse_marker_table(name, block.dragdrop.as_deref().unwrap_or(""))?;
            QuestionKind::DragMarker {
                shuffle: flag(name, header, Label::Shuffle, true)?,
                show_misplaced: flag(name, header, Label::ShowMisplaced, true)?,
                background: table.background,
                markers: table.markers,
                zones: table.zones,
            }
        }
        QuestionType::RandomShortAnswerMatch => {
            let choose = header
                .first(Label::Choose)
                .ok_or_else(|| QuizError::schema(name, "missing CHOOSE:"))?;
            QuestionKind::RandomShortAnswerMatch {
                choose: choose
                    .parse()
                    .map_err(|_| QuizError::schema(name, format!("CHOOSE: '{choose}' is not a count")))?,
                subcats: flag(name, header, Label::Subcats, false)?,
            }
        }
    };

    let text = match kind {
        QuestionKind::Cloze => evaluate_cloze(name, &block.body)?,
        _ => block.body.clone(),
    };
    Ok(Question::new(name, Body::new(text, markdown), kind))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "True" | "true" | "TRUE" | "1" | "yes" | "Yes" => Some(true),
        "False" | "false" | "FALSE" | "0" | "no" | "No" => Some(false),
        _ => None,
    }
}

fn flag(question: &str, header: &Header, label: Label, default: bool) -> Result<bool> {
    match header.first(label) {
        None => Ok(default),
        Some(value) => parse_flag(value).ok_or_else(|| {
            QuizError::schema(
                question,
                format!("{} expects True or False, got '{value}'", label.as_str()),
            )
        }),
    }
}

fn number(question: &str, label: Label, text: &str) -> Result<f64> {
    parse_number(text).ok_or_else(|| {
        QuizError::schema(question, format!("{} '{text}' is not a number", label.as_str()))
    })
}

fn number_or(question: &str, header: &Header, label: Label, default: f64) -> Result<f64> {
    header
        .first(label)
        .map_or(Ok(default), |value| number(question, label, value))
}

/// `weight +++ field +++ ...`, or a bare field worth 100.
struct Entry<'a> {
    fraction: f64,
    fields: Vec<&'a str>,
}

impl<'a> Entry<'a> {
    fn parse(question: &str, label: Label, line: &'a str) -> Result<Self> {
        if !line.contains("+++") {
            return Ok(Entry {
                fraction: 100.0,
                fields: vec![line.trim()],
            });
        }
        let mut parts = line.split("+++").map(str::trim);
        let weight = parts.next().unwrap_or_default();
        Ok(Entry {
            fraction: number(question, label, weight)?,
            fields: parts.collect(),
        })
    }

    fn field(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied()
    }

    fn value(&self) -> &'a str {
        self.field(0).unwrap_or_default()
    }
}

fn answers(question: &str, header: &Header) -> Result<Vec<Answer>> {
    header
        .all(Label::Answer)
        .map(|line| {
            let entry = Entry::parse(question, Label::Answer, line)?;
            Ok(Answer::new(entry.value(), entry.fraction))
        })
        .collect()
}

fn truth_values(question: &str, header: &Header) -> Result<Vec<Answer>> {
    header
        .all(Label::Answer)
        .map(|line| {
            let entry = Entry::parse(question, Label::Answer, line)?;
            let text = match entry.value() {
                "true" | "True" | "TRUE" | "1" => "true",
                "false" | "False" | "FALSE" | "0" => "false",
                other => {
                    return Err(QuizError::schema(
                        question,
                        format!("'{other}' is not a truth value"),
                    ))
                }
            };
            let fraction = if entry.fraction == 100.0 { 100.0 } else { 0.0 };
            Ok(Answer::new(text, fraction))
        })
        .collect()
}

fn split_pair<'a>(question: &str, label: Label, line: &'a str) -> Result<(&'a str, &'a str)> {
    line.split_once("+++")
        .map(|(left, right)| (left.trim(), right.trim()))
        .ok_or_else(|| {
            QuizError::schema(question, format!("{} expects 'left +++ right'", label.as_str()))
        })
}

fn pairs(question: &str, header: &Header) -> Result<Vec<MatchPair>> {
    header
        .all(Label::Pair)
        .map(|line| {
            let (left, right) = split_pair(question, Label::Pair, line)?;
            Ok(MatchPair {
                question: left.to_string(),
                answer: right.to_string(),
            })
        })
        .collect()
}

fn distractors(question: &str, header: &Header) -> Result<Vec<GapChoice>> {
    header
        .all(Label::WrongAnswer)
        .map(|line| {
            let (group, text) = split_pair(question, Label::WrongAnswer, line)?;
            let (group, unlimited) = GapChoice::parse_group(group).ok_or_else(|| {
                QuizError::schema(question, format!("invalid answer group '{group}'"))
            })?;
            Ok(GapChoice {
                group,
                unlimited,
                text: text.to_string(),
            })
        })
        .collect()
}

fn numerical_answers(question: &str, header: &Header) -> Result<Vec<NumericalAnswer>> {
    let relative = number_or(question, header, Label::Tolerance, DEFAULT_TOLERANCE)?;
    let accuracy = number_or(question, header, Label::Accuracy, DEFAULT_ACCURACY)?;
    header
        .all(Label::Answer)
        .map(|line| {
            let entry = Entry::parse(question, Label::Answer, line)?;
            let value = number(question, Label::Answer, entry.value())?;
            let tolerance = match entry.field(1) {
                Some(tolerance) => number(question, Label::Answer, tolerance)?.abs(),
                None => (relative * value + accuracy).abs(),
            };
            Ok(NumericalAnswer {
                value,
                fraction: entry.fraction,
                tolerance,
            })
        })
        .collect()
}

fn calculated(question: &str, block: &Block, shared: &Scope<'_>, settings: Settings) -> Result<Calculated> {
    let header = &block.header;
    let tolerance = number_or(question, header, Label::Tolerance, DEFAULT_TOLERANCE)?.abs();
    let length = match header.first(Label::Sigfigs) {
        Some(value) => value
            .parse()
            .map_err(|_| QuizError::schema(question, format!("SIGFIGS: '{value}' is not a count")))?,
        None => DEFAULT_SIGFIGS,
    };

    let answers = header
        .all(Label::Equation)
        .map(|line| {
            let entry = Entry::parse(question, Label::Equation, line)?;
            let tolerance = match entry.field(1) {
                Some(value) => number(question, Label::Equation, value)?.abs(),
                None => tolerance,
            };
            let answer_length = match entry.field(2) {
                Some(value) => value.parse().map_err(|_| {
                    QuizError::schema(question, format!("answer length '{value}' is not a count"))
                })?,
                None => length,
            };
            Ok(Formula {
                formula: entry.value().to_string(),
                fraction: entry.fraction,
                tolerance,
                answer_length,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let context = settings.context(question);
    let mut private = Scope::private(question, shared);
    for line in header.all(Label::PrivateVars) {
        for declaration in Declaration::parse_line(line)? {
            private.define(&declaration, &context)?;
        }
    }
    let variables = used_variables(question, &block.body, &answers, &private)?;
    Ok(Calculated { answers, variables })
}

/// Variables referenced as `{name}` outside math in the body or in any
/// equation, plus the variables their expressions are computed from.
///
/// Expression variables are numbered by definition order (shared before
/// private); sampled ones get `0`. The result is sorted by that number, then
/// by name.
fn used_variables(question: &str, body: &str, answers: &[Formula], scope: &Scope<'_>) -> Result<Vec<Variable>> {
    let mut pending: Vec<String> = Vec::new();
    let outside_math = strip_math(body);
    let sources = std::iter::once(outside_math.as_str()).chain(answers.iter().map(|a| a.formula.as_str()));
    for source in sources {
        pending.extend(VARIABLE_REF.captures_iter(source).map(|caps| caps[1].to_string()));
    }

    let mut seen = HashSet::new();
    let mut used: Vec<Variable> = Vec::new();
    while let Some(name) = pending.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let variable = scope
            .get(&name)
            .ok_or_else(|| QuizError::undefined(question, &name))?;
        if let Some(expression) = &variable.expression {
            pending.extend(
                referenced_names(expression)
                    .into_iter()
                    .filter(|dependency| scope.get(dependency).is_some()),
            );
        }
        used.push(variable.clone());
    }

    used.sort_by_key(|v| scope.position(&v.name));
    let mut rank = 0;
    for variable in &mut used {
        variable.order = match variable.expression {
            Some(_) => {
                rank += 1;
                rank
            }
            None => 0,
        };
    }
    used.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(used)
}
