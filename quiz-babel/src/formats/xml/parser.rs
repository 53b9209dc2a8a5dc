//! XML → [`Quiz`]

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use roxmltree::{Document, Node};

use super::body::{inline_from_html, Attachment, BodyReader};
use super::{XmlOptions, COURSE_PREFIX};
use crate::assets::AssetStore;
use crate::common::number::parse_number;
use crate::common::sigfig::{ceil_to_sigfigs, count_sigfigs, floor_to_sigfigs, magnitude, ZERO_THRESHOLD};
use crate::error::{QuizError, Result};
use crate::quiz::{
    Answer, Body, Calculated, DragContent, DragItem, DropZone, Formula, GapChoice, MatchPair,
    Marker, MarkerUses, MarkerZone, NumericalAnswer, Question, QuestionKind, QuestionType, Quiz,
    DEFAULT_SAMPLES,
};
use crate::formats::text::DEFAULT_TOLERANCE;
use crate::variables::{Variable, DEFAULT_SIGFIGS};

static NUMBERED_GAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[\s*(\d+)\s*\]\]").expect("valid regex"));

/// Figure count standing for "no stored values".
const NO_DATA: i32 = 1000;

fn missing(question: &str, tag: &str) -> QuizError {
    QuizError::Xml(format!("question '{question}': missing <{tag}>"))
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |n| n.has_tag_name(tag))
}

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    child(node, tag).map(|n| n.text().unwrap_or(""))
}

/// Text of `<tag><text>...</text></tag>`.
fn nested_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    child(node, tag).and_then(|n| child_text(n, "text"))
}

fn attachments(node: Node<'_, '_>) -> Vec<Attachment> {
    children(node, "file")
        .map(|file| Attachment {
            name: file.attribute("name").unwrap_or("").to_string(),
            data: file.text().unwrap_or("").to_string(),
        })
        .collect()
}

fn number(question: &str, node: Node<'_, '_>, tag: &str) -> Result<f64> {
    let text = child_text(node, tag).ok_or_else(|| missing(question, tag))?;
    parse_number(text)
        .ok_or_else(|| QuizError::Xml(format!("question '{question}': <{tag}> is not a number: '{text}'")))
}

fn nested_number(question: &str, node: Node<'_, '_>, tag: &str) -> Result<f64> {
    let text = nested_text(node, tag).ok_or_else(|| missing(question, tag))?;
    parse_number(text)
        .ok_or_else(|| QuizError::Xml(format!("question '{question}': <{tag}> is not a number: '{text}'")))
}

fn count(question: &str, node: Node<'_, '_>, tag: &str) -> Result<u32> {
    let value = number(question, node, tag)?;
    Ok(value.round().max(0.0) as u32)
}

/// Missing or `0`/`false` is false.
fn flag(node: Node<'_, '_>, tag: &str) -> bool {
    child_text(node, tag).is_some_and(|text| {
        !matches!(text.trim(), "" | "0" | "false" | "False" | "FALSE")
    })
}

/// Like [`flag`] but true when the element is absent.
fn flag_or_true(node: Node<'_, '_>, tag: &str) -> bool {
    child_text(node, tag).map_or(true, |text| {
        !matches!(text.trim(), "0" | "false" | "False" | "FALSE")
    })
}

fn fraction(node: Node<'_, '_>) -> f64 {
    node.attribute("fraction").and_then(parse_number).unwrap_or(0.0)
}

/// Decode a Moodle XML export.
pub fn parse_xml(source: &str, options: &XmlOptions, assets: &mut dyn AssetStore) -> Result<Quiz> {
    let document = Document::parse(source)?;
    let root = document.root_element();
    if !root.has_tag_name("quiz") {
        return Err(QuizError::Xml(format!(
            "root element is <{}>, expected <quiz>",
            root.tag_name().name()
        )));
    }

    let mut reader = BodyReader::new(options, assets)?;
    let mut questions = Vec::new();
    for node in children(root, "question") {
        let question = read_question(node, options, &mut reader)?;
        tracing::debug!(question = %question.name, kind = %question.question_type(), "read question");
        questions.push(question);
    }

    let n_samples = questions
        .iter()
        .flat_map(|q| q.variables())
        .map(|v| v.values.len())
        .max()
        .unwrap_or(DEFAULT_SAMPLES);
    let quiz = Quiz {
        n_samples,
        seed: 0,
        questions,
    };
    quiz.validate()?;
    Ok(quiz)
}

fn read_question(node: Node<'_, '_>, options: &XmlOptions, reader: &mut BodyReader<'_>) -> Result<Question> {
    let type_name = node
        .attribute("type")
        .ok_or_else(|| QuizError::Xml("<question> without a type attribute".into()))?;
    let parsed_type = type_name.parse::<QuestionType>();

    if parsed_type == Ok(QuestionType::Category) {
        let path = nested_text(node, "category").ok_or_else(|| missing("category", "category"))?;
        let path = path.trim();
        let name = path
            .strip_prefix(COURSE_PREFIX)
            .or_else(|| path.rsplit("$/").next())
            .unwrap_or(path)
            .to_string();
        let body = match child(node, "info") {
            Some(info) => reader.read(&name, child_text(info, "text").unwrap_or(""), &attachments(info))?,
            None => Body::new("", options.markdown),
        };
        return Ok(Question::new(name, body, QuestionKind::Category));
    }

    let name = nested_text(node, "name")
        .ok_or_else(|| missing(type_name, "name"))?
        .trim()
        .to_string();
    let question_type = parsed_type.map_err(|message| QuizError::schema(&name, message))?;
    let (html, files) = match child(node, "questiontext") {
        Some(text) => (child_text(text, "text").unwrap_or(""), attachments(text)),
        None => ("", Vec::new()),
    };
    let body = reader.read(&name, html, &files)?;

    let kind = match question_type {
        QuestionType::Category => QuestionKind::Category,
        QuestionType::Description => QuestionKind::Description,
        QuestionType::Essay => QuestionKind::Essay,
        QuestionType::Cloze => QuestionKind::Cloze,
        QuestionType::ShortAnswer => QuestionKind::ShortAnswer {
            case_sensitive: flag(node, "usecase"),
            answers: children(node, "answer")
                .map(|a| Answer::new(child_text(a, "text").unwrap_or("").trim(), fraction(a)))
                .collect(),
        },
        QuestionType::TrueFalse => QuestionKind::TrueFalse {
            answers: children(node, "answer").map(truth_value).collect(),
        },
        QuestionType::MultiChoice => QuestionKind::MultiChoice {
            single: flag_or_true(node, "single"),
            shuffle: flag_or_true(node, "shuffleanswers"),
            answers: children(node, "answer")
                .map(|a| Answer::new(inline_from_html(child_text(a, "text").unwrap_or("")), fraction(a)))
                .collect(),
        },
        QuestionType::Matching => QuestionKind::Matching {
            shuffle: flag_or_true(node, "shuffleanswers"),
            pairs: children(node, "subquestion")
                .map(|sub| MatchPair {
                    question: inline_from_html(child_text(sub, "text").unwrap_or("")),
                    answer: inline_from_html(nested_text(sub, "answer").unwrap_or("")),
                })
                .collect(),
        },
        QuestionType::Numerical => QuestionKind::Numerical {
            answers: children(node, "answer")
                .map(|a| {
                    Ok(NumericalAnswer {
                        value: number(&name, a, "text")?,
                        fraction: fraction(a),
                        tolerance: child_text(a, "tolerance")
                            .and_then(parse_number)
                            .unwrap_or(0.0)
                            .abs(),
                    })
                })
                .collect::<Result<_>>()?,
        },
        QuestionType::Calculated => QuestionKind::Calculated(read_calculated(&name, node, options)?),
        QuestionType::CalculatedSimple => {
            QuestionKind::CalculatedSimple(read_calculated(&name, node, options)?)
        }
        QuestionType::CalculatedMulti => QuestionKind::CalculatedMulti {
            single: flag(node, "single"),
            calc: read_calculated(&name, node, options)?,
        },
        QuestionType::GapSelect | QuestionType::DragWords => {
            let tag = if question_type == QuestionType::GapSelect {
                "selectoption"
            } else {
                "dragbox"
            };
            let choices = children(node, tag)
                .map(|choice| read_gap_choice(&name, choice))
                .collect::<Result<Vec<_>>>()?;
            let (text, distractors) = fill_gaps(&body.text, choices);
            let shuffle = flag(node, "shuffleanswers");
            return Ok(Question::new(
                name,
                Body::new(text, body.markdown),
                if question_type == QuestionType::GapSelect {
                    QuestionKind::GapSelect {
                        shuffle,
                        distractors,
                    }
                } else {
                    QuestionKind::DragWords {
                        shuffle,
                        distractors,
                    }
                },
            ));
        }
        QuestionType::DragImageOrText => QuestionKind::DragImageOrText {
            shuffle: flag(node, "shuffleanswers"),
            background: read_background(&name, node, reader)?,
            drags: children(node, "drag")
                .map(|drag| read_drag_item(&name, drag, reader))
                .collect::<Result<_>>()?,
            drops: children(node, "drop")
                .map(|drop| read_drop_zone(&name, drop))
                .collect::<Result<_>>()?,
        },
        QuestionType::DragMarker => QuestionKind::DragMarker {
            shuffle: flag(node, "shuffleanswers"),
            show_misplaced: child(node, "showmisplaced").is_some(),
            background: read_background(&name, node, reader)?,
            markers: children(node, "drag").map(read_marker).collect(),
            zones: children(node, "drop")
                .map(|drop| read_marker_zone(&name, drop))
                .collect::<Result<_>>()?,
        },
        QuestionType::RandomShortAnswerMatch => QuestionKind::RandomShortAnswerMatch {
            choose: count(&name, node, "choose")?,
            subcats: flag(node, "subcats"),
        },
    };
    Ok(Question::new(name, body, kind))
}

fn truth_value(answer: Node<'_, '_>) -> Answer {
    let text = inline_from_html(child_text(answer, "text").unwrap_or(""));
    let text = match text.as_str() {
        "true" | "True" | "TRUE" | "1" => "true".to_string(),
        "false" | "False" | "FALSE" | "0" => "false".to_string(),
        _ => text,
    };
    let fraction = if fraction(answer) == 100.0 { 100.0 } else { 0.0 };
    Answer::new(text, fraction)
}

fn read_calculated(question: &str, node: Node<'_, '_>, options: &XmlOptions) -> Result<Calculated> {
    let answers = children(node, "answer")
        .map(|answer| {
            Ok(Formula {
                formula: child_text(answer, "text")
                    .ok_or_else(|| missing(question, "text"))?
                    .trim()
                    .to_string(),
                fraction: fraction(answer),
                tolerance: child_text(answer, "tolerance")
                    .and_then(parse_number)
                    .unwrap_or(DEFAULT_TOLERANCE),
                answer_length: child_text(answer, "correctanswerlength")
                    .and_then(parse_number)
                    .map_or(DEFAULT_SIGFIGS, |n| n.round().max(0.0) as u32),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut variables = match child(node, "dataset_definitions") {
        Some(definitions) => children(definitions, "dataset_definition")
            .map(|definition| read_dataset(question, definition, options))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    variables.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(Calculated { answers, variables })
}

fn read_dataset(question: &str, node: Node<'_, '_>, options: &XmlOptions) -> Result<Variable> {
    let name = nested_text(node, "name")
        .ok_or_else(|| missing(question, "name"))?
        .trim()
        .to_string();
    let shared = nested_text(node, "status").map(str::trim) == Some("shared");
    let declared = (
        nested_number(question, node, "minimum")?,
        nested_number(question, node, "maximum")?,
    );
    let decimals = nested_text(node, "decimals")
        .and_then(parse_number)
        .map_or(0, |d| d.round().max(0.0) as u32);

    let literals: Vec<&str> = child(node, "dataset_items")
        .map(|items| {
            children(items, "dataset_item")
                .filter_map(|item| child_text(item, "value"))
                .map(str::trim)
                .collect()
        })
        .unwrap_or_default();
    let values = literals
        .iter()
        .map(|literal| {
            parse_number(literal).ok_or_else(|| {
                QuizError::Xml(format!(
                    "question '{question}': dataset '{name}' has a non-numeric value '{literal}'"
                ))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    let (min, max) = if options.repair_ranges {
        repair_range(question, &name, declared, &values)
    } else {
        declared
    };
    let data_sigfigs = literals.iter().map(|l| count_sigfigs(l)).max();
    let sigfigs = dataset_sigfigs(min, max, decimals, data_sigfigs, options.repair_ranges);

    let expression = nested_text(node, "expression")
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string);
    let order = match expression {
        Some(_) => child_text(node, "order")
            .and_then(parse_number)
            .map_or(0, |o| o.round().max(0.0) as u32),
        None => 0,
    };

    Ok(Variable {
        name,
        min,
        max,
        decimals,
        sigfigs,
        values,
        shared,
        expression,
        order,
    })
}

/// Widen a declared range that does not cover its values, or that is the
/// untouched `[1, 10]` default, to the values rounded out to two figures.
fn repair_range(question: &str, name: &str, declared: (f64, f64), values: &[f64]) -> (f64, f64) {
    let (mut min, mut max) = declared;
    if !values.is_empty() {
        let low = values.iter().copied().fold(f64::INFINITY, f64::min);
        let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let widened = (floor_to_sigfigs(low, 2), ceil_to_sigfigs(high, 2));
        if min > low || max < high {
            tracing::warn!(
                question,
                dataset = name,
                declared = ?declared,
                widened = ?widened,
                "dataset values fall outside the declared range"
            );
            (min, max) = widened;
        } else if min == 1.0 && max == 10.0 {
            (min, max) = widened;
        }
    }
    if (max - min).abs() < ZERO_THRESHOLD {
        max = min + 0.01 * max.abs();
        tracing::warn!(question, dataset = name, "dataset range is empty, widening it by 1%");
    }
    (min, max)
}

/// Significant figures of a dataset: the most figures among its stored
/// values, or, with no values, what the range and decimals imply.
fn dataset_sigfigs(min: f64, max: f64, decimals: u32, data: Option<u32>, repair: bool) -> u32 {
    let data = data.map_or(NO_DATA, |n| n as i32);
    if data != NO_DATA {
        return data.max(1) as u32;
    }

    let decimals = decimals as i32;
    let mut sigfigs = if repair {
        if min.abs() > ZERO_THRESHOLD {
            1 + (1e-4 + min.abs().log10()).floor() as i32 + decimals
        } else if max.abs() > ZERO_THRESHOLD {
            1 + magnitude(max) + decimals
        } else {
            decimals
        }
    } else {
        1 + magnitude(min.abs().max(max.abs())) + decimals
    };
    if (data - sigfigs).abs() > 1 {
        sigfigs = sigfigs.min(data);
    }
    if repair {
        sigfigs = if sigfigs == 0 { 1 } else { sigfigs.abs() };
    }
    sigfigs.max(1) as u32
}

fn read_gap_choice(question: &str, node: Node<'_, '_>) -> Result<GapChoice> {
    Ok(GapChoice {
        group: count(question, node, "group")?,
        unlimited: child(node, "infinite").is_some(),
        text: inline_from_html(child_text(node, "text").unwrap_or("")),
    })
}

/// Put the choices back into the `[[n]]` gaps. Choices no gap uses are the
/// distractors.
fn fill_gaps(text: &str, choices: Vec<GapChoice>) -> (String, Vec<GapChoice>) {
    let mut used = HashSet::new();
    let filled = NUMBERED_GAP.replace_all(text, |caps: &Captures<'_>| {
        let index = caps[1].parse::<usize>().ok().filter(|n| (1..=choices.len()).contains(n));
        match index {
            Some(n) => {
                used.insert(n);
                let choice = &choices[n - 1];
                format!("[[{}@{}]]", choice.group_label(), choice.text)
            }
            None => caps[0].to_string(),
        }
    });
    let filled = filled.into_owned();
    let distractors = choices
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !used.contains(&(index + 1)))
        .map(|(_, choice)| choice)
        .collect();
    (filled, distractors)
}

fn read_background(question: &str, node: Node<'_, '_>, reader: &mut BodyReader<'_>) -> Result<Option<String>> {
    match attachments(node).first() {
        Some(file) => reader.save(question, file).map(Some),
        None => Ok(None),
    }
}

fn read_drag_item(question: &str, node: Node<'_, '_>, reader: &mut BodyReader<'_>) -> Result<DragItem> {
    let content = match attachments(node).first() {
        Some(file) => DragContent::Image(reader.save(question, file)?),
        None => DragContent::Text(inline_from_html(child_text(node, "text").unwrap_or(""))),
    };
    Ok(DragItem {
        group: child_text(node, "draggroup")
            .and_then(parse_number)
            .map_or(1, |g| g.round().max(0.0) as u32),
        content,
        infinite: child(node, "infinite").is_some(),
    })
}

fn read_drop_zone(question: &str, node: Node<'_, '_>) -> Result<DropZone> {
    Ok(DropZone {
        x: number(question, node, "xleft")?.round() as i64,
        y: number(question, node, "ytop")?.round() as i64,
        choice: count(question, node, "choice")? as usize,
    })
}

fn read_marker(node: Node<'_, '_>) -> Marker {
    let uses = if child(node, "infinite").is_some() {
        MarkerUses::Infinite
    } else {
        MarkerUses::Limited(
            child_text(node, "noofdrags")
                .and_then(parse_number)
                .map_or(1, |n| n.round().max(0.0) as u32),
        )
    };
    Marker {
        text: inline_from_html(child_text(node, "text").unwrap_or("")),
        uses,
    }
}

fn read_marker_zone(question: &str, node: Node<'_, '_>) -> Result<MarkerZone> {
    Ok(MarkerZone {
        shape: child_text(node, "shape")
            .ok_or_else(|| missing(question, "shape"))?
            .parse()
            .map_err(|message| QuizError::schema(question, message))?,
        coords: child_text(node, "coords").unwrap_or("").trim().to_string(),
        choice: count(question, node, "choice")? as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;

    fn plain() -> XmlOptions {
        XmlOptions {
            markdown: false,
            ..XmlOptions::default()
        }
    }

    fn parse(source: &str) -> Result<Quiz> {
        parse_xml(source, &plain(), &mut MemoryAssets::new())
    }

    fn wrap(questions: &str) -> String {
        format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<quiz>{questions}</quiz>")
    }

    #[test]
    fn categories_lose_the_course_prefix() {
        let quiz = parse(&wrap(
            r#"<question type="category"><category><text>$course$/Top/Sub</text></category></question>"#,
        ))
        .unwrap();
        assert_eq!(quiz.questions[0].name, "Top/Sub");
        assert!(quiz.questions[0].is_category());
    }

    #[test]
    fn multichoice_defaults_and_flags() {
        let quiz = parse(&wrap(
            r#"<question type="multichoice">
                 <name><text> pick </text></name>
                 <questiontext format="html"><text><![CDATA[<p>Which \(x\)?</p>]]></text></questiontext>
                 <shuffleanswers>0</shuffleanswers>
                 <answer fraction="100"><text><![CDATA[<p>\(a\)</p>]]></text></answer>
                 <answer fraction="0"><text>b</text></answer>
               </question>"#,
        ))
        .unwrap();
        let question = &quiz.questions[0];
        assert_eq!(question.name, "pick");
        assert_eq!(question.body, Body::new("Which $x$?", false));
        match &question.kind {
            QuestionKind::MultiChoice {
                single,
                shuffle,
                answers,
            } => {
                assert!(*single);
                assert!(!*shuffle);
                assert_eq!(answers[0], Answer::new("$a$", 100.0));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn unknown_type_names_the_question() {
        let err = parse(&wrap(r#"<question type="poll"><name><text>p</text></name></question>"#)).unwrap_err();
        assert!(matches!(&err, QuizError::SchemaViolation { question, .. } if question == "p"));
        assert!(err.to_string().contains("unknown question type 'poll'"));
    }

    #[test]
    fn unknown_shape_names_the_question() {
        let err = parse(&wrap(
            r#"<question type="ddmarker"><name><text>map</text></name>
            <questiontext format="html"><text>Mark it.</text></questiontext>
            <drag><no>1</no><text>X</text><noofdrags>1</noofdrags></drag>
            <drop><no>1</no><shape>hexagon</shape><coords>1,1;2</coords><choice>1</choice></drop>
            </question>"#,
        ))
        .unwrap_err();
        assert!(matches!(&err, QuizError::SchemaViolation { question, .. } if question == "map"));
        assert!(err.to_string().contains("unknown shape mask 'hexagon'"));
    }

    #[test]
    fn wrong_root_is_rejected() {
        assert!(matches!(parse("<questions/>"), Err(QuizError::Xml(_))));
        assert!(parse("<quiz>").is_err());
    }

    #[test]
    fn numbered_gaps_are_filled_back() {
        let quiz = parse(&wrap(
            r#"<question type="gapselect">
                 <name><text>g</text></name>
                 <questiontext format="html"><text><![CDATA[<p>The [[1]] sat on the [[2]].</p>]]></text></questiontext>
                 <shuffleanswers>1</shuffleanswers>
                 <selectoption><text>cat</text><group>1</group></selectoption>
                 <selectoption><text>mat</text><group>2</group></selectoption>
                 <selectoption><text>dog</text><group>1</group></selectoption>
               </question>"#,
        ))
        .unwrap();
        let question = &quiz.questions[0];
        assert_eq!(question.body.text, "The [[1@cat]] sat on the [[2@mat]].");
        match &question.kind {
            QuestionKind::GapSelect {
                shuffle,
                distractors,
            } => {
                assert!(*shuffle);
                assert_eq!(distractors.len(), 1);
                assert_eq!(distractors[0].text, "dog");
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn datasets_take_figures_from_their_values() {
        let quiz = parse(&wrap(
            r#"<question type="calculated">
                 <name><text>c</text></name>
                 <questiontext format="html"><text>{a}</text></questiontext>
                 <answer fraction="100"><text>{a}*2</text><tolerance>0.01</tolerance><correctanswerlength>2</correctanswerlength></answer>
                 <dataset_definitions>
                   <dataset_definition>
                     <status><text>private</text></status>
                     <name><text>a</text></name>
                     <minimum><text>1.0</text></minimum>
                     <maximum><text>5.0</text></maximum>
                     <decimals><text>2</text></decimals>
                     <dataset_items>
                       <dataset_item><number>1</number><value>1.25</value></dataset_item>
                       <dataset_item><number>2</number><value>4.5</value></dataset_item>
                     </dataset_items>
                   </dataset_definition>
                 </dataset_definitions>
               </question>"#,
        ))
        .unwrap();
        assert_eq!(quiz.n_samples, 2);
        let variable = &quiz.questions[0].variables()[0];
        assert_eq!(variable.sigfigs, 3);
        assert_eq!(variable.values, vec![1.25, 4.5]);
        assert!(!variable.shared);
    }

    #[test]
    fn figures_from_the_range_when_no_values() {
        assert_eq!(dataset_sigfigs(1.0, 10.0, 1, None, false), 3);
        assert_eq!(dataset_sigfigs(0.0, 0.5, 2, None, true), 2);
        assert_eq!(dataset_sigfigs(0.0, 0.0, 0, None, true), 1);
        assert_eq!(dataset_sigfigs(20.0, 90.0, 0, None, true), 2);
        assert_eq!(dataset_sigfigs(20.0, 90.0, 0, Some(4), true), 4);
    }

    #[test]
    fn repair_widens_ranges_that_miss_their_values() {
        assert_eq!(repair_range("q", "a", (2.0, 3.0), &[1.234, 5.678]), (1.2, 5.7));
        assert_eq!(repair_range("q", "a", (1.0, 10.0), &[2.34, 3.45]), (2.3, 3.5));
        assert_eq!(repair_range("q", "a", (0.0, 10.0), &[2.0, 3.0]), (0.0, 10.0));
        let (min, max) = repair_range("q", "a", (4.0, 4.0), &[]);
        assert_eq!(min, 4.0);
        assert!((max - 4.04).abs() < 1e-12);
    }

    #[test]
    fn marker_zones_and_uses() {
        let quiz = parse(&wrap(
            r#"<question type="ddmarker">
                 <name><text>m</text></name>
                 <questiontext format="html"><text>Mark</text></questiontext>
                 <showmisplaced/>
                 <drag><no>1</no><text>Zone</text><noofdrags>2</noofdrags></drag>
                 <drag><no>2</no><text>Any</text><infinite/></drag>
                 <drop><no>1</no><shape>circle</shape><coords>10,10;5</coords><choice>1</choice></drop>
               </question>"#,
        ))
        .unwrap();
        match &quiz.questions[0].kind {
            QuestionKind::DragMarker {
                show_misplaced,
                markers,
                zones,
                ..
            } => {
                assert!(*show_misplaced);
                assert_eq!(markers[0].uses, MarkerUses::Limited(2));
                assert_eq!(markers[1].uses, MarkerUses::Infinite);
                assert_eq!(zones[0].coords, "10,10;5");
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
