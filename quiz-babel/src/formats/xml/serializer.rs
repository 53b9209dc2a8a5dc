//! [`Quiz`] → XML

use super::body::{body_to_html, inline_to_html, Attachment, Attachments};
use super::COURSE_PREFIX;
use crate::assets::AssetStore;
use crate::common::brackets::{extract_balanced, Delimiters};
use crate::common::number::format_number;
use crate::error::Result;
use crate::quiz::{
    Answer, Body, Calculated, DragContent, DragItem, DropZone, GapChoice, Marker, MarkerUses,
    MarkerZone, Question, QuestionKind, QuestionType, Quiz,
};
use crate::variables::Variable;

const PENALTY: &str = "0.3333333";

/// Indented element writer. Text is escaped, question text goes in CDATA.
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        XmlWriter {
            out: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"),
            depth: 0,
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    fn open(&mut self, tag: &str, attributes: &[(&str, &str)]) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        for (key, value) in attributes {
            self.out.push_str(&format!(" {key}=\"{}\"", escape(value)));
        }
        self.out.push_str(">\n");
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        self.indent();
        self.out.push_str(&format!("</{tag}>\n"));
    }

    fn element(&mut self, tag: &str, value: &str) {
        self.indent();
        self.out.push_str(&format!("<{tag}>{}</{tag}>\n", escape(value)));
    }

    fn empty(&mut self, tag: &str) {
        self.indent();
        self.out.push_str(&format!("<{tag}/>\n"));
    }

    fn cdata(&mut self, tag: &str, value: &str) {
        self.indent();
        self.out.push_str(&format!(
            "<{tag}><![CDATA[{}]]></{tag}>\n",
            value.replace("]]>", "]]]]><![CDATA[>")
        ));
    }

    /// `<tag><text>value</text></tag>`
    fn text(&mut self, tag: &str, value: &str) {
        self.open(tag, &[]);
        self.element("text", value);
        self.close(tag);
    }

    fn file(&mut self, file: &Attachment) {
        self.indent();
        self.out.push_str(&format!(
            "<file name=\"{}\" path=\"/\" encoding=\"base64\">{}</file>\n",
            escape(&file.name),
            file.data
        ));
    }

    fn files(&mut self, files: &Attachments) {
        for file in files.files() {
            self.file(file);
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn binary(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn boolean(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Write the whole quiz. Fails on a quiz that breaks its schema rules or
/// references an image the asset store cannot read.
pub fn serialize_xml(quiz: &Quiz, assets: &dyn AssetStore) -> Result<String> {
    quiz.validate()?;

    let mut xml = XmlWriter::new();
    xml.open("quiz", &[]);
    for question in &quiz.questions {
        tracing::debug!(question = %question.name, kind = %question.question_type(), "writing question");
        write_question(&mut xml, question, assets)?;
    }
    xml.close("quiz");
    Ok(xml.finish())
}

fn write_html(
    xml: &mut XmlWriter,
    tag: &str,
    question: &str,
    body: &Body,
    assets: &dyn AssetStore,
) -> Result<()> {
    let mut files = Attachments::new();
    let html = body_to_html(question, body, &mut files, assets)?;
    xml.open(tag, &[("format", "html")]);
    xml.cdata("text", &html);
    xml.files(&files);
    xml.close(tag);
    Ok(())
}

fn write_question(xml: &mut XmlWriter, question: &Question, assets: &dyn AssetStore) -> Result<()> {
    let question_type = question.question_type();
    xml.open("question", &[("type", question_type.as_str())]);

    if question.is_category() {
        xml.text("category", &format!("{COURSE_PREFIX}{}", question.name));
        if !question.body.text.is_empty() {
            write_html(xml, "info", &question.name, &question.body, assets)?;
        }
        xml.close("question");
        return Ok(());
    }

    xml.text("name", &question.name);
    let name = question.name.as_str();
    match &question.kind {
        QuestionKind::Category => {}
        QuestionKind::Description => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            xml.element("defaultgrade", "0.0000");
            xml.element("penalty", "0.0000");
            xml.element("hidden", "0");
        }
        QuestionKind::Essay => write_html(xml, "questiontext", name, &question.body, assets)?,
        QuestionKind::Cloze => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            xml.element("hidden", "0");
            xml.element("penalty", PENALTY);
        }
        QuestionKind::ShortAnswer {
            case_sensitive,
            answers,
        } => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            xml.element("usecase", binary(*case_sensitive));
            xml.element("penalty", PENALTY);
            xml.element("hidden", "0");
            for answer in answers {
                write_answer(xml, answer, "moodle_auto_format", answer.text.clone(), false);
            }
        }
        QuestionKind::TrueFalse { answers } => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            xml.element("defaultgrade", "1.0");
            xml.element("penalty", PENALTY);
            xml.element("hidden", "0");
            for answer in answers {
                let fraction = if answer.fraction == 100.0 { "100" } else { "0" };
                xml.open("answer", &[("fraction", fraction), ("format", "moodle_auto_format")]);
                xml.element("text", &answer.text);
                xml.close("answer");
            }
        }
        QuestionKind::MultiChoice {
            single,
            shuffle,
            answers,
        } => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            xml.element("defaultgrade", "1.0");
            xml.element("penalty", PENALTY);
            xml.element("hidden", "0");
            xml.element("answernumbering", "abc");
            xml.element("shuffleanswers", boolean(*shuffle));
            xml.element("single", boolean(*single));
            for answer in answers {
                write_answer(xml, answer, "html", inline_to_html(&answer.text), true);
            }
        }
        QuestionKind::Matching { shuffle, pairs } => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            xml.element("shuffleanswers", boolean(*shuffle));
            for pair in pairs {
                xml.open("subquestion", &[("format", "html")]);
                xml.cdata("text", &inline_to_html(&pair.question));
                xml.open("answer", &[]);
                xml.cdata("text", &inline_to_html(&pair.answer));
                xml.close("answer");
                xml.close("subquestion");
            }
        }
        QuestionKind::Numerical { answers } => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            xml.element("defaultgrade", "1");
            xml.element("hidden", "0");
            xml.element("penalty", PENALTY);
            write_unit_fields(xml);
            for answer in answers {
                let fraction = format_number(answer.fraction);
                xml.open("answer", &[("fraction", &fraction), ("format", "moodle_auto_format")]);
                xml.element("text", &format_number(answer.value));
                xml.element("tolerance", &format_number(answer.tolerance));
                xml.close("answer");
            }
        }
        QuestionKind::Calculated(calc) => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            write_calculated(xml, question_type, calc, false, true);
        }
        QuestionKind::CalculatedSimple(calc) => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            write_calculated(xml, question_type, calc, false, false);
        }
        QuestionKind::CalculatedMulti { single, calc } => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            write_calculated(xml, question_type, calc, *single, true);
        }
        QuestionKind::GapSelect {
            shuffle,
            distractors,
        }
        | QuestionKind::DragWords {
            shuffle,
            distractors,
        } => {
            let (body, choices) = number_gaps(&question.body);
            write_html(xml, "questiontext", name, &body, assets)?;
            xml.element("defaultgrade", "1");
            xml.element("hidden", "0");
            xml.element("penalty", "0.1");
            xml.element("shuffleanswers", binary(*shuffle));
            let tag = if question_type == QuestionType::GapSelect {
                "selectoption"
            } else {
                "dragbox"
            };
            for choice in choices.iter().chain(distractors) {
                write_gap_choice(xml, tag, choice);
            }
        }
        QuestionKind::DragImageOrText {
            shuffle,
            background,
            drags,
            drops,
        } => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            xml.element("shuffleanswers", binary(*shuffle));
            write_background(xml, name, background.as_deref(), assets)?;
            for (index, drag) in drags.iter().enumerate() {
                write_drag_item(xml, name, index + 1, drag, assets)?;
            }
            for (index, drop) in drops.iter().enumerate() {
                write_drop_zone(xml, index + 1, drop);
            }
        }
        QuestionKind::DragMarker {
            shuffle,
            show_misplaced,
            background,
            markers,
            zones,
        } => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            if *show_misplaced {
                xml.empty("showmisplaced");
            }
            xml.element("shuffleanswers", binary(*shuffle));
            write_background(xml, name, background.as_deref(), assets)?;
            for (index, marker) in markers.iter().enumerate() {
                write_marker(xml, index + 1, marker);
            }
            for (index, zone) in zones.iter().enumerate() {
                write_marker_zone(xml, index + 1, zone);
            }
        }
        QuestionKind::RandomShortAnswerMatch { choose, subcats } => {
            write_html(xml, "questiontext", name, &question.body, assets)?;
            xml.element("subcats", binary(*subcats));
            xml.element("choose", &choose.to_string());
        }
    }

    xml.close("question");
    Ok(())
}

fn write_answer(xml: &mut XmlWriter, answer: &Answer, format: &str, text: String, cdata: bool) {
    let fraction = format_number(answer.fraction);
    xml.open("answer", &[("fraction", &fraction), ("format", format)]);
    if cdata {
        xml.cdata("text", &text);
    } else {
        xml.element("text", &text);
    }
    xml.close("answer");
}

fn write_unit_fields(xml: &mut XmlWriter) {
    xml.element("unitgradingtype", "0");
    xml.element("unitpenalty", "0.1000000");
    xml.element("showunits", "3");
    xml.element("unitsleft", "0");
}

fn write_calculated(
    xml: &mut XmlWriter,
    question_type: QuestionType,
    calc: &Calculated,
    single: bool,
    synchronized: bool,
) {
    xml.element("defaultgrade", "1.0");
    xml.element("penalty", PENALTY);
    xml.element("hidden", "0");
    xml.element("synchronize", binary(synchronized));
    xml.element("single", binary(single));
    xml.element("answernumbering", "abc");
    xml.element("shuffleanswers", binary(synchronized));
    write_unit_fields(xml);

    for answer in &calc.answers {
        let fraction = format_number(answer.fraction);
        xml.open("answer", &[("fraction", &fraction)]);
        xml.element("text", &answer.formula);
        xml.element("tolerance", &format_number(answer.tolerance));
        // relative tolerance, answer length in significant figures
        xml.element("tolerancetype", "1");
        xml.element("correctanswerformat", "2");
        xml.element("correctanswerlength", &answer.answer_length.to_string());
        xml.close("answer");
    }

    let dataset_type = if question_type == QuestionType::CalculatedSimple {
        "calculatedsimple"
    } else {
        "calculated"
    };
    xml.open("dataset_definitions", &[]);
    for variable in &calc.variables {
        write_dataset(xml, dataset_type, variable);
    }
    xml.close("dataset_definitions");
}

fn write_dataset(xml: &mut XmlWriter, dataset_type: &str, variable: &Variable) {
    xml.open("dataset_definition", &[]);
    xml.text("status", if variable.shared { "shared" } else { "private" });
    xml.text("name", &variable.name);
    xml.element("type", dataset_type);
    xml.text("distribution", "uniform");
    xml.text("minimum", &format_number(variable.min));
    xml.text("maximum", &format_number(variable.max));
    xml.text("decimals", &variable.decimals.to_string());
    let count = variable.values.len().to_string();
    xml.element("itemcount", &count);
    xml.open("dataset_items", &[]);
    for (index, value) in variable.values.iter().enumerate() {
        xml.open("dataset_item", &[]);
        xml.element("number", &(index + 1).to_string());
        xml.element("value", &format_number(*value));
        xml.close("dataset_item");
    }
    xml.close("dataset_items");
    xml.element("number_of_items", &count);
    if let Some(expression) = &variable.expression {
        xml.open("expression", &[]);
        xml.cdata("text", expression);
        xml.close("expression");
        xml.element("order", &variable.order.to_string());
    }
    xml.close("dataset_definition");
}

/// Replace every `[[group@text]]` marker with `[[n]]`, numbering distinct
/// markers by first appearance. Returns the rewritten body and the choices.
fn number_gaps(body: &Body) -> (Body, Vec<GapChoice>) {
    let mut text = body.text.clone();
    let mut choices = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    for raw in extract_balanced(&body.text, "", Delimiters::new("[[", "]]")) {
        if seen.contains(&raw) {
            continue;
        }
        let Some((label, choice_text)) = raw.split_once('@') else {
            continue;
        };
        let Some((group, unlimited)) = GapChoice::parse_group(label) else {
            continue;
        };
        seen.push(raw);
        choices.push(GapChoice {
            group,
            unlimited,
            text: choice_text.to_string(),
        });
        text = text.replace(&format!("[[{raw}]]"), &format!("[[{}]]", choices.len()));
    }
    (Body::new(text, body.markdown), choices)
}

fn write_gap_choice(xml: &mut XmlWriter, tag: &str, choice: &GapChoice) {
    xml.open(tag, &[]);
    xml.cdata("text", inline_to_html(&choice.text).trim());
    xml.element("group", &choice.group.to_string());
    if choice.unlimited {
        xml.empty("infinite");
    }
    xml.close(tag);
}

fn write_background(
    xml: &mut XmlWriter,
    question: &str,
    background: Option<&str>,
    assets: &dyn AssetStore,
) -> Result<()> {
    if let Some(path) = background {
        let mut files = Attachments::new();
        files.attach(question, path, assets)?;
        xml.files(&files);
    }
    Ok(())
}

fn write_drag_item(
    xml: &mut XmlWriter,
    question: &str,
    number: usize,
    drag: &DragItem,
    assets: &dyn AssetStore,
) -> Result<()> {
    xml.open("drag", &[]);
    xml.element("no", &number.to_string());
    match &drag.content {
        DragContent::Text(text) => xml.cdata("text", &inline_to_html(text)),
        DragContent::Image(path) => {
            xml.element("text", "");
            let mut files = Attachments::new();
            files.attach(question, path, assets)?;
            xml.files(&files);
        }
    }
    xml.element("draggroup", &drag.group.to_string());
    if drag.infinite {
        xml.empty("infinite");
    }
    xml.close("drag");
    Ok(())
}

fn write_drop_zone(xml: &mut XmlWriter, number: usize, drop: &DropZone) {
    xml.open("drop", &[]);
    xml.element("text", "");
    xml.element("no", &number.to_string());
    xml.element("choice", &drop.choice.to_string());
    xml.element("xleft", &drop.x.to_string());
    xml.element("ytop", &drop.y.to_string());
    xml.close("drop");
}

fn write_marker(xml: &mut XmlWriter, number: usize, marker: &Marker) {
    xml.open("drag", &[]);
    xml.element("no", &number.to_string());
    xml.cdata("text", &inline_to_html(&marker.text));
    match marker.uses {
        MarkerUses::Infinite => xml.empty("infinite"),
        MarkerUses::Limited(count) => xml.element("noofdrags", &count.to_string()),
    }
    xml.close("drag");
}

fn write_marker_zone(xml: &mut XmlWriter, number: usize, zone: &MarkerZone) {
    xml.open("drop", &[]);
    xml.element("no", &number.to_string());
    xml.element("shape", zone.shape.as_str());
    xml.element("coords", &zone.coords);
    xml.element("choice", &zone.choice.to_string());
    xml.close("drop");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::quiz::{MatchPair, NumericalAnswer};

    fn write(questions: Vec<Question>) -> String {
        serialize_xml(&Quiz::new(questions), &MemoryAssets::new()).unwrap()
    }

    #[test]
    fn categories_carry_the_course_prefix() {
        let xml = write(vec![Question::category("Physics/Waves", false)]);
        assert!(xml.contains("<question type=\"category\">"));
        assert!(xml.contains("<text>$course$/Physics/Waves</text>"));
        assert!(!xml.contains("<info"));
    }

    #[test]
    fn multichoice_uses_word_booleans() {
        let xml = write(vec![Question::new(
            "mc",
            Body::new("Pick $x$", false),
            QuestionKind::MultiChoice {
                single: false,
                shuffle: true,
                answers: vec![Answer::new("$a$", 50.0), Answer::new("b", 50.0)],
            },
        )]);
        assert!(xml.contains("<shuffleanswers>true</shuffleanswers>"));
        assert!(xml.contains("<single>false</single>"));
        assert!(xml.contains("<text><![CDATA[<p>Pick \\(x\\)<br></p>]]></text>"));
        assert!(xml.contains("<answer fraction=\"50.0\" format=\"html\">"));
        assert!(xml.contains("<text><![CDATA[\\(a\\)]]></text>"));
    }

    #[test]
    fn calculated_multi_uses_digit_booleans() {
        let calc = Calculated {
            answers: vec![crate::quiz::Formula {
                formula: "{a}*2".into(),
                fraction: 100.0,
                tolerance: 0.01,
                answer_length: 3,
            }],
            variables: vec![Variable {
                name: "a".into(),
                min: 1.0,
                max: 10.0,
                decimals: 1,
                sigfigs: 2,
                values: vec![2.5, 7.0],
                shared: true,
                expression: None,
                order: 0,
            }],
        };
        let xml = write(vec![Question::new(
            "c",
            Body::new("Double {a}", false),
            QuestionKind::CalculatedMulti { single: true, calc },
        )]);
        assert!(xml.contains("<single>1</single>"));
        assert!(xml.contains("<shuffleanswers>1</shuffleanswers>"));
        assert!(xml.contains("<status>\n"));
        assert!(xml.contains("<text>shared</text>"));
        assert!(xml.contains("<value>2.5</value>"));
        assert!(xml.contains("<itemcount>2</itemcount>"));
        assert!(!xml.contains("<expression>"));
    }

    #[test]
    fn gaps_are_numbered_by_first_appearance() {
        let xml = write(vec![Question::new(
            "g",
            Body::new("[[1@cat]] and [[2U@dog]] and [[2U@dog]]", false),
            QuestionKind::DragWords {
                shuffle: false,
                distractors: vec![GapChoice {
                    group: 1,
                    unlimited: false,
                    text: "cow".into(),
                }],
            },
        )]);
        assert!(xml.contains("[[1]] and [[2]] and [[2]]"));
        let cat = xml.find("cat]]").unwrap();
        let dog = xml.find("dog]]").unwrap();
        let cow = xml.find("cow]]").unwrap();
        assert!(cat < dog && dog < cow);
        assert_eq!(xml.matches("<infinite/>").count(), 1);
        assert_eq!(xml.matches("<dragbox>").count(), 3);
    }

    #[test]
    fn matching_subquestions() {
        let xml = write(vec![Question::new(
            "m",
            Body::new("Match", false),
            QuestionKind::Matching {
                shuffle: false,
                pairs: vec![MatchPair {
                    question: "$H_2O$".into(),
                    answer: "water".into(),
                }],
            },
        )]);
        assert!(xml.contains("<shuffleanswers>false</shuffleanswers>"));
        assert!(xml.contains("<![CDATA[\\(H_2O\\)]]>"));
    }

    #[test]
    fn numerical_tolerance_is_absolute() {
        let xml = write(vec![Question::new(
            "n",
            Body::new("?", false),
            QuestionKind::Numerical {
                answers: vec![NumericalAnswer {
                    value: 4.0,
                    fraction: 100.0,
                    tolerance: 0.0625,
                }],
            },
        )]);
        assert!(xml.contains("<text>4.0</text>"));
        assert!(xml.contains("<tolerance>0.0625</tolerance>"));
    }

    #[test]
    fn background_and_drag_images_are_attached() {
        let assets = MemoryAssets::new()
            .with_file("bg.png", b"bg")
            .with_file("b.png", b"b");
        let quiz = Quiz::new(vec![Question::new(
            "dd",
            Body::new("Place", false),
            QuestionKind::DragImageOrText {
                shuffle: true,
                background: Some("bg.png".into()),
                drags: vec![DragItem {
                    group: 1,
                    content: DragContent::Image("b.png".into()),
                    infinite: false,
                }],
                drops: vec![DropZone { x: 3, y: 4, choice: 1 }],
            },
        )]);
        let xml = serialize_xml(&quiz, &assets).unwrap();
        assert!(xml.contains("<file name=\"bg.png\" path=\"/\" encoding=\"base64\">Ymc=</file>"));
        assert!(xml.contains("<file name=\"b.png\" path=\"/\" encoding=\"base64\">Yg==</file>"));
        assert!(xml.contains("<xleft>3</xleft>"));
    }

    #[test]
    fn cdata_terminators_are_split() {
        let mut xml = XmlWriter::new();
        xml.cdata("text", "a]]>b");
        assert!(xml.finish().contains("<text><![CDATA[a]]]]><![CDATA[>b]]></text>"));
    }
}
