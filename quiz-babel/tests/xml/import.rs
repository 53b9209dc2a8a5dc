use quiz_babel::formats::text::{parse_text, serialize_text, TextOptions};
use quiz_babel::formats::xml::parse_xml;
use quiz_babel::{MemoryAssets, QuestionKind, Quiz, XmlOptions};

use crate::common::fixture;

fn import(options: &XmlOptions) -> (Quiz, MemoryAssets) {
    let mut assets = MemoryAssets::new();
    let quiz = parse_xml(&fixture("moodle_export.xml"), options, &mut assets).unwrap();
    (quiz, assets)
}

fn plain() -> XmlOptions {
    XmlOptions {
        markdown: false,
        ..XmlOptions::default()
    }
}

#[test]
fn categories_and_names() {
    let (quiz, _) = import(&XmlOptions::default());
    let names: Vec<&str> = quiz.questions.iter().map(|q| q.name.as_str()).collect();
    assert_eq!(
        names,
        ["top/Optics", "Lens power", "Focal length", "Magnification", "Rays", "Real image", "Inline"]
    );
    assert_eq!(quiz.n_samples, 3);
}

#[test]
fn plain_bodies_keep_inline_html() {
    let (quiz, _) = import(&plain());
    assert_eq!(
        quiz.questions[1].body.text,
        "A lens with focal length $f = 0.5$ m has power\u{a0}<strong>P</strong>. Cost: DOLLAR_SIGN3.\n\n![](lens diagram.png){width=300}"
    );
    assert!(!quiz.questions[1].body.markdown);
}

#[test]
fn markdown_bodies_render_emphasis() {
    let (quiz, _) = import(&XmlOptions::default());
    let body = &quiz.questions[1].body;
    assert!(body.markdown);
    assert!(body.text.contains("**P**"));
    assert!(body.text.contains("$f = 0.5$"));
    assert!(body.text.contains("DOLLAR_SIGN3"));
    assert!(body.text.contains("![](lens diagram.png){width=300}"));
    assert_eq!(quiz.questions[2].body.text, "Give $f$ in cm.");
}

#[test]
fn answers_lose_their_paragraphs() {
    let (quiz, _) = import(&plain());
    match &quiz.questions[1].kind {
        QuestionKind::MultiChoice {
            single,
            shuffle,
            answers,
        } => {
            assert!(*single && *shuffle);
            assert_eq!(answers[0].text, "2 dioptres");
            assert_eq!(answers[1].text, "0.5 dioptres");
        }
        other => panic!("unexpected kind {other:?}"),
    }
    match &quiz.questions[2].kind {
        QuestionKind::Numerical { answers } => {
            assert_eq!(answers[0].value, 50.0);
            assert_eq!(answers[0].tolerance, 0.5);
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn datasets_keep_declared_ranges_unless_repaired() {
    let (quiz, _) = import(&plain());
    let u = &quiz.questions[3].variables()[0];
    assert_eq!((u.min, u.max), (1.0, 10.0));
    assert_eq!(u.sigfigs, 4);
    assert_eq!(u.values, vec![12.5, 20.0, 37.25]);

    let (repaired, _) = import(&XmlOptions {
        repair_ranges: true,
        ..plain()
    });
    let u = &repaired.questions[3].variables()[0];
    assert_eq!((u.min, u.max), (12.0, 38.0));
    assert_eq!(u.sigfigs, 4);
}

#[test]
fn drag_words_refill_their_gaps() {
    let (quiz, _) = import(&plain());
    let rays = &quiz.questions[4];
    assert_eq!(
        rays.body.text,
        "Light travels in [[1@straight]] lines and bends at a [[2@boundary]]."
    );
    match &rays.kind {
        QuestionKind::DragWords {
            shuffle,
            distractors,
        } => {
            assert!(*shuffle);
            assert_eq!(distractors.len(), 1);
            assert_eq!(distractors[0].group_label(), "1U");
            assert_eq!(distractors[0].text, "curved");
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn images_are_written_only_on_request() {
    let (_, untouched) = import(&plain());
    assert!(untouched.files.is_empty());

    let (quiz, saved) = import(&XmlOptions {
        save_images: true,
        ..plain()
    });
    assert_eq!(saved.files["lens diagram.png"], b"lens");
    let inline = saved
        .files
        .iter()
        .find(|(name, _)| name.starts_with("img_"))
        .map(|(name, bytes)| (name.clone(), bytes.clone()))
        .unwrap();
    assert_eq!(inline.1, b"inline");
    assert_eq!(quiz.questions[6].body.text, format!("Diagram: ![]({})", inline.0));
}

#[test]
fn export_converts_to_text() {
    let (quiz, _) = import(&XmlOptions::default());
    let text = serialize_text(&quiz).unwrap();
    assert!(text.contains("## NAME:             top/Optics"));
    assert!(text.contains("u={[1.0, 10.0] sigfigs:4};"));
    let reread = parse_text(&text, &TextOptions::default()).unwrap();
    assert_eq!(reread.questions.len(), quiz.questions.len());
    assert_eq!(reread.questions[4], quiz.questions[4]);
}
