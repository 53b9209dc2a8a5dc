use quiz_babel::formats::text::{parse_text, serialize_text, TextOptions};
use quiz_babel::formats::xml::{parse_xml, serialize_xml};
use quiz_babel::{FormatRegistry, MemoryAssets, QuestionKind, XmlOptions};

use crate::common::{kitchensink, kitchensink_images};

fn plain() -> XmlOptions {
    XmlOptions {
        markdown: false,
        ..XmlOptions::default()
    }
}

#[test]
fn kitchensink_survives_xml() {
    let quiz = kitchensink();
    let xml = serialize_xml(&quiz, &kitchensink_images()).unwrap();
    let again = parse_xml(&xml, &plain(), &mut MemoryAssets::new()).unwrap();
    for (before, after) in quiz.questions.iter().zip(&again.questions) {
        assert_eq!(before, after, "question '{}' changed", before.name);
    }
    assert_eq!(again, quiz);
}

#[test]
fn written_xml_has_moodle_shapes() {
    let xml = serialize_xml(&kitchensink(), &kitchensink_images()).unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<quiz>\n"));
    assert!(xml.contains("<text>$course$/Mechanics/Words</text>"));
    assert!(xml.contains("<question type=\"calculatedsimple\">"));
    assert!(xml.contains("<type>calculatedsimple</type>"));
    assert!(xml.contains("The [[1]] sat on the [[2]]."));
    assert!(xml.contains("<img src=\"@@PLUGINFILE@@/fig.png\""));
    assert!(xml.contains("width=\"120\""));
    assert_eq!(xml.matches("<file name=\"bg.png\"").count(), 2);
    assert!(xml.contains("A stone falls {h} m with \\(g\\) in m/s²."));
}

#[test]
fn missing_images_fail_the_export() {
    let err = serialize_xml(&kitchensink(), &MemoryAssets::new()).unwrap_err();
    assert!(matches!(err, quiz_babel::QuizError::Asset { path, .. } if path == "bg.png" || path == "moon.png" || path == "fig.png"));
}

#[test]
fn saved_attachments_land_in_the_asset_store() {
    let xml = serialize_xml(&kitchensink(), &kitchensink_images()).unwrap();
    let options = XmlOptions {
        save_images: true,
        ..plain()
    };
    let mut written = MemoryAssets::new();
    let quiz = parse_xml(&xml, &options, &mut written).unwrap();
    assert_eq!(written.files["fig.png"], b"figure");
    assert_eq!(written.files["moon.png"], b"moon");

    let corners = quiz.questions.iter().find(|q| q.name == "Corners").unwrap();
    match &corners.kind {
        QuestionKind::DragMarker { background, .. } => {
            // the second copy of bg.png was renamed on the way in
            let background = background.as_deref().unwrap();
            assert!(background.starts_with("bg_"));
            assert_eq!(written.files[background], b"background");
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn xml_to_text_keeps_everything_but_samples() {
    let xml = serialize_xml(&kitchensink(), &kitchensink_images()).unwrap();
    let imported = parse_xml(&xml, &plain(), &mut MemoryAssets::new()).unwrap();
    let text = serialize_text(&imported).unwrap();
    let reread = parse_text(&text, &TextOptions::default()).unwrap();

    assert_eq!(reread.questions.len(), imported.questions.len());
    for (a, b) in imported.questions.iter().zip(&reread.questions) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.body, b.body);
        if a.variables().is_empty() {
            assert_eq!(a, b);
        } else {
            let names = |q: &quiz_babel::Question| {
                q.variables().iter().map(|v| v.name.clone()).collect::<Vec<_>>()
            };
            assert_eq!(names(a), names(b));
        }
    }
}

#[test]
fn registry_round_trip() {
    let registry = FormatRegistry::default();
    assert_eq!(registry.detect_format_from_filename("export.xml").as_deref(), Some("xml"));

    let mut assets = kitchensink_images();
    let xml = registry.serialize(&kitchensink(), "xml", &mut assets).unwrap();
    let quiz = registry.parse(&xml, "xml", &mut assets).unwrap();
    // the registry's xml format converts bodies to Markdown
    assert!(quiz.questions.iter().all(|q| q.body.markdown));
}
