//! `[[group@text]]` markers in gap question bodies

use super::GapChoice;
use crate::common::brackets::{extract_balanced, Delimiters};

pub type GapMarker = GapChoice;

const GAP: Delimiters<'static> = Delimiters::new("[[", "]]");

/// Markers of `body` in order of appearance, repeats included.
///
/// Fails with a message when a marker has no `@` or a bad group.
pub fn gap_markers(body: &str) -> Result<Vec<GapMarker>, String> {
    extract_balanced(body, "", GAP)
        .into_iter()
        .map(|marker| {
            let (group, text) = marker
                .split_once('@')
                .ok_or_else(|| format!("gap marker '[[{marker}]]' has no '@'"))?;
            let (group, unlimited) = GapChoice::parse_group(group)
                .ok_or_else(|| format!("gap marker '[[{marker}]]' has an invalid group"))?;
            Ok(GapChoice {
                group,
                unlimited,
                text: text.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_markers_in_order() {
        let markers = gap_markers("The [[1@cat]] sat on the [[2U@mat]] near [[1@cat]].").unwrap();
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].text, "cat");
        assert!(markers[1].unlimited);
        assert_eq!(markers[1].group, 2);
    }

    #[test]
    fn text_may_contain_at_signs() {
        let markers = gap_markers("[[1@a@b.org]]").unwrap();
        assert_eq!(markers[0].text, "a@b.org");
    }

    #[test]
    fn malformed_markers() {
        assert!(gap_markers("[[nothing]]").is_err());
        assert!(gap_markers("[[x@y]]").is_err());
    }
}
