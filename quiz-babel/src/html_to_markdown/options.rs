use serde::Deserialize;

use crate::error::{QuizError, Result};

/// How `h1`..`h6` are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingStyle {
    /// `# Title`
    Atx,
    /// `# Title #`
    AtxClosed,
    /// `Title` over a `===` / `---` rule for levels 1 and 2, ATX below that.
    #[default]
    Underlined,
}

/// Options for [`super::MarkdownConverter`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterOptions {
    pub heading_style: HeadingStyle,
    /// Bullet characters, cycled by `ul` nesting depth.
    pub bullets: String,
    /// `*` or `_`; doubled for strong.
    pub strong_em_symbol: char,
    /// Write `<href>` when a link's text is its own target.
    pub autolinks: bool,
    /// Use the href as title when a link has none.
    pub default_title: bool,
    /// Tags whose handler is skipped (children are still converted).
    pub strip: Option<Vec<String>>,
    /// The only tags whose handler runs.
    pub convert: Option<Vec<String>>,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        ConverterOptions {
            heading_style: HeadingStyle::Underlined,
            bullets: "*+-".to_string(),
            strong_em_symbol: '*',
            autolinks: true,
            default_title: false,
            strip: None,
            convert: None,
        }
    }
}

impl ConverterOptions {
    pub fn validate(&self) -> Result<()> {
        if self.strip.is_some() && self.convert.is_some() {
            return Err(QuizError::Options(
                "you may specify either tags to strip or tags to convert, but not both".into(),
            ));
        }
        if self.bullets.is_empty() {
            return Err(QuizError::Options("bullet palette is empty".into()));
        }
        Ok(())
    }

    pub(crate) fn allows(&self, tag: &str) -> bool {
        let tag = tag.to_ascii_lowercase();
        if let Some(strip) = &self.strip {
            !strip.iter().any(|t| t.eq_ignore_ascii_case(&tag))
        } else if let Some(convert) = &self.convert {
            convert.iter().any(|t| t.eq_ignore_ascii_case(&tag))
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_and_convert_are_exclusive() {
        let options = ConverterOptions {
            strip: Some(vec!["a".into()]),
            convert: Some(vec!["b".into()]),
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(QuizError::Options(_))));
    }

    #[test]
    fn filters_tags() {
        let strip = ConverterOptions {
            strip: Some(vec!["A".into()]),
            ..Default::default()
        };
        assert!(!strip.allows("a"));
        assert!(strip.allows("b"));

        let convert = ConverterOptions {
            convert: Some(vec!["b".into()]),
            ..Default::default()
        };
        assert!(convert.allows("b"));
        assert!(!convert.allows("em"));
    }
}
