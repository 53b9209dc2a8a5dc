//! Format registry for format discovery and selection

use std::collections::HashMap;

use crate::assets::AssetStore;
use crate::error::{QuizError, Result};
use crate::format::Format;
use crate::formats::text::TextFormat;
use crate::formats::xml::XmlFormat;
use crate::quiz::Quiz;

/// Formats by name.
///
/// # Examples
///
/// ```ignore
/// let registry = FormatRegistry::default();
/// let quiz = registry.parse(source, "text", &mut assets)?;
/// let xml = registry.serialize(&quiz, "xml", &mut assets)?;
/// ```
pub struct FormatRegistry {
    formats: HashMap<String, Box<dyn Format>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        FormatRegistry {
            formats: HashMap::new(),
        }
    }

    /// Register a format, replacing any format of the same name.
    pub fn register<F: Format + 'static>(&mut self, format: F) {
        self.formats
            .insert(format.name().to_string(), Box::new(format));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Format> {
        self.formats
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| QuizError::FormatNotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// All format names, sorted.
    pub fn list_formats(&self) -> Vec<String> {
        let mut names: Vec<_> = self.formats.keys().cloned().collect();
        names.sort();
        names
    }

    /// Name of the format whose extensions include `filename`'s extension.
    pub fn detect_format_from_filename(&self, filename: &str) -> Option<String> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_ascii_lowercase();

        self.formats
            .values()
            .find(|format| format.file_extensions().contains(&extension.as_str()))
            .map(|format| format.name().to_string())
    }

    pub fn parse(&self, source: &str, format: &str, assets: &mut dyn AssetStore) -> Result<Quiz> {
        self.get(format)?.parse(source, assets)
    }

    pub fn serialize(&self, quiz: &Quiz, format: &str, assets: &mut dyn AssetStore) -> Result<String> {
        self.get(format)?.serialize(quiz, assets)
    }

    /// Registry with the text and XML formats at their default options.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TextFormat::default());
        registry.register(XmlFormat::default());
        registry
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
