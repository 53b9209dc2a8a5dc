//! Shared configuration loader for moodlemd.
//!
//! `defaults/quiz.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`QuizConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use quiz_babel::html_to_markdown::{ConverterOptions, HeadingStyle};
use quiz_babel::{TextOptions, XmlOptions};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/quiz.default.toml");

/// Top-level configuration consumed by the converter.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizConfig {
    pub text: TextConfig,
    pub xml: XmlConfig,
    pub markdown: MarkdownConfig,
}

/// Reading the text notation.
#[derive(Debug, Clone, Deserialize)]
pub struct TextConfig {
    pub n_samples: usize,
    pub seed: u64,
    pub sort_questions: bool,
}

impl From<&TextConfig> for TextOptions {
    fn from(config: &TextConfig) -> Self {
        TextOptions {
            n_samples: config.n_samples,
            seed: config.seed,
        }
    }
}

/// Reading Moodle XML.
#[derive(Debug, Clone, Deserialize)]
pub struct XmlConfig {
    pub markdown: bool,
    pub save_images: bool,
    pub download_images: bool,
    pub repair_ranges: bool,
}

/// Mirrors the knobs of the HTML to Markdown converter.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownConfig {
    pub heading_style: HeadingStyle,
    pub bullets: String,
    pub strong_em_symbol: char,
    pub autolinks: bool,
    pub default_title: bool,
}

impl From<&MarkdownConfig> for ConverterOptions {
    fn from(config: &MarkdownConfig) -> Self {
        ConverterOptions {
            heading_style: config.heading_style,
            bullets: config.bullets.clone(),
            strong_em_symbol: config.strong_em_symbol,
            autolinks: config.autolinks,
            default_title: config.default_title,
            ..ConverterOptions::default()
        }
    }
}

impl QuizConfig {
    pub fn text_options(&self) -> TextOptions {
        (&self.text).into()
    }

    pub fn markdown_options(&self) -> ConverterOptions {
        (&self.markdown).into()
    }

    /// XML switches together with the converter they use for bodies.
    pub fn xml_options(&self) -> XmlOptions {
        XmlOptions {
            markdown: self.xml.markdown,
            save_images: self.xml.save_images,
            download_images: self.xml.download_images,
            repair_ranges: self.xml.repair_ranges,
            converter: self.markdown_options(),
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (used for CLI flags).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<QuizConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<QuizConfig, ConfigError> {
    Loader::new().build()
}
