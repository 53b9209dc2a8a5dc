//! Format trait definition
//!
//! Every quiz encoding implements [`Format`]: it turns source text into a
//! [`Quiz`] and back. Image bytes go through an [`AssetStore`] so formats
//! never touch the filesystem or network directly.

use crate::assets::AssetStore;
use crate::error::Result;
use crate::quiz::Quiz;

/// A quiz encoding.
///
/// # Examples
///
/// ```ignore
/// struct Lines;
///
/// impl Format for Lines {
///     fn name(&self) -> &str {
///         "lines"
///     }
///
///     fn parse(&self, source: &str, _assets: &mut dyn AssetStore) -> Result<Quiz> {
///         todo!()
///     }
///
///     fn serialize(&self, quiz: &Quiz, _assets: &mut dyn AssetStore) -> Result<String> {
///         todo!()
///     }
/// }
/// ```
pub trait Format: Send + Sync {
    /// The name of this format (e.g., "text", "xml")
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// File extensions without the leading dot, used for detection from
    /// filenames.
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    /// Decode source text. The result has been validated.
    fn parse(&self, source: &str, assets: &mut dyn AssetStore) -> Result<Quiz>;

    /// Encode a quiz. Fails on a quiz that breaks its schema rules.
    fn serialize(&self, quiz: &Quiz, assets: &mut dyn AssetStore) -> Result<String>;
}
