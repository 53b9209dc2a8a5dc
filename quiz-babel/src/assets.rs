//! Where image bytes come from and go to
//!
//! Encoding XML reads the images a text body references; decoding XML can
//! write attachments next to the output and download remote images. The
//! codecs only see the [`AssetStore`] trait, so tests run against
//! [`MemoryAssets`] and the CLI uses [`FsAssets`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::common::images::percent_decode;
use crate::error::{QuizError, Result};

pub trait AssetStore {
    /// Read a file referenced from a quiz body.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    fn exists(&self, path: &str) -> bool;

    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Download a remote image.
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>>;
}

/// True for `http://` and `https://` references.
pub fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// The decoded last path segment of a URL, used as a local file name.
pub fn remote_file_name(reference: &str) -> Option<String> {
    let url = Url::parse(reference).ok()?;
    let last = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(percent_decode(last))
}

fn asset_error(path: &str, message: impl ToString) -> QuizError {
    QuizError::Asset {
        path: path.to_string(),
        message: message.to_string(),
    }
}

/// Files on disk. Reads resolve against the input document's directory,
/// writes against the output document's directory.
///
/// Writes are held in memory until [`FsAssets::flush`], so a conversion
/// that fails part way leaves no attachments behind.
#[derive(Debug, Clone)]
pub struct FsAssets {
    read_root: PathBuf,
    write_root: PathBuf,
    pending: BTreeMap<PathBuf, Vec<u8>>,
}

impl FsAssets {
    pub fn new(read_root: impl Into<PathBuf>, write_root: impl Into<PathBuf>) -> Self {
        FsAssets {
            read_root: read_root.into(),
            write_root: write_root.into(),
            pending: BTreeMap::new(),
        }
    }

    /// Write every buffered attachment to disk and return how many there were.
    pub fn flush(&mut self) -> Result<usize> {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();
        for (target, bytes) in pending {
            let path = target.display().to_string();
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| asset_error(&path, e))?;
            }
            fs::write(&target, bytes).map_err(|e| asset_error(&path, e))?;
        }
        Ok(count)
    }

    fn resolve(root: &Path, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            root.join(candidate)
        }
    }
}

impl AssetStore for FsAssets {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(Self::resolve(&self.read_root, path)).map_err(|e| asset_error(path, e))
    }

    fn exists(&self, path: &str) -> bool {
        let target = Self::resolve(&self.write_root, path);
        self.pending.contains_key(&target) || target.exists()
    }

    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let target = Self::resolve(&self.write_root, path);
        self.pending.insert(target, bytes.to_vec());
        Ok(())
    }

    fn fetch(&mut self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "downloading image");
        let response = reqwest::blocking::get(url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| asset_error(url, e))?;
        let bytes = response.bytes().map_err(|e| asset_error(url, e))?;
        Ok(bytes.to_vec())
    }
}

/// In-memory files, plus canned responses for remote URLs.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    pub files: BTreeMap<String, Vec<u8>>,
    pub remote: BTreeMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, bytes: &[u8]) -> Self {
        self.files.insert(path.to_string(), bytes.to_vec());
        self
    }

    pub fn with_remote(mut self, url: &str, bytes: &[u8]) -> Self {
        self.remote.insert(url.to_string(), bytes.to_vec());
        self
    }
}

impl AssetStore for MemoryAssets {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| asset_error(path, "no such file"))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        self.files.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn fetch(&mut self, url: &str) -> Result<Vec<u8>> {
        self.remote
            .get(url)
            .cloned()
            .ok_or_else(|| asset_error(url, "unreachable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_names_are_decoded() {
        assert_eq!(
            remote_file_name("https://example.org/img/my%20plot.png?x=1").as_deref(),
            Some("my plot.png")
        );
        assert_eq!(remote_file_name("not a url"), None);
        assert!(is_remote("http://a/b.png"));
        assert!(!is_remote("b.png"));
    }

    #[test]
    fn fs_assets_read_and_write_in_their_roots() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("a.png"), b"png").unwrap();

        let mut assets = FsAssets::new(input.path(), output.path());
        assert_eq!(assets.read("a.png").unwrap(), b"png");
        assert!(!assets.exists("a.png"));

        assets.write("sub/b.png", b"data").unwrap();
        assert!(assets.exists("sub/b.png"));
        assert_eq!(assets.flush().unwrap(), 1);
        assert_eq!(std::fs::read(output.path().join("sub/b.png")).unwrap(), b"data");
    }

    #[test]
    fn fs_assets_hold_writes_until_flushed() {
        let output = tempfile::tempdir().unwrap();
        let mut assets = FsAssets::new(output.path(), output.path());

        assets.write("plot.png", b"png").unwrap();
        assert!(assets.exists("plot.png"));
        assert!(!output.path().join("plot.png").exists());

        drop(assets);
        assert!(!output.path().join("plot.png").exists());
    }

    #[test]
    fn missing_files_are_asset_errors() {
        let assets = MemoryAssets::new();
        assert!(matches!(assets.read("x.png"), Err(QuizError::Asset { .. })));
    }
}
