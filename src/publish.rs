//! Publish boundary: hand extracted text to whatever delivers it.
//!
//! Recognition stops at a `String`. Where that text goes next (a blog, a
//! mailbox, a folder of `.txt` files) is a [`Publisher`]. The crate ships
//! [`FilePublisher`], which the CLI uses; other destinations implement the
//! trait.

use crate::error::OcrError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// A titled piece of text ready to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    title: String,
    content: String,
}

impl Post {
    /// Create a post. The title is trimmed and must not be empty.
    pub fn new(title: impl AsRef<str>, content: impl Into<String>) -> Result<Self, OcrError> {
        let title = title.as_ref().trim();
        if title.is_empty() {
            return Err(OcrError::MissingTitle);
        }
        Ok(Self {
            title: title.to_string(),
            content: content.into(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Where a post ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    /// Destination identifier: a path, URL, or message id.
    pub location: String,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, post: &Post) -> Result<PublishReceipt, OcrError>;
}

/// Writes each post to `{dir}/{title}.txt`.
#[derive(Debug, Clone)]
pub struct FilePublisher {
    dir: PathBuf,
}

impl FilePublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Destination path for a post.
    pub fn path_for(&self, post: &Post) -> PathBuf {
        self.dir.join(format!("{}.txt", sanitize_file_name(post.title())))
    }
}

#[async_trait]
impl Publisher for FilePublisher {
    async fn publish(&self, post: &Post) -> Result<PublishReceipt, OcrError> {
        let path = self.path_for(post);
        write_atomic(&path, post.content()).await?;
        info!("Saved extracted text to {}", path.display());
        Ok(PublishReceipt {
            location: path.display().to_string(),
        })
    }
}

/// Write via a sibling temp file and rename, so readers never see a
/// half-written file.
async fn write_atomic(path: &Path, content: &str) -> Result<(), OcrError> {
    let write_err = |source| OcrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, content).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}

static RE_UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]+"#).unwrap());

/// Make a title safe to use as a file name on every common filesystem.
pub fn sanitize_file_name(title: &str) -> String {
    let cleaned = RE_UNSAFE_CHARS.replace_all(title.trim(), "_");
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_requires_title() {
        assert!(matches!(Post::new("   ", "x"), Err(OcrError::MissingTitle)));
        let p = Post::new("  Day 1 ", "text").unwrap();
        assert_eq!(p.title(), "Day 1");
        assert_eq!(p.content(), "text");
    }

    #[test]
    fn sanitizes_reserved_characters() {
        assert_eq!(sanitize_file_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_file_name("what? <now>"), "what_ _now_");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
        assert_eq!(sanitize_file_name("../.."), "_");
        assert_eq!(sanitize_file_name("..."), "untitled");
        assert_eq!(sanitize_file_name("दादी की डायरी"), "दादी की डायरी");
    }

    #[tokio::test]
    async fn file_publisher_writes_text() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = FilePublisher::new(dir.path().join("output"));
        let post = Post::new("Day 1", "Hello\nWorld").unwrap();

        let receipt = publisher.publish(&post).await.unwrap();
        let path = dir.path().join("output").join("Day 1.txt");
        assert_eq!(receipt.location, path.display().to_string());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Hello\nWorld");
        assert!(!path.with_extension("txt.tmp").exists());
    }

    #[tokio::test]
    async fn file_publisher_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = FilePublisher::new(dir.path());
        publisher.publish(&Post::new("a", "one").unwrap()).await.unwrap();
        publisher.publish(&Post::new("a", "two").unwrap()).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "two"
        );
    }
}
