//! Batch recognition: a directory of images in, one outcome per item out.
//!
//! ## Layout
//!
//! ```text
//! images/
//! ├── day-01.jpg        → item "day-01"  (one image)
//! ├── day-02.png        → item "day-02"  (one image)
//! └── trip/             → item "trip"    (all images inside, in name order)
//!     ├── 1.jpg
//!     └── 2.jpg
//! ```
//!
//! Items are independent remote jobs and run concurrently, up to
//! `config.concurrency` at a time. Images inside a folder item run in order
//! so the joined text keeps the page order. A folder item succeeds if any of
//! its images does; the failures are counted in
//! [`BatchOutcome::failed_images`]. Progress callbacks get one terminal event
//! (`on_complete` or `on_error`) per item, not per image.

use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::pipeline::input;
use crate::pipeline::transport::{resolve_transport, Transport};
use crate::recognize::run_stages;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_stream::Stream;
use tracing::{info, warn};

/// Separator between the texts of images grouped in one folder item.
pub const IMAGE_SEPARATOR: &str = "\n\n";

/// One unit of batch work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    pub title: String,
    /// The file or folder the item was built from.
    pub source: PathBuf,
    pub images: Vec<PathBuf>,
}

/// Result of recognising one [`BatchItem`].
#[derive(Debug)]
pub struct BatchOutcome {
    pub title: String,
    pub source: PathBuf,
    pub images: usize,
    pub failed_images: usize,
    pub result: Result<String, OcrError>,
}

/// A boxed stream of batch outcomes, in completion order.
pub type BatchStream = Pin<Box<dyn Stream<Item = BatchOutcome> + Send>>;

/// Build batch items from the top level of `dir`.
///
/// Image files become single-image items titled by their stem; sub-folders
/// become multi-image items titled by the folder name. Folders without
/// images and non-image files are ignored. Items are sorted by title.
///
/// Titles are unique: when a file and a folder (or two files with different
/// extensions) share a name, later items get ` (2)`, ` (3)`, … appended.
pub fn scan_directory(dir: &Path) -> Result<Vec<BatchItem>, OcrError> {
    if !dir.is_dir() {
        return Err(OcrError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut items = Vec::new();
    for path in input::image_files_in(dir)? {
        items.push(BatchItem {
            title: input::title_from_path(&path),
            source: path.clone(),
            images: vec![path],
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| OcrError::Internal(e.to_string()))?;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let images = input::image_files_in(&path)?;
        if images.is_empty() {
            continue;
        }
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("Folder '{}' has {} images", title, images.len());
        items.push(BatchItem {
            title,
            source: path,
            images,
        });
    }

    items.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.source.cmp(&b.source)));
    dedupe_titles(&mut items);
    items.sort_by(|a, b| a.title.cmp(&b.title));
    Ok(items)
}

fn dedupe_titles(items: &mut [BatchItem]) {
    let original: HashSet<String> = items.iter().map(|i| i.title.clone()).collect();
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    for item in items.iter_mut() {
        if seen.insert(item.title.clone()) {
            continue;
        }
        let mut n = 2;
        let title = loop {
            let candidate = format!("{} ({n})", item.title);
            if !original.contains(&candidate) && !seen.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        warn!(
            "Title '{}' already used, saving {} as '{}'",
            item.title,
            item.source.display(),
            title
        );
        seen.insert(title.clone());
        item.title = title;
    }
}

/// Recognise items concurrently, yielding outcomes as they finish.
pub fn recognize_batch_stream(
    items: Vec<BatchItem>,
    config: &OcrConfig,
) -> Result<BatchStream, OcrError> {
    let transport = resolve_transport(config)?;
    let concurrency = config.concurrency;
    let config = config.clone();

    let s = stream::iter(items.into_iter().map(move |item| {
        let transport = Arc::clone(&transport);
        let cfg = config.clone();
        async move { recognize_item(transport.as_ref(), item, &cfg).await }
    }))
    .buffer_unordered(concurrency);

    Ok(Box::pin(s))
}

/// Recognise every item and return the outcomes sorted by title.
pub async fn recognize_batch(
    items: Vec<BatchItem>,
    config: &OcrConfig,
) -> Result<Vec<BatchOutcome>, OcrError> {
    let mut outcomes: Vec<BatchOutcome> = recognize_batch_stream(items, config)?.collect().await;
    outcomes.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.source.cmp(&b.source)));
    Ok(outcomes)
}

async fn recognize_item(transport: &dyn Transport, item: BatchItem, config: &OcrConfig) -> BatchOutcome {
    let mut texts: Vec<String> = Vec::with_capacity(item.images.len());
    let mut first_error: Option<OcrError> = None;
    let mut failed = 0;

    for image in &item.images {
        let result = match input::load_image(image, config.max_upload_bytes).await {
            Ok(bytes) => run_stages(transport, &bytes, &item.title, config)
                .await
                .map(|o| o.text),
            Err(e) => Err(e),
        };
        match result {
            Ok(text) => texts.push(text),
            Err(e) => {
                warn!("Error processing {}: {}", image.display(), e);
                failed += 1;
                first_error.get_or_insert(e);
            }
        }
    }

    let result = match first_error {
        Some(e) if texts.is_empty() => Err(e),
        _ => Ok(texts
            .iter()
            .map(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(IMAGE_SEPARATOR)),
    };

    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(text) => cb.on_complete(&item.title, text.len()),
            Err(e) => cb.on_error(&item.title, &e.to_string()),
        }
    }

    BatchOutcome {
        title: item.title,
        source: item.source,
        images: item.images.len(),
        failed_images: failed,
        result,
    }
}

/// Move a processed file or folder into `processed_dir`.
///
/// On a name clash the Unix timestamp is appended (`name_1718000000.jpg`),
/// then a counter if that is taken too (`name_1718000000_1.jpg`).
/// Returns the new path.
pub async fn archive_source(source: &Path, processed_dir: &Path) -> Result<PathBuf, OcrError> {
    let write_err = |e| OcrError::OutputWriteFailed {
        path: processed_dir.to_path_buf(),
        source: e,
    };
    tokio::fs::create_dir_all(processed_dir)
        .await
        .map_err(write_err)?;

    let name = source.file_name().ok_or_else(|| {
        OcrError::Internal(format!("cannot archive '{}': no file name", source.display()))
    })?;
    let mut target = processed_dir.join(name);
    let ts = unix_now();
    let mut n = 0u32;
    while tokio::fs::try_exists(&target).await.unwrap_or(false) {
        let suffix = if n == 0 {
            ts.to_string()
        } else {
            format!("{ts}_{n}")
        };
        target = processed_dir.join(suffixed_name(source, &suffix));
        n += 1;
    }

    tokio::fs::rename(source, &target).await.map_err(write_err)?;
    info!("Moved {} to {}", source.display(), target.display());
    Ok(target)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn suffixed_name(source: &Path, suffix: &str) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match source.extension() {
        Some(ext) if source.is_file() => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        _ => format!(
            "{}_{suffix}",
            source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(stem)
        ),
    }
}
