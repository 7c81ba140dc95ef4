//! Image attachment resolution
//!
//! Turns the opaque references users attach into decoded images no larger
//! than the configured bound, re-encoded as PNG for inline transport.

use crate::llm::DecodedImage;
use crate::message::ImageRef;
use crate::session::ImageFetcher;
use async_trait::async_trait;
use image::imageops::FilterType;
use image::ImageFormat;
use reqwest::Url;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Longest edge, in pixels, an attachment is scaled down to
pub const DEFAULT_MAX_DIMENSION: u32 = 768;

/// Maximum attachment file size (20MB)
const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

const FILE_URI_PREFIX: &str = "file://";

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image too large: {0} bytes")]
    TooLarge(u64),
    #[error("Attachment host is no longer available")]
    HostGone,
}

/// Directory relative image references resolve against
///
/// Owned by the host; fetchers only hold a weak reference to it.
#[derive(Debug, Clone)]
pub struct AttachmentRoot {
    dir: PathBuf,
}

impl AttachmentRoot {
    pub fn new(dir: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self { dir: dir.into() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Plain paths are used as given; `file://` URIs are percent-decoded
    /// and may name `localhost` as their host
    fn resolve_path(&self, reference: &ImageRef) -> PathBuf {
        let raw = reference.as_str();
        let path = match raw.strip_prefix(FILE_URI_PREFIX) {
            Some(rest) => Url::parse(raw)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .unwrap_or_else(|| PathBuf::from(rest)),
            None => PathBuf::from(raw),
        };
        if path.is_absolute() {
            path
        } else {
            self.dir.join(path)
        }
    }
}

/// Production `ImageFetcher` reading local files
pub struct FileImageFetcher {
    root: Weak<AttachmentRoot>,
    max_dimension: u32,
}

impl FileImageFetcher {
    pub fn new(root: &Arc<AttachmentRoot>) -> Self {
        Self {
            root: Arc::downgrade(root),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }
}

#[async_trait]
impl ImageFetcher for FileImageFetcher {
    async fn resolve(&self, reference: &ImageRef) -> Result<DecodedImage, AttachmentError> {
        let path = {
            let root = self.root.upgrade().ok_or(AttachmentError::HostGone)?;
            root.resolve_path(reference)
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AttachmentError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(AttachmentError::NotFound(path.display().to_string()));
        }
        if metadata.len() > MAX_FILE_SIZE {
            return Err(AttachmentError::TooLarge(metadata.len()));
        }

        let bytes = tokio::fs::read(&path).await?;
        let max_dimension = self.max_dimension;
        let image = tokio::task::spawn_blocking(move || decode_bounded(&bytes, max_dimension))
            .await
            .map_err(|e| AttachmentError::Decode(format!("decoder task failed: {e}")))??;

        tracing::debug!(
            reference = %reference,
            width = image.width,
            height = image.height,
            "Resolved image attachment"
        );
        Ok(image)
    }
}

/// Decode, scale the longest edge down to `max_dimension`, encode as PNG
///
/// Aspect ratio is preserved. Images already within the bound are not
/// upscaled; the bound is a cap, not a target size.
pub fn decode_bounded(bytes: &[u8], max_dimension: u32) -> Result<DecodedImage, AttachmentError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| AttachmentError::Decode(e.to_string()))?;

    let bounded = if decoded.width() > max_dimension || decoded.height() > max_dimension {
        decoded.resize(max_dimension, max_dimension, FilterType::Lanczos3)
    } else {
        decoded
    };

    let mut data = Vec::new();
    bounded
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .map_err(|e| AttachmentError::Decode(e.to_string()))?;

    Ok(DecodedImage {
        width: bounded.width(),
        height: bounded.height(),
        media_type: "image/png".to_string(),
        data,
    })
}
