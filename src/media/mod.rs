pub mod catalog;
#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Used when the catalog reports no usable frame rate for a clip.
pub const DEFAULT_FRAME_RATE: f64 = 24.0;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Clip not found in catalog: {0}")]
    NotFound(String),
    #[error("Catalog returned HTTP {status} for {video_id}")]
    Status { status: u16, video_id: String },
    #[error("Catalog request failed: {0}")]
    Transport(String),
    #[error("Unexpected catalog response: {0}")]
    InvalidResponse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Network trouble, timeouts, throttling and server errors may clear up
    /// on their own; everything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::NotFound(_) | Self::InvalidResponse(_) | Self::Io(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Failed to prepare download directory {path}: {source}")]
    DownloadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to fetch {video_id} after {attempts} attempt(s): {source}")]
    Fetch {
        video_id: String,
        attempts: u32,
        #[source]
        source: CatalogError,
    },
}

/// What the catalog knows about a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "fps", default)]
    pub frame_rate: Option<f64>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// The remote clip catalog. Implementations must be shareable across the
/// assembler's resolver threads.
pub trait MediaCatalog: Send + Sync {
    fn get_metadata(&self, video_id: &str) -> Result<ClipMetadata, CatalogError>;

    /// Store the clip's media at `destination`, replacing any existing file,
    /// and return the path written.
    fn download(&self, clip: &ClipMetadata, destination: &Path) -> Result<PathBuf, CatalogError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMedia {
    pub source_id: String,
    pub local_path: PathBuf,
    pub frame_rate: f64,
    pub available: bool,
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Extra attempts after a transient failure.
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

pub struct MediaResolver<C> {
    catalog: C,
    config: ResolverConfig,
    /// Local file -> the video id it was downloaded for.
    claims: Mutex<HashMap<PathBuf, String>>,
}

impl<C: MediaCatalog> MediaResolver<C> {
    pub fn new(catalog: C, config: ResolverConfig) -> Self {
        Self {
            catalog,
            config,
            claims: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Look up `video_id` and materialize its media under `download_dir`.
    ///
    /// A clip without a download URL comes back with `available == false`
    /// and nothing is written.
    pub fn resolve(&self, video_id: &str, download_dir: &Path) -> Result<ResolvedMedia, ResolveError> {
        let dir_error = |source| ResolveError::DownloadDir {
            path: download_dir.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(download_dir).map_err(dir_error)?;

        let metadata = self.with_retries(video_id, "metadata lookup", || {
            self.catalog.get_metadata(video_id)
        })?;

        let frame_rate = effective_frame_rate(metadata.frame_rate);
        let download_dir = std::path::absolute(download_dir).map_err(dir_error)?;

        let has_url = metadata
            .download_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        let local_path = self.local_path(&download_dir, &metadata, video_id, has_url);
        if !has_url {
            log::info!("Skipping video {video_id} - no download URL provided");
            return Ok(ResolvedMedia {
                source_id: video_id.to_string(),
                local_path,
                frame_rate,
                available: false,
            });
        }

        let written = self.with_retries(video_id, "download", || {
            self.catalog.download(&metadata, &local_path)
        })?;
        log::info!("Downloaded video {video_id} to {}", written.display());

        Ok(ResolvedMedia {
            source_id: video_id.to_string(),
            local_path: written,
            frame_rate,
            available: true,
        })
    }

    /// `<name>.mp4`, or `<name>_<video_id>.mp4` once another video owns the
    /// plain name in this directory. Only downloads take ownership.
    fn local_path(&self, dir: &Path, metadata: &ClipMetadata, video_id: &str, claim: bool) -> PathBuf {
        let stem = file_stem(metadata, video_id);
        let plain = dir.join(format!("{stem}.mp4"));

        let mut claims = self.claims.lock();
        let path = match claims.get(&plain) {
            Some(owner) if owner != video_id => {
                dir.join(format!("{stem}_{}.mp4", sanitize(video_id)))
            }
            _ => plain,
        };
        if claim {
            claims
                .entry(path.clone())
                .or_insert_with(|| video_id.to_string());
        }
        path
    }

    fn with_retries<T, F>(&self, video_id: &str, what: &str, mut op: F) -> Result<T, ResolveError>
    where
        F: FnMut() -> Result<T, CatalogError>,
    {
        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    log::warn!("{what} for {video_id} failed (attempt {attempt}/{max_attempts}): {e}");
                    std::thread::sleep(self.config.retry_backoff * attempt);
                    attempt += 1;
                }
                Err(source) => {
                    return Err(ResolveError::Fetch {
                        video_id: video_id.to_string(),
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }
}

/// Zero, negative and non-finite rates count as unreported.
pub fn effective_frame_rate(reported: Option<f64>) -> f64 {
    reported
        .filter(|rate| rate.is_finite() && *rate > 0.0)
        .unwrap_or(DEFAULT_FRAME_RATE)
}

/// The clip's catalog name, falling back to its id.
fn file_stem(metadata: &ClipMetadata, video_id: &str) -> String {
    let name = metadata
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(video_id);
    sanitize(name)
}

fn sanitize(name: &str) -> String {
    name.replace(['/', '\\', ':'], "_")
}
