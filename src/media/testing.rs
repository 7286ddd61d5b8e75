use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::{CatalogError, ClipMetadata, MediaCatalog};

#[derive(Default)]
pub(crate) struct FakeCatalog {
    clips: HashMap<String, ClipMetadata>,
    transient_failures: Mutex<HashMap<String, u32>>,
    delays: HashMap<String, Duration>,
    metadata_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl FakeCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_clip(mut self, id: &str, name: &str, fps: Option<f64>) -> Self {
        self.clips.insert(
            id.to_string(),
            ClipMetadata {
                id: id.to_string(),
                name: Some(name.to_string()),
                frame_rate: fps,
                download_url: Some(format!("https://cdn.example/{id}.mp4")),
            },
        );
        self
    }

    pub(crate) fn with_unavailable_clip(mut self, id: &str, name: &str) -> Self {
        self.clips.insert(
            id.to_string(),
            ClipMetadata {
                id: id.to_string(),
                name: Some(name.to_string()),
                frame_rate: None,
                download_url: None,
            },
        );
        self
    }

    /// Fail the next `count` metadata lookups for `id` with a transport error.
    pub(crate) fn with_transient_failures(self, id: &str, count: u32) -> Self {
        self.transient_failures.lock().insert(id.to_string(), count);
        self
    }

    /// Delay metadata lookups for `id`, to shuffle completion order.
    pub(crate) fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    pub(crate) fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

impl MediaCatalog for FakeCatalog {
    fn get_metadata(&self, video_id: &str) -> Result<ClipMetadata, CatalogError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(video_id) {
            std::thread::sleep(*delay);
        }
        if let Some(remaining) = self.transient_failures.lock().get_mut(video_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CatalogError::Transport("connection reset".into()));
            }
        }
        self.clips
            .get(video_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(video_id.to_string()))
    }

    fn download(&self, clip: &ClipMetadata, destination: &Path) -> Result<PathBuf, CatalogError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(destination, format!("media:{}", clip.id))?;
        Ok(destination.to_path_buf())
    }
}
