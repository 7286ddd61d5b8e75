pub mod parser;
pub mod timecode;
pub mod writer;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Failed to write timeline to {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Clip '{clip}' has an invalid range: {message}")]
    InvalidRange { clip: String, message: String },
    #[error("Clip '{clip}' is invalid: {message}")]
    InvalidClip { clip: String, message: String },
    #[error("Failed to read timeline: {0}")]
    Read(#[from] std::io::Error),
    #[error("Invalid timeline document: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RationalTime {
    pub value: f64,
    pub rate: f64,
}

impl RationalTime {
    pub fn new(value: f64, rate: f64) -> Self {
        Self { value, rate }
    }

    pub fn from_frames(frames: i64, rate: f64) -> Self {
        Self { value: frames as f64, rate }
    }

    pub fn seconds(&self) -> f64 {
        if self.rate == 0.0 { 0.0 } else { self.value / self.rate }
    }

    /// Whole frame count. Values built by the timecode converter are integral.
    pub fn frames(&self) -> i64 {
        self.value.floor() as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: RationalTime,
    pub duration: RationalTime,
}

impl TimeRange {
    pub fn new(start: RationalTime, duration: RationalTime) -> Self {
        Self { start, duration }
    }

    /// Range covering `[start, end)`; both points must share a rate.
    pub fn from_start_end(start: RationalTime, end: RationalTime) -> Self {
        Self {
            start,
            duration: RationalTime::new(end.value - start.value, start.rate),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Video => "Video",
            TrackKind::Audio => "Audio",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    pub media_ref: Option<String>,
    pub source_range: Option<TimeRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub kind: TrackKind,
    pub clips: Vec<Clip>,
}

impl Track {
    pub fn new(name: &str, kind: TrackKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            clips: Vec::new(),
        }
    }

    /// Clips play back to back, so the track lasts as long as their sum.
    pub fn duration_seconds(&self) -> f64 {
        self.clips
            .iter()
            .filter_map(|c| c.source_range.as_ref())
            .map(|r| r.duration.seconds())
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub name: String,
    pub tracks: Vec<Track>,
}

impl Timeline {
    pub fn with_track(name: &str, track: Track) -> Self {
        Self {
            name: name.to_string(),
            tracks: vec![track],
        }
    }

    pub fn clip_count(&self) -> usize {
        self.tracks.iter().map(|t| t.clips.len()).sum()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.tracks
            .iter()
            .map(Track::duration_seconds)
            .fold(0.0, f64::max)
    }
}
