use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use super::{Clip, RationalTime, TimeRange, Timeline, TimelineError, Track};

const DEFAULT_MEDIA_KEY: &str = "DEFAULT_MEDIA";

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub pretty: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Writes timelines as OpenTimelineIO JSON documents.
pub struct TimelineWriter {
    config: WriterConfig,
}

impl TimelineWriter {
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Check the graph before anything reaches disk.
    pub fn validate(&self, timeline: &Timeline) -> Result<(), TimelineError> {
        for track in &timeline.tracks {
            for clip in &track.clips {
                validate_clip(clip)?;
            }
        }
        Ok(())
    }

    pub fn to_json(&self, timeline: &Timeline) -> Result<String, TimelineError> {
        self.validate(timeline)?;
        let doc = OtioTimeline::from(timeline);
        let json = if self.config.pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        Ok(json)
    }

    /// Write `timeline` to `destination` through a sibling temp file that is
    /// renamed into place, so readers never observe a partial document.
    pub fn write(&self, timeline: &Timeline, destination: &Path) -> Result<(), TimelineError> {
        let json = self.to_json(timeline)?;

        let serialization = |source: std::io::Error| TimelineError::Serialization {
            path: destination.to_path_buf(),
            source,
        };

        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(parent).map_err(serialization)?;
        tmp.write_all(json.as_bytes()).map_err(serialization)?;
        tmp.write_all(b"\n").map_err(serialization)?;
        tmp.as_file().sync_all().map_err(serialization)?;
        tmp.persist(destination).map_err(|e| serialization(e.error))?;

        log::info!(
            "Wrote timeline '{}' ({} clips) to {}",
            timeline.name,
            timeline.clip_count(),
            destination.display()
        );
        Ok(())
    }
}

fn validate_clip(clip: &Clip) -> Result<(), TimelineError> {
    let invalid_range = |message: String| TimelineError::InvalidRange {
        clip: clip.name.clone(),
        message,
    };

    match clip.media_ref.as_deref() {
        Some(target) if !target.is_empty() => {}
        _ => {
            return Err(TimelineError::InvalidClip {
                clip: clip.name.clone(),
                message: "missing media reference".into(),
            })
        }
    }

    let range = clip
        .source_range
        .as_ref()
        .ok_or_else(|| invalid_range("missing source range".into()))?;

    for time in [&range.start, &range.duration] {
        if !time.rate.is_finite() || time.rate <= 0.0 {
            return Err(invalid_range(format!("rate {} is not positive", time.rate)));
        }
        if !time.value.is_finite() {
            return Err(invalid_range(format!("value {} is not finite", time.value)));
        }
    }
    if range.start.value < 0.0 {
        return Err(invalid_range(format!("negative start {}", range.start.value)));
    }
    if range.duration.value <= 0.0 {
        return Err(invalid_range(format!(
            "duration {} is not positive",
            range.duration.value
        )));
    }
    Ok(())
}

// ── OTIO document shapes ──

#[derive(Serialize)]
struct OtioTimeline<'a> {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    metadata: BTreeMap<String, serde_json::Value>,
    name: &'a str,
    global_start_time: Option<OtioRationalTime>,
    tracks: OtioStack<'a>,
}

#[derive(Serialize)]
struct OtioStack<'a> {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    metadata: BTreeMap<String, serde_json::Value>,
    name: &'static str,
    source_range: Option<OtioTimeRange>,
    effects: Vec<serde_json::Value>,
    markers: Vec<serde_json::Value>,
    enabled: bool,
    children: Vec<OtioTrack<'a>>,
}

#[derive(Serialize)]
struct OtioTrack<'a> {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    metadata: BTreeMap<String, serde_json::Value>,
    name: &'a str,
    source_range: Option<OtioTimeRange>,
    effects: Vec<serde_json::Value>,
    markers: Vec<serde_json::Value>,
    enabled: bool,
    children: Vec<OtioClip<'a>>,
    kind: &'static str,
}

#[derive(Serialize)]
struct OtioClip<'a> {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    metadata: BTreeMap<String, serde_json::Value>,
    name: &'a str,
    source_range: Option<OtioTimeRange>,
    effects: Vec<serde_json::Value>,
    markers: Vec<serde_json::Value>,
    enabled: bool,
    media_references: BTreeMap<&'static str, OtioExternalReference<'a>>,
    active_media_reference_key: &'static str,
}

#[derive(Serialize)]
struct OtioExternalReference<'a> {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    metadata: BTreeMap<String, serde_json::Value>,
    name: &'static str,
    available_range: Option<OtioTimeRange>,
    available_image_bounds: Option<serde_json::Value>,
    target_url: &'a str,
}

#[derive(Serialize)]
struct OtioTimeRange {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    duration: OtioRationalTime,
    start_time: OtioRationalTime,
}

#[derive(Serialize)]
struct OtioRationalTime {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    rate: f64,
    value: f64,
}

impl<'a> From<&'a Timeline> for OtioTimeline<'a> {
    fn from(timeline: &'a Timeline) -> Self {
        Self {
            schema: "Timeline.1",
            metadata: BTreeMap::new(),
            name: &timeline.name,
            global_start_time: None,
            tracks: OtioStack {
                schema: "Stack.1",
                metadata: BTreeMap::new(),
                name: "tracks",
                source_range: None,
                effects: Vec::new(),
                markers: Vec::new(),
                enabled: true,
                children: timeline.tracks.iter().map(OtioTrack::from).collect(),
            },
        }
    }
}

impl<'a> From<&'a Track> for OtioTrack<'a> {
    fn from(track: &'a Track) -> Self {
        Self {
            schema: "Track.1",
            metadata: BTreeMap::new(),
            name: &track.name,
            source_range: None,
            effects: Vec::new(),
            markers: Vec::new(),
            enabled: true,
            children: track.clips.iter().map(OtioClip::from).collect(),
            kind: track.kind.as_str(),
        }
    }
}

impl<'a> From<&'a Clip> for OtioClip<'a> {
    fn from(clip: &'a Clip) -> Self {
        let mut media_references = BTreeMap::new();
        if let Some(target) = clip.media_ref.as_deref() {
            media_references.insert(
                DEFAULT_MEDIA_KEY,
                OtioExternalReference {
                    schema: "ExternalReference.1",
                    metadata: BTreeMap::new(),
                    name: "",
                    available_range: None,
                    available_image_bounds: None,
                    target_url: target,
                },
            );
        }
        Self {
            schema: "Clip.2",
            metadata: BTreeMap::new(),
            name: &clip.name,
            source_range: clip.source_range.as_ref().map(OtioTimeRange::from),
            effects: Vec::new(),
            markers: Vec::new(),
            enabled: true,
            media_references,
            active_media_reference_key: DEFAULT_MEDIA_KEY,
        }
    }
}

impl From<&TimeRange> for OtioTimeRange {
    fn from(range: &TimeRange) -> Self {
        Self {
            schema: "TimeRange.1",
            duration: OtioRationalTime::from(&range.duration),
            start_time: OtioRationalTime::from(&range.start),
        }
    }
}

impl From<&RationalTime> for OtioRationalTime {
    fn from(time: &RationalTime) -> Self {
        Self {
            schema: "RationalTime.1",
            rate: time.rate,
            value: time.value,
        }
    }
}
