use std::path::Path;
use super::{Timeline, Track, TrackKind, Clip, TimeRange, RationalTime, TimelineError};

/// Parse an OTIO JSON file into our Timeline model.
pub fn parse_otio_file(path: &Path) -> Result<Timeline, TimelineError> {
    let content = std::fs::read_to_string(path)?;
    parse_otio_json(&content)
}

pub fn parse_otio_json(json_str: &str) -> Result<Timeline, TimelineError> {
    let value: serde_json::Value = serde_json::from_str(json_str)?;

    let schema_type = value.get("OTIO_SCHEMA")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    if schema_type.starts_with("Timeline") {
        parse_timeline_object(&value)
    } else if schema_type.starts_with("SerializableCollection") {
        let children = value.get("children")
            .and_then(|v| v.as_array())
            .ok_or_else(|| TimelineError::Parse("No children in collection".into()))?;
        match children.first() {
            Some(first) => parse_timeline_object(first),
            None => Err(TimelineError::Parse("Empty collection".into())),
        }
    } else {
        Err(TimelineError::Parse(format!("Unsupported OTIO schema: {schema_type}")))
    }
}

fn parse_timeline_object(value: &serde_json::Value) -> Result<Timeline, TimelineError> {
    let name = value.get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("Untitled")
        .to_string();

    let track_list = value.get("tracks")
        .and_then(|stack| stack.get("children"))
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let tracks: Vec<Track> = track_list.iter()
        .enumerate()
        .map(|(i, track_val)| parse_track(i, track_val))
        .collect();

    Ok(Timeline { name, tracks })
}

fn parse_track(index: usize, value: &serde_json::Value) -> Track {
    let name = value.get("name")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Track {}", index + 1));

    let kind = match value.get("kind").and_then(|v| v.as_str()) {
        Some("Audio") => TrackKind::Audio,
        _ => TrackKind::Video,
    };

    // Gaps and transitions carry no media; only clips survive.
    let clips: Vec<Clip> = value.get("children")
        .and_then(|v| v.as_array())
        .map(|children| {
            children.iter()
                .filter(|child| {
                    child.get("OTIO_SCHEMA")
                        .and_then(|v| v.as_str())
                        .is_some_and(|s| s.starts_with("Clip"))
                })
                .map(parse_clip)
                .collect()
        })
        .unwrap_or_default();

    Track { name, kind, clips }
}

fn parse_clip(value: &serde_json::Value) -> Clip {
    let name = value.get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("Untitled Clip")
        .to_string();

    let media_ref = media_reference(value)
        .and_then(|r| r.get("target_url"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let source_range = value.get("source_range").and_then(parse_time_range);

    Clip { name, media_ref, source_range }
}

/// `Clip.1` stores a single `media_reference`; `Clip.2` keys several under
/// `media_references` and names the active one.
fn media_reference(clip: &serde_json::Value) -> Option<&serde_json::Value> {
    if let Some(single) = clip.get("media_reference").filter(|v| !v.is_null()) {
        return Some(single);
    }
    let key = clip.get("active_media_reference_key")
        .and_then(|v| v.as_str())
        .unwrap_or("DEFAULT_MEDIA");
    clip.get("media_references")?.get(key)
}

fn parse_time_range(value: &serde_json::Value) -> Option<TimeRange> {
    let start_time = value.get("start_time")?;
    let duration = value.get("duration")?;

    Some(TimeRange::new(
        RationalTime::new(start_time.get("value")?.as_f64()?, start_time.get("rate")?.as_f64()?),
        RationalTime::new(duration.get("value")?.as_f64()?, duration.get("rate")?.as_f64()?),
    ))
}
