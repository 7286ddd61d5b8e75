use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::media::{MediaCatalog, MediaResolver, ResolveError, ResolvedMedia};
use crate::spec::{CutRequest, EditSpecification};
use crate::timeline::timecode::{Timecode, TimecodeError};
use crate::timeline::{Clip, TimeRange, Timeline, Track, TrackKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipNaming {
    /// Every clip is named `clip_<edit_name>`.
    Shared,
    /// `clip_<edit_name>_<NNN>`, numbered by position in the track.
    Indexed,
}

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Concurrent resolutions; 1 keeps everything on the calling thread.
    pub jobs: usize,
    pub naming: ClipNaming,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            naming: ClipNaming::Shared,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MalformedTimecode(TimecodeError),
    MediaUnavailable,
    FetchFailed(String),
    /// The out point is not after the in point, at any frame rate.
    ReversedRange { start: String, end: String },
    /// The cut truncates to zero frames at the clip's rate.
    EmptyRange { start_frame: i64, end_frame: i64 },
}

impl SkipReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedTimecode(_) => "MALFORMED_TIMECODE",
            Self::MediaUnavailable => "MEDIA_UNAVAILABLE",
            Self::FetchFailed(_) => "FETCH_FAILED",
            Self::ReversedRange { .. } | Self::EmptyRange { .. } => "EMPTY_RANGE",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedTimecode(e) => write!(f, "{e}"),
            Self::MediaUnavailable => write!(f, "no download URL provided"),
            Self::FetchFailed(message) => write!(f, "{message}"),
            Self::ReversedRange { start, end } => {
                write!(f, "end {end} is not after start {start}")
            }
            Self::EmptyRange { start_frame, end_frame } => write!(
                f,
                "end frame {end_frame} is not after start frame {start_frame}"
            ),
        }
    }
}

/// A cut that contributed nothing to the track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedCut {
    pub index: usize,
    pub video_id: String,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: SkipReason,
}

fn serialize_reason<S>(reason: &SkipReason, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeStruct;
    let mut state = serializer.serialize_struct("SkipReason", 2)?;
    state.serialize_field("code", reason.code())?;
    state.serialize_field("message", &reason.to_string())?;
    state.end()
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub track: Track,
    pub skipped: Vec<SkippedCut>,
}

impl Assembly {
    /// The timeline shares the track's (edit) name.
    pub fn into_timeline(self) -> Timeline {
        let name = self.track.name.clone();
        Timeline::with_track(&name, self.track)
    }
}

/// A cut whose timecodes parsed; frames wait for the clip's rate.
#[derive(Debug, Clone, Copy)]
struct CutPlan {
    start: Timecode,
    end: Timecode,
}

impl CutPlan {
    fn from_request(cut: &CutRequest) -> Result<Self, SkipReason> {
        let start = Timecode::parse(&cut.video_start_time).map_err(SkipReason::MalformedTimecode)?;
        let end = Timecode::parse(&cut.video_end_time).map_err(SkipReason::MalformedTimecode)?;
        if end.seconds() <= start.seconds() {
            return Err(SkipReason::ReversedRange {
                start: cut.video_start_time.clone(),
                end: cut.video_end_time.clone(),
            });
        }
        Ok(Self { start, end })
    }

    fn source_range(&self, media: &ResolvedMedia) -> Result<TimeRange, SkipReason> {
        let rate = media.frame_rate;
        let start = self.start.to_rational(rate).map_err(SkipReason::MalformedTimecode)?;
        let end = self.end.to_rational(rate).map_err(SkipReason::MalformedTimecode)?;
        if end.frames() <= start.frames() {
            return Err(SkipReason::EmptyRange {
                start_frame: start.frames(),
                end_frame: end.frames(),
            });
        }
        Ok(TimeRange::from_start_end(start, end))
    }
}

/// A clip that survived every stage and only lacks its final name.
struct PlacedMedia {
    media_ref: String,
    source_range: TimeRange,
}

pub struct TrackAssembler<C> {
    resolver: MediaResolver<C>,
    config: AssemblerConfig,
}

impl<C: MediaCatalog> TrackAssembler<C> {
    pub fn new(resolver: MediaResolver<C>, config: AssemblerConfig) -> Self {
        Self { resolver, config }
    }

    #[cfg(test)]
    pub(crate) fn resolver(&self) -> &MediaResolver<C> {
        &self.resolver
    }

    pub fn assemble(&self, spec: &EditSpecification, download_dir: &Path) -> Assembly {
        let plans: Vec<Result<CutPlan, SkipReason>> =
            spec.cuts.iter().map(CutPlan::from_request).collect();
        let resolutions = self.resolve_all(&spec.cuts, &plans, download_dir);

        let outcomes: Vec<Result<PlacedMedia, SkippedCut>> = spec
            .cuts
            .iter()
            .zip(plans)
            .zip(resolutions)
            .enumerate()
            .map(|(index, ((cut, plan), resolution))| {
                place(plan, resolution).map_err(|reason| {
                    log::warn!(
                        "Skipping cut {index} ({}): {reason}",
                        cut.video_id
                    );
                    SkippedCut {
                        index,
                        video_id: cut.video_id.clone(),
                        reason,
                    }
                })
            })
            .collect();

        let skipped: Vec<SkippedCut> = outcomes
            .iter()
            .filter_map(|o| o.as_ref().err().cloned())
            .collect();

        let mut track = Track::new(&spec.edit_name, TrackKind::Video);
        track.clips = outcomes
            .into_iter()
            .filter_map(Result::ok)
            .enumerate()
            .map(|(position, placed)| Clip {
                name: clip_name(&spec.edit_name, self.config.naming, position),
                media_ref: Some(placed.media_ref),
                source_range: Some(placed.source_range),
            })
            .collect();

        log::info!(
            "Assembled track '{}': {} clip(s), {} skipped",
            track.name,
            track.clips.len(),
            skipped.len()
        );
        Assembly { track, skipped }
    }

    /// Resolve every planned cut. The result lines up with `cuts`; cuts that
    /// failed planning get `None` and never reach the catalog.
    fn resolve_all(
        &self,
        cuts: &[CutRequest],
        plans: &[Result<CutPlan, SkipReason>],
        download_dir: &Path,
    ) -> Vec<Option<Result<ResolvedMedia, ResolveError>>> {
        let resolve_one = |i: usize| {
            plans[i]
                .is_ok()
                .then(|| self.resolver.resolve(&cuts[i].video_id, download_dir))
        };

        let workers = self.config.jobs.min(cuts.len());
        if workers <= 1 {
            return (0..cuts.len()).map(resolve_one).collect();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("resolve-{idx}"))
            .build();
        match pool {
            Ok(pool) => pool.install(|| (0..cuts.len()).into_par_iter().map(resolve_one).collect()),
            Err(e) => {
                log::warn!("Could not start {workers} resolver threads, resolving sequentially: {e}");
                (0..cuts.len()).map(resolve_one).collect()
            }
        }
    }
}

fn place(
    plan: Result<CutPlan, SkipReason>,
    resolution: Option<Result<ResolvedMedia, ResolveError>>,
) -> Result<PlacedMedia, SkipReason> {
    let plan = plan?;
    let media = match resolution {
        Some(Ok(media)) => media,
        Some(Err(e)) => return Err(SkipReason::FetchFailed(e.to_string())),
        None => return Err(SkipReason::FetchFailed("cut was never resolved".into())),
    };
    if !media.available {
        return Err(SkipReason::MediaUnavailable);
    }
    let source_range = plan.source_range(&media)?;
    Ok(PlacedMedia {
        media_ref: media.local_path.to_string_lossy().to_string(),
        source_range,
    })
}

fn clip_name(edit_name: &str, naming: ClipNaming, position: usize) -> String {
    match naming {
        ClipNaming::Shared => format!("clip_{edit_name}"),
        ClipNaming::Indexed => format!("clip_{edit_name}_{:03}", position + 1),
    }
}
