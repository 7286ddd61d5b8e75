pub mod assemble;
pub mod config;
pub mod error;
pub mod media;
pub mod spec;
pub mod timeline;

use std::path::{Path, PathBuf};

use serde::Serialize;

use assemble::{SkippedCut, TrackAssembler};
use config::Config;
use error::AppError;
use media::{MediaCatalog, MediaResolver};
use spec::EditSpecification;
use timeline::writer::TimelineWriter;

/// Outcome of a successful run; skipped cuts are listed in input order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub output: PathBuf,
    pub timeline: String,
    pub clips: usize,
    pub duration_seconds: f64,
    pub skipped: Vec<SkippedCut>,
}

/// Resolve every cut of `spec` through `catalog` and write the timeline to
/// `output`. Only an unwritable or invalid timeline fails the run.
pub fn build_timeline<C: MediaCatalog>(
    spec: &EditSpecification,
    catalog: C,
    config: &Config,
    output: &Path,
) -> Result<RunReport, AppError> {
    let resolver = MediaResolver::new(catalog, config.resolver_config());
    let assembler = TrackAssembler::new(resolver, config.assembler_config());

    let assembly = assembler.assemble(spec, &config.download_dir);
    let skipped = assembly.skipped.clone();
    let timeline = assembly.into_timeline();

    if timeline.clip_count() == 0 && !spec.cuts.is_empty() {
        log::warn!(
            "None of the {} cut(s) could be placed; writing an empty timeline",
            spec.cuts.len()
        );
    }

    TimelineWriter::new(config.writer_config()).write(&timeline, output)?;

    Ok(RunReport {
        output: output.to_path_buf(),
        timeline: timeline.name.clone(),
        clips: timeline.clip_count(),
        duration_seconds: timeline.duration_seconds(),
        skipped,
    })
}
