use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;

use crate::dedup::{Deduplicated, Deduplicator, StagedSample};
use crate::demux::{Demultiplexer, SampleFile, STAGING_SUFFIX};
use crate::report;
use crate::settings::Settings;
use crate::stats::StatisticsSink;

pub const DEMUX_STAGE: &str = "demultiplexed";
pub const DEDUP_STAGE: &str = "deduplicated";

/// Sample name of a staging file written by the demultiplexer, e.g. `S1` for
/// `out/S1_nonunique.fq`.
pub fn sample_name(staging: &Path) -> Result<String> {
    let stem = staging
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Unable to get a sample name from {}", staging.display()))?;
    Ok(stem.strip_suffix(STAGING_SUFFIX).unwrap_or(stem).to_string())
}

/// Names each staging file by its sample. No expected read count is known.
pub fn staged_from_paths(paths: &[PathBuf]) -> Result<IndexMap<String, StagedSample>> {
    let mut staged = IndexMap::with_capacity(paths.len());
    for path in paths {
        let name = sample_name(path)?;
        let sample = StagedSample {
            path: path.clone(),
            expected: None,
        };
        if staged.insert(name.clone(), sample).is_some() {
            bail!("more than one staging file given for sample `{name}`");
        }
    }
    Ok(staged)
}

pub fn counts(files: &IndexMap<String, SampleFile>) -> IndexMap<String, usize> {
    files.iter().map(|(s, f)| (s.clone(), f.count)).collect()
}

/// Demultiplexes a FASTQ file, then deduplicates each of its samples.
pub struct Pipeline<'a> {
    settings: &'a Settings,
    outdir: PathBuf,
    verbose: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(settings: &'a Settings, outdir: impl Into<PathBuf>, verbose: bool) -> Self {
        Pipeline {
            settings,
            outdir: outdir.into(),
            verbose,
        }
    }

    /// Runs both stages, reporting the per-sample counts of each to `stats`. `remove_input`
    /// only applies to `input`; the staging files between the stages are always removed.
    pub fn run(
        &self,
        input: &Path,
        remove_input: bool,
        stats: &mut impl StatisticsSink,
    ) -> Result<Deduplicated> {
        let demux = Demultiplexer::new(&self.settings.samples, &self.settings.layout, self.verbose);
        let staged = demux.demultiplex(input, &self.outdir, remove_input)?;

        let demux_counts = counts(&staged);
        if self.verbose {
            info!("Demultiplexed reads:\n{}", report::format_counts(&demux_counts));
        }
        stats.add_values(DEMUX_STAGE, &demux_counts)?;

        let staged: IndexMap<String, StagedSample> = staged
            .into_iter()
            .map(|(sample, file)| (sample, StagedSample::from(file)))
            .collect();

        let dedup = Deduplicator::new(&self.settings.layout, self.verbose);
        let result = dedup.deduplicate(&staged, &self.outdir, true)?;

        let dedup_counts = result.counts();
        if self.verbose {
            let removed: usize = demux_counts.values().sum::<usize>() - dedup_counts.values().sum::<usize>();
            info!(
                "Removed {removed} reads, {} remaining:\n{}",
                dedup_counts.values().sum::<usize>(),
                report::format_counts(&dedup_counts)
            );
            info!(
                "Read length distribution:\n{}",
                report::format_histogram(&result.lengths)
            );
        }
        stats.add_values(DEDUP_STAGE, &dedup_counts)?;

        Ok(result)
    }
}
