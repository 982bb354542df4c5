use std::path::Path;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use itertools::Itertools;

use crate::errors::PipelineError;

/// Number of distinct lengths tracked by a [`LengthHistogram`]; longer reads are not counted.
pub const HISTOGRAM_BUCKETS: usize = 512;

/// Number of output reads of each length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthHistogram {
    counts: Vec<usize>,
}

impl Default for LengthHistogram {
    fn default() -> Self {
        LengthHistogram {
            counts: vec![0; HISTOGRAM_BUCKETS],
        }
    }
}

impl LengthHistogram {
    pub fn add(&mut self, len: usize) {
        if let Some(c) = self.counts.get_mut(len) {
            *c += 1;
        }
    }

    pub fn merge(&mut self, other: &LengthHistogram) {
        self.counts
            .iter_mut()
            .zip(other.counts.iter())
            .for_each(|(a, b)| *a += b);
    }

    pub fn get(&self, len: usize) -> usize {
        self.counts.get(len).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Receives the per-sample read counts at the end of each stage of the pipeline.
pub trait StatisticsSink {
    fn add_values(&mut self, stage: &str, values: &IndexMap<String, usize>) -> Result<()>;
}

/// A table of read counts, one row per sample and one column per stage.
#[derive(Debug, Clone)]
pub struct PipelineStatistics {
    stages: Vec<String>,
    values: IndexMap<String, Vec<usize>>,
}

impl PipelineStatistics {
    pub fn new<'a>(samples: impl IntoIterator<Item = &'a str>) -> Self {
        PipelineStatistics {
            stages: Vec::new(),
            values: samples.into_iter().map(|s| (s.to_string(), Vec::new())).collect(),
        }
    }

    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    pub fn get(&self, sample: &str, stage: &str) -> Option<usize> {
        let col = self.stages.iter().position(|s| s == stage)?;
        self.values.get(sample).map(|v| v[col])
    }

    /// Renders the table as aligned plain text.
    pub fn pretty_string(&self) -> String {
        let mut widths = vec![self
            .values
            .keys()
            .map(|s| s.len())
            .chain(std::iter::once("sample".len()))
            .max()
            .unwrap_or(0)];

        for (i, stage) in self.stages.iter().enumerate() {
            let w = self
                .values
                .values()
                .map(|v| v[i].to_string().len())
                .chain(std::iter::once(stage.len()))
                .max()
                .unwrap_or(0);
            widths.push(w);
        }

        let header = std::iter::once(format!("{:<w$}", "sample", w = widths[0]))
            .chain(
                self.stages
                    .iter()
                    .zip(&widths[1..])
                    .map(|(s, w)| format!("{s:>w$}", w = *w)),
            )
            .join(" ");

        let rows = self.values.iter().map(|(sample, values)| {
            std::iter::once(format!("{sample:<w$}", w = widths[0]))
                .chain(values.iter().zip(&widths[1..]).map(|(v, w)| format!("{v:>w$}", w = *w)))
                .join(" ")
        });

        std::iter::once(header).chain(rows).join("\n")
    }

    /// Writes the table to `pipeline.csv` (space separated) in `directory`, which is created
    /// if it does not exist.
    pub fn write(&self, directory: &Path) -> Result<()> {
        if directory.is_file() {
            bail!(PipelineError::io(
                "writing statistics to",
                directory,
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "a file exists where the statistics directory should be"
                ),
            ));
        }
        std::fs::create_dir_all(directory)
            .map_err(|e| PipelineError::io("creating directory", directory, e))?;

        let path = directory.join("pipeline.csv");
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b' ')
            .from_path(&path)
            .with_context(|| format!("Unable to create {}", path.display()))?;

        wtr.write_record(std::iter::once("sample").chain(self.stages.iter().map(|s| s.as_str())))?;
        for (sample, values) in self.values.iter() {
            wtr.write_record(
                std::iter::once(sample.clone()).chain(values.iter().map(|v| v.to_string())),
            )?;
        }
        wtr.flush()
            .map_err(|e| PipelineError::io("writing", &path, e))?;

        Ok(())
    }
}

impl StatisticsSink for PipelineStatistics {
    fn add_values(&mut self, stage: &str, values: &IndexMap<String, usize>) -> Result<()> {
        let expected = self.values.keys().sorted().collect_vec();
        let given = values.keys().sorted().collect_vec();

        if expected != given {
            bail!(PipelineError::Statistics {
                stage: stage.to_string(),
                reason: format!("samples {given:?} do not match the configured samples {expected:?}"),
            });
        }

        for (sample, column) in self.values.iter_mut() {
            column.push(values[sample]);
        }
        self.stages.push(stage.to_string());
        Ok(())
    }
}
