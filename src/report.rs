use indexmap::IndexMap;
use itertools::Itertools;

use crate::stats::LengthHistogram;

/// How often a progress line is logged, in records.
pub const PROGRESS_INTERVAL: usize = 50000;

/// Width of the longest bar drawn by [`format_histogram`].
const HISTOGRAM_WIDTH: f64 = 60.0;

/// Logs how many records have been processed every [`PROGRESS_INTERVAL`] records, if
/// verbose.
pub struct Progress {
    verbose: bool,
    expected: Option<usize>,
    count: usize,
}

impl Progress {
    pub fn new(verbose: bool, expected: Option<usize>) -> Self {
        Progress {
            verbose,
            expected,
            count: 0,
        }
    }

    pub fn tick(&mut self) {
        self.count += 1;
        if !self.verbose || self.count % PROGRESS_INTERVAL != 0 {
            return;
        }
        match self.expected {
            Some(n) => info!("Processed: {}/{n}", self.count),
            None => info!("Processed: {}", self.count),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// One `\tsample: count` line per sample.
pub fn format_counts<V: std::fmt::Display>(counts: &IndexMap<String, V>) -> String {
    counts
        .iter()
        .map(|(sample, n)| format!("\t{sample}: {n}"))
        .join("\n")
}

/// Draws the populated range of the histogram as rows of stars, scaled so that the most
/// common length gets a bar of [`HISTOGRAM_WIDTH`].
pub fn format_histogram(hist: &LengthHistogram) -> String {
    let counts = hist.counts();
    let (Some(low), Some(high)) = (
        counts.iter().position(|&c| c != 0),
        counts.iter().rposition(|&c| c != 0),
    ) else {
        return "\t(no reads)".to_string();
    };

    let max = counts[low..=high].iter().copied().max().unwrap_or(1);
    let scale = HISTOGRAM_WIDTH / max as f64;

    (low..=high)
        .map(|len| {
            let bar = "*".repeat((counts[len] as f64 * scale).floor() as usize);
            format!("\t{len:3}: ({:03}) |{bar}", counts[len])
        })
        .chain(std::iter::once(format!("scale = {scale}")))
        .join("\n")
}
