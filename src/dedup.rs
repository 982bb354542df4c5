use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indexmap::IndexMap;

use crate::demux::SampleFile;
use crate::dna::Fingerprint;
use crate::errors::PipelineError;
use crate::fastq::{FastqReader, FastqWriter, Record};
use crate::layout::BarcodeLayout;
use crate::record::TrimmedRead;
use crate::report::Progress;
use crate::resolve::ConflictResolver;
use crate::stats::LengthHistogram;

/// Reads shorter than this, once trimmed and without their barcode region, are discarded.
pub const MIN_READ_LEN: usize = 15;

/// Reads closer than this to a cluster's first read are considered duplicates of it.
pub const MAX_CLUSTER_DISTANCE: f64 = 0.04;

/// A staging file waiting to be deduplicated, and optionally how many reads it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSample {
    pub path: PathBuf,
    pub expected: Option<usize>,
}

impl From<SampleFile> for StagedSample {
    fn from(f: SampleFile) -> Self {
        StagedSample {
            path: f.path,
            expected: Some(f.count),
        }
    }
}

/// Where the deduplicated reads of `sample` are written.
pub fn clean_path(outdir: &Path, sample: &str) -> PathBuf {
    outdir.join(format!("{sample}.fq"))
}

/// Fraction of mismatching bases between two sequences, over the length of the shorter
/// one. `None` if either is empty, as there is nothing to compare.
pub fn distance(a: &[u8], b: &[u8]) -> Option<f64> {
    let len = a.len().min(b.len());
    if len == 0 {
        return None;
    }
    let mismatches = a
        .iter()
        .zip(b)
        .filter(|(x, y)| !x.eq_ignore_ascii_case(y))
        .count();
    Some(mismatches as f64 / len as f64)
}

/// The reads of one sample, grouped into candidate duplicates.
pub enum DuplicateIndex {
    /// Reads with a UMI: one bucket per UMI, each holding at most one read per fingerprint.
    Exact(BTreeMap<u64, BTreeMap<Fingerprint, TrimmedRead>>),
    /// Reads without a UMI: clusters of reads similar to the cluster's first read.
    Fuzzy(Vec<Vec<TrimmedRead>>),
}

impl DuplicateIndex {
    pub fn for_layout(layout: &BarcodeLayout) -> Self {
        if layout.has_umi() {
            DuplicateIndex::Exact(BTreeMap::new())
        } else {
            DuplicateIndex::Fuzzy(Vec::new())
        }
    }

    /// Adds a read. Returns false if the read was recognised as an exact duplicate and
    /// dropped straight away.
    pub fn insert(&mut self, umi_key: u64, read: TrimmedRead) -> bool {
        match self {
            DuplicateIndex::Exact(buckets) => {
                let fingerprint = Fingerprint::of(read.seq());
                match buckets.entry(umi_key).or_default().entry(fingerprint) {
                    Entry::Occupied(_) => false,
                    Entry::Vacant(e) => {
                        e.insert(read);
                        true
                    }
                }
            }
            DuplicateIndex::Fuzzy(clusters) => {
                let mut nearest: Option<(usize, f64)> = None;
                for (idx, cluster) in clusters.iter().enumerate() {
                    let Some(d) = distance(cluster[0].seq(), read.seq()) else {
                        continue;
                    };
                    if nearest.map_or(true, |(_, best)| d < best) {
                        nearest = Some((idx, d));
                    }
                }

                match nearest {
                    Some((idx, d)) if d < MAX_CLUSTER_DISTANCE => clusters[idx].push(read),
                    _ => clusters.push(vec![read]),
                }
                true
            }
        }
    }

    /// Number of reads currently held.
    pub fn len(&self) -> usize {
        match self {
            DuplicateIndex::Exact(buckets) => buckets.values().map(|b| b.len()).sum(),
            DuplicateIndex::Fuzzy(clusters) => clusters.iter().map(|c| c.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tears the index down, yielding one representative per group in a deterministic
    /// order. Reads that lose conflict resolution are dropped as their group is resolved.
    pub fn into_representatives(
        self,
        resolver: ConflictResolver,
    ) -> Box<dyn Iterator<Item = TrimmedRead>> {
        match self {
            DuplicateIndex::Exact(buckets) => Box::new(
                buckets
                    .into_values()
                    .flat_map(|bucket| bucket.into_values()),
            ),
            DuplicateIndex::Fuzzy(clusters) => Box::new(
                clusters
                    .into_iter()
                    .filter_map(move |cluster| resolver.resolve(cluster)),
            ),
        }
    }
}

/// Totals of one deduplicated sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSummary {
    pub count: usize,
    pub lengths: LengthHistogram,
}

/// Result of deduplicating a set of samples.
#[derive(Debug, Clone)]
pub struct Deduplicated {
    pub files: IndexMap<String, SampleFile>,
    pub lengths: LengthHistogram,
}

impl Deduplicated {
    pub fn counts(&self) -> IndexMap<String, usize> {
        self.files
            .iter()
            .map(|(s, f)| (s.clone(), f.count))
            .collect()
    }
}

/// Removes poly-A tails, barcode regions and duplicate reads from demultiplexed samples.
pub struct Deduplicator<'a> {
    layout: &'a BarcodeLayout,
    resolver: ConflictResolver,
    verbose: bool,
}

impl<'a> Deduplicator<'a> {
    pub fn new(layout: &'a BarcodeLayout, verbose: bool) -> Self {
        Deduplicator {
            layout,
            resolver: ConflictResolver::new(layout.len()),
            verbose,
        }
    }

    /// Trims a record and removes its barcode region. Returns the UMI bucket key along
    /// with the trimmed read, or `None` if too little of the read is left.
    pub fn prepare(&self, rec: Record) -> Option<(u64, TrimmedRead)> {
        let mut read = TrimmedRead::new(rec);
        read.trim_poly_a();

        let prefix = self.layout.len();
        if read.trimmed_len() < prefix + MIN_READ_LEN {
            return None;
        }

        let umi_key = if self.layout.has_umi() {
            self.layout.umi_key(read.full_seq())
        } else {
            0
        };
        read.strip_prefix(prefix);

        Some((umi_key, read))
    }

    /// Indexes every usable read of `reader`.
    pub fn index<R: std::io::BufRead>(
        &self,
        reader: FastqReader<R>,
        expected: Option<usize>,
    ) -> Result<DuplicateIndex> {
        let mut index = DuplicateIndex::for_layout(self.layout);
        let mut progress = Progress::new(self.verbose, expected);
        let mut exact_duplicates = 0usize;

        for rec in reader {
            let rec = rec?;
            progress.tick();

            if let Some((umi_key, read)) = self.prepare(rec) {
                if !index.insert(umi_key, read) {
                    exact_duplicates += 1;
                }
            }
        }

        if self.verbose && exact_duplicates > 0 {
            info!("Dropped {exact_duplicates} exact duplicates");
        }
        Ok(index)
    }

    /// Writes the representative of each duplicate group of `index` to `writer`.
    pub fn write_representatives<W: Write>(
        &self,
        index: DuplicateIndex,
        writer: &mut FastqWriter<W>,
    ) -> Result<SampleSummary> {
        let mut summary = SampleSummary {
            count: 0,
            lengths: LengthHistogram::default(),
        };

        for read in index.into_representatives(self.resolver) {
            read.write_to(writer)?;
            summary.count += 1;
            summary.lengths.add(read.len());
        }
        Ok(summary)
    }

    /// Deduplicates one staging file into `output`. The whole index for the sample is
    /// dropped before this returns.
    pub fn deduplicate_file(
        &self,
        input: &Path,
        expected: Option<usize>,
        output: &Path,
    ) -> Result<SampleSummary> {
        let index = self.index(FastqReader::from_path(input)?, expected)?;
        if self.verbose {
            info!("{} candidate reads after trimming", index.len());
        }

        let mut writer = FastqWriter::create(output)?;
        let summary = self.write_representatives(index, &mut writer)?;
        writer.finish()?;

        Ok(summary)
    }

    /// Deduplicates each sample in turn, writing `<sample>.fq` files to `outdir`.
    ///
    /// Samples are independent: if one fails, the error is returned straight away and the
    /// files already written for earlier samples are left in place and remain valid.
    /// When `remove_input` is set, each staging file is deleted once its sample is done.
    pub fn deduplicate(
        &self,
        samples: &IndexMap<String, StagedSample>,
        outdir: &Path,
        remove_input: bool,
    ) -> Result<Deduplicated> {
        std::fs::create_dir_all(outdir)
            .map_err(|e| PipelineError::io("creating directory", outdir, e))?;

        let mut result = Deduplicated {
            files: IndexMap::with_capacity(samples.len()),
            lengths: LengthHistogram::default(),
        };

        for (sample, staged) in samples.iter() {
            if self.verbose {
                info!("Removing duplicates from {sample}...");
            }

            let path = clean_path(outdir, sample);
            let summary = self.deduplicate_file(&staged.path, staged.expected, &path)?;

            if self.verbose {
                match staged.expected {
                    Some(n) => info!("Kept {} of {n} reads of {sample}", summary.count),
                    None => info!("Kept {} reads of {sample}", summary.count),
                }
            }

            if remove_input {
                std::fs::remove_file(&staged.path)
                    .map_err(|e| PipelineError::io("removing", &staged.path, e))?;
            }

            result.lengths.merge(&summary.lengths);
            result.files.insert(
                sample.clone(),
                SampleFile {
                    path,
                    count: summary.count,
                },
            );
        }

        Ok(result)
    }
}
