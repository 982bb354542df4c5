use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indexmap::IndexMap;

use crate::errors::PipelineError;
use crate::fastq::{FastqReader, FastqWriter};
use crate::layout::BarcodeLayout;
use crate::report::Progress;
use crate::settings::SampleTable;

/// Suffix of the per-sample files written by the demultiplexer, before deduplication.
pub const STAGING_SUFFIX: &str = "_nonunique";

/// A file produced for one sample, and the number of records in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFile {
    pub path: PathBuf,
    pub count: usize,
}

/// Where the demultiplexer writes the reads of `sample`.
pub fn staging_path(outdir: &Path, sample: &str) -> PathBuf {
    outdir.join(format!("{sample}{STAGING_SUFFIX}.fq"))
}

/// Splits reads into one file per sample by their barcode.
pub struct Demultiplexer<'a> {
    samples: &'a SampleTable,
    layout: &'a BarcodeLayout,
    verbose: bool,
}

impl<'a> Demultiplexer<'a> {
    pub fn new(samples: &'a SampleTable, layout: &'a BarcodeLayout, verbose: bool) -> Self {
        Demultiplexer {
            samples,
            layout,
            verbose,
        }
    }

    /// Copies every record of `input` whose barcode exactly matches a sample into that
    /// sample's staging file in `outdir`. Records matching no sample are dropped.
    ///
    /// Every sample gets a staging file, even if no read matches it. If `remove_input` is
    /// set, `input` is deleted once all staging files have been written.
    ///
    /// # Errors
    ///
    /// Fails, without returning any counts, if the input cannot be read or contains a
    /// malformed record, if a staging file cannot be written, or if the input cannot be
    /// removed.
    pub fn demultiplex(
        &self,
        input: &Path,
        outdir: &Path,
        remove_input: bool,
    ) -> Result<IndexMap<String, SampleFile>> {
        std::fs::create_dir_all(outdir)
            .map_err(|e| PipelineError::io("creating directory", outdir, e))?;

        // a missing input must not truncate staging files left by an earlier run
        let reader = FastqReader::from_path(input)?;

        // open every output up front so that each sample has a file
        let mut writers: IndexMap<&str, (FastqWriter<BufWriter<File>>, usize)> = IndexMap::new();
        for sample in self.samples.names() {
            let writer = FastqWriter::create(staging_path(outdir, sample))?;
            writers.insert(sample, (writer, 0));
        }

        if self.verbose {
            info!("Splitting sequences by barcode...");
        }

        let mut progress = Progress::new(self.verbose, None);
        let mut unmatched = 0usize;

        for rec in reader {
            let rec = rec?;
            progress.tick();

            let barcode = self.layout.extract_barcode(&rec.seq);
            match self.samples.find(&barcode).and_then(|s| writers.get_mut(s)) {
                Some((writer, count)) => {
                    writer.write_record(&rec)?;
                    *count += 1;
                }
                None => unmatched += 1,
            }
        }

        let mut files = IndexMap::with_capacity(writers.len());
        for (sample, (writer, count)) in writers {
            let path = writer.path().to_path_buf();
            writer.finish()?;
            files.insert(sample.to_string(), SampleFile { path, count });
        }

        if self.verbose {
            let matched: usize = files.values().map(|f| f.count).sum();
            info!(
                "Found {} sequences, {matched} with a known barcode, {unmatched} without",
                progress.count()
            );
        }

        if remove_input {
            std::fs::remove_file(input).map_err(|e| PipelineError::io("removing", input, e))?;
        }

        Ok(files)
    }
}
