use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::errors::PipelineError;

/// Sequence and quality lines are wrapped at this many characters when written.
pub const LINE_WIDTH: usize = 80;

/// A single read: its identifier (the header without the leading `@`), its bases, and one
/// quality byte per base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

impl Record {
    pub fn new(id: impl Into<String>, seq: impl Into<Vec<u8>>, qual: impl Into<Vec<u8>>) -> Self {
        let rec = Record {
            id: id.into(),
            seq: seq.into(),
            qual: qual.into(),
        };
        debug_assert_eq!(rec.seq.len(), rec.qual.len());
        rec
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Reads FASTQ records one at a time. Sequence and quality may be wrapped over several
/// lines, as produced by [`FastqWriter`].
pub struct FastqReader<R: BufRead> {
    reader: R,
    path: PathBuf,
    records: usize,
    line: Vec<u8>,
}

impl FastqReader<BufReader<File>> {
    /// Opens the FASTQ file at `path` for reading.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PipelineError::io("opening", path, e))?;
        Ok(FastqReader::new(BufReader::new(file), path))
    }
}

impl<R: BufRead> FastqReader<R> {
    /// Wraps an existing reader. `path` is only used to describe errors.
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        FastqReader {
            reader,
            path: path.into(),
            records: 0,
            line: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads one line into `self.line` without its line terminator. Returns false at EOF.
    fn read_line(&mut self) -> Result<bool> {
        self.line.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.line)
            .map_err(|e| PipelineError::io("reading", &self.path, e))?;

        if n == 0 {
            return Ok(false);
        }
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
        }
        if self.line.last() == Some(&b'\r') {
            self.line.pop();
        }
        Ok(true)
    }

    fn format_err(&self, reason: impl Into<String>) -> anyhow::Error {
        PipelineError::Format {
            path: self.path.clone(),
            record: self.records + 1,
            reason: reason.into(),
        }
        .into()
    }

    fn read_line_in_record(&mut self, expecting: &str) -> Result<()> {
        if !self.read_line()? {
            return Err(self.format_err(format!(
                "file ended in the middle of a record, expected {expecting}"
            )));
        }
        Ok(())
    }

    /// Reads the next record. `Ok(None)` is only returned at a clean boundary between
    /// records; a stream ending part way through a record is a format error.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        // blank lines between records (e.g. a trailing newline) are not records
        loop {
            if !self.read_line()? {
                return Ok(None);
            }
            if !self.line.is_empty() {
                break;
            }
        }

        // line 1: @ followed by the identifier
        if self.line[0] != b'@' {
            let found = String::from_utf8_lossy(&self.line).into_owned();
            return Err(self.format_err(format!("header should start with `@`, found `{found}`")));
        }
        let id = String::from_utf8_lossy(&self.line[1..]).into_owned();

        // line 2: the sequence, possibly wrapped, up until the separator
        let mut seq = Vec::new();
        let mut seq_lines = 0;
        loop {
            self.read_line_in_record("a `+` separator line")?;
            if self.line.first() == Some(&b'+') {
                break;
            }
            seq.extend_from_slice(&self.line);
            seq_lines += 1;
        }
        if seq_lines == 0 {
            return Err(self.format_err("record has no sequence line"));
        }

        // line 4: quality, wrapped over at most as many lines as the sequence was
        let mut qual = Vec::with_capacity(seq.len());
        let mut qual_lines = 0;
        while qual_lines == 0 || (qual.len() < seq.len() && qual_lines < seq_lines) {
            self.read_line_in_record("a quality line")?;
            qual.extend_from_slice(&self.line);
            qual_lines += 1;
        }

        if qual.len() != seq.len() {
            return Err(self.format_err(format!(
                "quality length {} does not match sequence length {}",
                qual.len(),
                seq.len()
            )));
        }

        self.records += 1;
        Ok(Some(Record { id, seq, qual }))
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Writes FASTQ records, wrapping sequence and quality at [`LINE_WIDTH`] characters.
pub struct FastqWriter<W: Write> {
    writer: W,
    path: PathBuf,
}

impl FastqWriter<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| PipelineError::io("creating", path, e))?;
        Ok(FastqWriter::new(BufWriter::new(file), path))
    }
}

impl<W: Write> FastqWriter<W> {
    /// Wraps an existing writer. `path` is only used to describe errors.
    pub fn new(writer: W, path: impl Into<PathBuf>) -> Self {
        FastqWriter {
            writer,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_wrapped(&mut self, data: &[u8]) -> std::io::Result<()> {
        if data.is_empty() {
            return self.writer.write_all(b"\n");
        }
        for line in data.chunks(LINE_WIDTH) {
            self.writer.write_all(line)?;
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_lines(&mut self, id: &str, seq: &[u8], qual: &[u8]) -> std::io::Result<()> {
        writeln!(self.writer, "@{id}")?;
        self.write_wrapped(seq)?;
        self.writer.write_all(b"+\n")?;
        self.write_wrapped(qual)
    }

    /// Writes a record from its parts, so that callers holding a view of a larger buffer
    /// do not need to copy it into a [`Record`] first.
    pub fn write_parts(&mut self, id: &str, seq: &[u8], qual: &[u8]) -> Result<()> {
        debug_assert_eq!(seq.len(), qual.len());
        self.write_lines(id, seq, qual)
            .map_err(|e| PipelineError::io("writing", &self.path, e))?;
        Ok(())
    }

    pub fn write_record(&mut self, rec: &Record) -> Result<()> {
        self.write_parts(&rec.id, &rec.seq, &rec.qual)
    }

    /// Flushes any buffered output and returns the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer
            .flush()
            .map_err(|e| PipelineError::io("writing", &self.path, e))?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(data: &[u8]) -> Result<Vec<Record>> {
        FastqReader::new(Cursor::new(data.to_vec()), "test.fq").collect()
    }

    fn write_all(records: &[Record]) -> Vec<u8> {
        let mut writer = FastqWriter::new(Vec::new(), "test.fq");
        for rec in records {
            writer.write_record(rec).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn reads_four_line_records() {
        let records = read_all(b"@read1 extra\nACGT\n+read1\nIIII\n@read2\nGG\n+\n#!\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::new("read1 extra", "ACGT", "IIII"));
        assert_eq!(records[1], Record::new("read2", "GG", "#!"));
    }

    #[test]
    fn quality_may_start_with_at() {
        let records = read_all(b"@r\nAC\n+\n@I\n").unwrap();
        assert_eq!(records[0].qual, b"@I");
    }

    #[test]
    fn missing_final_newline_and_trailing_blank_lines() {
        assert_eq!(read_all(b"@r\nAC\n+\nII").unwrap().len(), 1);
        assert_eq!(read_all(b"@r\nAC\n+\nII\n\n\n").unwrap().len(), 1);
        assert!(read_all(b"").unwrap().is_empty());
    }

    #[test]
    fn crlf_line_endings() {
        let records = read_all(b"@r\r\nAC\r\n+\r\nII\r\n").unwrap();
        assert_eq!(records[0], Record::new("r", "AC", "II"));
    }

    #[test]
    fn missing_header_marker() {
        let err = read_all(b"r\nAC\n+\nII\n").unwrap_err();
        let err = err.downcast_ref::<PipelineError>().unwrap();
        assert!(matches!(err, PipelineError::Format { record: 1, .. }));
    }

    #[test]
    fn quality_length_mismatch() {
        let err = read_all(b"@r\nACGT\n+\nIII\n@s\nAC\n+\nII\n").unwrap_err();
        assert!(err.to_string().contains("does not match sequence length 4"));

        let err = read_all(b"@r\nAC\n+\nIII\n").unwrap_err();
        assert!(err.to_string().contains("quality length 3"));
    }

    #[test]
    fn truncated_record() {
        for data in [&b"@r\n"[..], b"@r\nAC\n", b"@r\nAC\n+\n"] {
            let err = read_all(data).unwrap_err();
            assert!(err.to_string().contains("malformed"), "{data:?}");
        }
        // the first record is fine, the second is cut short
        let err = read_all(b"@r\nAC\n+\nII\n@s\nAC\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Format { record: 2, .. })
        ));
    }

    #[test]
    fn long_records_are_wrapped() {
        let seq = "ACGT".repeat(50);
        let qual = "I".repeat(200);
        let out = write_all(&[Record::new("long", seq.as_str(), qual.as_str())]);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 1 + 3 + 1 + 3);
        assert_eq!(lines[1].len(), LINE_WIDTH);
        assert_eq!(lines[3].len(), 200 - 2 * LINE_WIDTH);
        assert_eq!(lines[4], "+");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn round_trip_regardless_of_wrapping() {
        let records = vec![
            Record::new("short", "ACGTN", "!!I#5"),
            Record::new("exact", "A".repeat(LINE_WIDTH), "@".repeat(LINE_WIDTH)),
            Record::new("over", "C".repeat(LINE_WIDTH + 1), "+".repeat(LINE_WIDTH + 1)),
            Record::new("many words in id", "G".repeat(3 * LINE_WIDTH + 7), "@".repeat(3 * LINE_WIDTH + 7)),
            Record::new("empty", "", ""),
        ];
        let out = write_all(&records);
        assert_eq!(read_all(&out).unwrap(), records);
    }

    #[test]
    fn write_parts_of_a_view() {
        let rec = Record::new("r", "NNACGT", "!!IIII");
        let mut writer = FastqWriter::new(Vec::new(), "test.fq");
        writer.write_parts(&rec.id, &rec.seq[2..], &rec.qual[2..]).unwrap();
        assert_eq!(writer.finish().unwrap(), b"@r\nACGT\n+\nIIII\n");
    }

    #[test]
    fn missing_file() {
        let err = FastqReader::from_path("/definitely/not/here.fq").err().unwrap();
        assert!(err.to_string().contains("/definitely/not/here.fq"));
    }
}
