use std::io::Write;

use anyhow::Result;

use crate::fastq::{FastqWriter, Record};

/// A record together with the window of it that is still of interest. Trimming and
/// prefix removal only move the window, the underlying buffers are never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedRead {
    record: Record,
    start: usize,
    end: usize,
}

impl TrimmedRead {
    pub fn new(record: Record) -> Self {
        let end = record.len();
        TrimmedRead {
            record,
            start: 0,
            end,
        }
    }

    /// Removes a run of `A`s from the 3' end, along with their qualities.
    pub fn trim_poly_a(&mut self) {
        while self.end > self.start && self.record.seq[self.end - 1].eq_ignore_ascii_case(&b'A') {
            self.end -= 1;
        }
    }

    /// Hides the first `n` bases of the record (or all of it, if shorter).
    pub fn strip_prefix(&mut self, n: usize) {
        self.start = n.min(self.end);
    }

    /// Length of the record after trimming, still counting any stripped prefix.
    pub fn trimmed_len(&self) -> usize {
        self.end
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// The whole (untrimmed) sequence.
    pub fn full_seq(&self) -> &[u8] {
        &self.record.seq
    }

    pub fn seq(&self) -> &[u8] {
        &self.record.seq[self.start..self.end]
    }

    pub fn qual(&self) -> &[u8] {
        &self.record.qual[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_to<W: Write>(&self, writer: &mut FastqWriter<W>) -> Result<()> {
        writer.write_parts(self.id(), self.seq(), self.qual())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(seq: &str, qual: &str) -> TrimmedRead {
        TrimmedRead::new(Record::new("r", seq, qual))
    }

    #[test]
    fn poly_a_trim() {
        let mut r = read("ACGTAaAA", "12345678");
        r.trim_poly_a();
        assert_eq!(r.seq(), b"ACGT");
        assert_eq!(r.qual(), b"1234");
        assert_eq!(r.trimmed_len(), 4);

        let mut r = read("AAAA", "1234");
        r.trim_poly_a();
        assert!(r.is_empty());

        let mut r = read("ACGT", "1234");
        r.trim_poly_a();
        assert_eq!(r.seq(), b"ACGT");
    }

    #[test]
    fn prefix_is_a_view() {
        let mut r = read("NNACGTAA", "!!IIII##");
        r.trim_poly_a();
        r.strip_prefix(2);
        assert_eq!(r.seq(), b"ACGT");
        assert_eq!(r.qual(), b"IIII");
        assert_eq!(r.len(), 4);
        assert_eq!(r.trimmed_len(), 6);
        assert_eq!(r.full_seq(), b"NNACGTAA");

        let mut out = FastqWriter::new(Vec::new(), "out.fq");
        r.write_to(&mut out).unwrap();
        assert_eq!(out.finish().unwrap(), b"@r\nACGT\n+\nIIII\n");
    }

    #[test]
    fn prefix_longer_than_read() {
        let mut r = read("ACG", "III");
        r.strip_prefix(5);
        assert!(r.is_empty());
        assert_eq!(r.qual(), b"");
    }
}
