use crate::record::TrimmedRead;

/// Extra length on top of the barcode region that a read of the expected size has after
/// trimming.
pub const CANONICAL_INSERT_LEN: usize = 28;

/// Score of a read with no bases left. It loses to any read that has bases.
pub const EMPTY_SCORE: f64 = -1.0;

/// Picks the representative of a group of duplicate reads: the read with the best mean
/// quality, where reads of the canonical length count double.
#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver {
    canonical_len: usize,
}

impl ConflictResolver {
    /// `prefix_len` is the length of the barcode region in front of every read.
    pub fn new(prefix_len: usize) -> Self {
        ConflictResolver {
            canonical_len: prefix_len + CANONICAL_INSERT_LEN,
        }
    }

    pub fn canonical_len(&self) -> usize {
        self.canonical_len
    }

    pub fn score(&self, read: &TrimmedRead) -> f64 {
        let qual = read.qual();
        if qual.is_empty() {
            return EMPTY_SCORE;
        }

        let mean = qual.iter().map(|&q| q as f64).sum::<f64>() / qual.len() as f64;
        if read.trimmed_len() == self.canonical_len {
            mean * 2.0
        } else {
            mean
        }
    }

    /// Index of the winning read. Ties, including a group where every read is empty, go to
    /// the read seen first.
    pub fn winner(&self, group: &[TrimmedRead]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, read) in group.iter().enumerate() {
            let score = self.score(read);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((idx, score)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Consumes the group, returning the winner. Every other read is dropped here.
    pub fn resolve(&self, mut group: Vec<TrimmedRead>) -> Option<TrimmedRead> {
        let idx = self.winner(&group)?;
        Some(group.swap_remove(idx))
    }
}
