use std::fmt;

use crate::dna;

/// Marks a sample barcode position in a layout descriptor.
pub const BARCODE_MARKER: char = 'B';
/// Marks a UMI position in a layout descriptor. This one symbol is used both when
/// extracting UMIs and when counting the UMI length.
pub const UMI_MARKER: char = 'N';

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Position {
    Barcode,
    Umi,
    Ignored,
}

impl From<char> for Position {
    fn from(c: char) -> Self {
        match c.to_ascii_uppercase() {
            BARCODE_MARKER => Position::Barcode,
            UMI_MARKER => Position::Umi,
            _ => Position::Ignored,
        }
    }
}

/// Describes the fixed-length region at the start of every read which holds the sample
/// barcode and the UMI, e.g. `BBBNNNNBB` is a five base barcode split around a four base
/// UMI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarcodeLayout {
    positions: Vec<Position>,
    barcode_len: usize,
    umi_len: usize,
}

impl BarcodeLayout {
    pub fn new(descriptor: &str) -> Self {
        let positions: Vec<Position> = descriptor.chars().map(Position::from).collect();
        let count = |kind| positions.iter().filter(|&&p| p == kind).count();

        BarcodeLayout {
            barcode_len: count(Position::Barcode),
            umi_len: count(Position::Umi),
            positions,
        }
    }

    /// Length of the leading region, which is removed from reads once deduplicated.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn barcode_length(&self) -> usize {
        self.barcode_len
    }

    pub fn umi_length(&self) -> usize {
        self.umi_len
    }

    pub fn has_umi(&self) -> bool {
        self.umi_len > 0
    }

    fn project(&self, seq: &[u8], kind: Position) -> String {
        self.positions
            .iter()
            .zip(seq)
            .filter(|(&p, _)| p == kind)
            .map(|(_, &b)| b as char)
            .collect()
    }

    /// The bases at barcode positions, in order. A read shorter than the layout gives a
    /// short barcode.
    pub fn extract_barcode(&self, seq: &[u8]) -> String {
        self.project(seq, Position::Barcode)
    }

    /// The bases at UMI positions, in order. Empty when the layout has no UMI.
    pub fn extract_umi(&self, seq: &[u8]) -> String {
        self.project(seq, Position::Umi)
    }

    /// Integer bucket key of the UMI of `seq`.
    pub fn umi_key(&self, seq: &[u8]) -> u64 {
        dna::encode_base4(self.extract_umi(seq).as_bytes())
    }
}

impl fmt::Display for BarcodeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in self.positions.iter() {
            let c = match p {
                Position::Barcode => BARCODE_MARKER,
                Position::Umi => UMI_MARKER,
                Position::Ignored => '-',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
