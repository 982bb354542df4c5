pub const A: u8 = 0b00;
pub const T: u8 = 0b01;
pub const C: u8 = 0b10;
pub const G: u8 = 0b11;

/// The most bases that fit into one `u64` at two bits per base.
pub const BASES_PER_WORD: usize = 32;

const ASCII_LOOKUP: [u8; 4] = [b'A', b'T', b'C', b'G'];

/// Two-bit code of a base, ignoring case. Anything that is not A, T, C or G (such as `N`)
/// has no code of its own and shares the code of `A`.
#[inline(always)]
pub fn base_to_u8(b: u8) -> u8 {
    match b {
        b'T' | b't' => T,
        b'C' | b'c' => C,
        b'G' | b'g' => G,
        _ => A,
    }
}

#[inline(always)]
pub fn u8_to_base(b: u8) -> u8 {
    assert!(b <= 0b11, "Byte must be 2-bits to represent a valid alphabet");
    ASCII_LOOKUP[b as usize]
}

/// Reads `seq` as a base-4 number, most significant base first. Only the last
/// [`BASES_PER_WORD`] bases can contribute to the result.
pub fn encode_base4(seq: &[u8]) -> u64 {
    seq.iter()
        .fold(0u64, |acc, &b| (acc << 2) | base_to_u8(b) as u64)
}

/// Inverse of [`encode_base4`] for a sequence of `len` bases, giving upper case bases.
pub fn decode_base4(mut value: u64, len: usize) -> Vec<u8> {
    let mut seq = vec![b'A'; len];
    for b in seq.iter_mut().rev() {
        *b = u8_to_base((value & 0b11) as u8);
        value >>= 2;
    }
    seq
}

/// Packs up to [`BASES_PER_WORD`] bases with the first base in the two highest bits, so
/// that a shorter word is padded on the right and a leading `A` still shifts the rest.
fn pack_word(seq: &[u8]) -> u64 {
    let word = &seq[..seq.len().min(BASES_PER_WORD)];
    if word.is_empty() {
        return 0;
    }
    encode_base4(word) << (2 * (BASES_PER_WORD - word.len()))
}

/// A compact stand-in for a sequence, which can be compared and ordered in constant time:
/// the first 64 bases packed into two words, along with the full length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint {
    pub high: u64,
    pub low: u64,
    pub len: usize,
}

impl Fingerprint {
    pub fn of(seq: &[u8]) -> Self {
        let split = seq.len().min(BASES_PER_WORD);
        let (head, tail) = seq.split_at(split);

        Fingerprint {
            high: pack_word(head),
            low: pack_word(tail),
            len: seq.len(),
        }
    }
}
