//! Zero-width watermark codec
//!
//! The first 8 hex digits of SHA-256(text) give 32 bits. Bit `i` is written
//! as a zero-width code point directly after word `i * STRIDE`, so visible
//! text, word boundaries and spacing are unchanged. Not tamper-proof: anyone
//! can strip or forge the marks.

use crate::types::Watermark;
use sha2::{Digest, Sha256};

pub const STRIDE: usize = 10;
pub const PREFIX_LEN: usize = 8;
pub const BIT_ONE: char = '\u{200B}';
pub const BIT_ZERO: char = '\u{200C}';

/// Outcome of checking a text against its own watermark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkVerdict {
    /// Every expected bit is present and matches the text
    Intact,
    /// Marks are present but disagree with the text or are incomplete
    Tampered,
    /// No marks at the first stride position
    Absent,
}

impl Watermark {
    /// Derive the watermark for `text` (marks already in the text are ignored)
    pub fn derive(text: &str) -> Self {
        let digest = Sha256::digest(strip(text).as_bytes());
        let hash_prefix: String = hex::encode(digest).chars().take(PREFIX_LEN).collect();
        let bitstring = hash_prefix
            .chars()
            .filter_map(|c| c.to_digit(16))
            .map(|nibble| format!("{:04b}", nibble))
            .collect();
        Self {
            hash_prefix,
            bitstring,
            embedding_stride: STRIDE,
        }
    }
}

fn mark(bit: char) -> char {
    if bit == '1' {
        BIT_ONE
    } else {
        BIT_ZERO
    }
}

/// Number of bits a text with `words` words can carry
pub fn capacity(words: usize) -> usize {
    let slots = (words + STRIDE - 1) / STRIDE;
    slots.min(PREFIX_LEN * 4)
}

/// Embed the text's watermark. Returns the marked text and the watermark.
pub fn embed(text: &str) -> (String, Watermark) {
    let watermark = Watermark::derive(text);
    let bits: Vec<char> = watermark.bitstring.chars().collect();

    let mut out = String::with_capacity(text.len() + bits.len() * BIT_ONE.len_utf8());
    let mut word_index = 0usize;
    let mut next_bit = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        let word_ends = !c.is_whitespace() && chars.peek().map_or(true, |n| n.is_whitespace());
        if word_ends {
            if word_index % STRIDE == 0 && next_bit < bits.len() {
                out.push(mark(bits[next_bit]));
                next_bit += 1;
            }
            word_index += 1;
        }
    }

    (out, watermark)
}

/// Read the marks back at the embedding stride. Stops at the first stride
/// position without a mark.
pub fn probe(text: &str) -> Option<String> {
    let mut bits = String::new();
    for (index, word) in text.split_whitespace().enumerate() {
        if index % STRIDE != 0 {
            continue;
        }
        match word.chars().last() {
            Some(BIT_ONE) => bits.push('1'),
            Some(BIT_ZERO) => bits.push('0'),
            _ => break,
        }
        if bits.len() == PREFIX_LEN * 4 {
            break;
        }
    }
    if bits.is_empty() {
        None
    } else {
        Some(bits)
    }
}

/// Compare the probed bits against a fresh hash of the stripped text
pub fn verify(text: &str) -> WatermarkVerdict {
    let Some(bits) = probe(text) else {
        return WatermarkVerdict::Absent;
    };
    let clean = strip(text);
    let expected = Watermark::derive(&clean);
    let expected_len = capacity(clean.split_whitespace().count());

    if bits.len() == expected_len && expected.bitstring.starts_with(&bits) {
        WatermarkVerdict::Intact
    } else {
        WatermarkVerdict::Tampered
    }
}

/// Remove every watermark code point
pub fn strip(text: &str) -> String {
    text.chars().filter(|c| *c != BIT_ONE && *c != BIT_ZERO).collect()
}
