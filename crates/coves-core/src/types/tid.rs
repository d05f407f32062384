//! Time-ordered record key (TID) generation.
//!
//! The vote service assigns a new record's rkey client-side using this
//! scheme: a monotonically increasing, base32-sortable identifier derived
//! from the current time, so that two votes created back-to-back on one
//! process never collide even if they land in the same microsecond. A bare
//! microsecond timestamp alone risks collisions under concurrent callers
//! whenever clock resolution is coarser than request latency; a monotonic
//! counter removes that risk.

use std::sync::Mutex;
use std::sync::OnceLock;

use super::Rkey;

const B32_ALPHABET: &[u8; 32] = b"234567abcdefghijklmnopqrstuvwxyz";

/// Generates time-ordered, monotonically increasing record keys.
///
/// Each generated key encodes microseconds-since-epoch in the high bits and
/// a small monotonic counter in the low bits, so that two keys minted within
/// the same microsecond still sort and compare distinctly.
pub struct TidGenerator {
    last: Mutex<u64>,
}

impl TidGenerator {
    /// Create a new generator.
    pub fn new() -> Self {
        Self { last: Mutex::new(0) }
    }

    /// Returns the process-wide default generator.
    pub fn global() -> &'static TidGenerator {
        static GLOBAL: OnceLock<TidGenerator> = OnceLock::new();
        GLOBAL.get_or_init(TidGenerator::new)
    }

    /// Mint the next rkey. Guaranteed to be strictly greater (in the
    /// generator's own monotonic ordering) than every previously minted
    /// value from this generator.
    pub fn next(&self) -> Rkey {
        let micros = now_micros();

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let next = if micros > *last { micros } else { *last + 1 };
        *last = next;
        drop(last);

        Rkey::new(encode_base32_sortable(next)).expect("tid encoding is always a valid rkey")
    }
}

impl Default for TidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

/// Encode a 64-bit value as a 13-character base32-sortable string, matching
/// the AT Protocol TID alphabet and ordering.
fn encode_base32_sortable(mut value: u64) -> String {
    let mut chars = ['2'; 13];
    for slot in chars.iter_mut().rev() {
        let idx = (value & 0x1f) as usize;
        *slot = B32_ALPHABET[idx] as char;
        value >>= 5;
    }
    chars.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_keys_are_valid_rkeys() {
        let gen = TidGenerator::new();
        let rkey = gen.next();
        assert_eq!(rkey.as_str().len(), 13);
    }

    #[test]
    fn sequential_mints_strictly_increase() {
        let gen = TidGenerator::new();
        let mut prev = gen.next();
        for _ in 0..1000 {
            let next = gen.next();
            assert!(next.as_str() > prev.as_str());
            prev = next;
        }
    }

    #[test]
    fn global_generator_is_shared() {
        let a = TidGenerator::global().next();
        let b = TidGenerator::global().next();
        assert!(b.as_str() > a.as_str());
    }
}
