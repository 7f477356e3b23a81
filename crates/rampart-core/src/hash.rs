//! State hashing for cross-peer divergence detection.
//!
//! Every peer in a lockstep session folds its reachable simulation state into
//! a single integer after each tick. Two peers that consumed the same ordered
//! command stream must produce the same value.
//!
//! The checksum is FNV-1a (64-bit) over a flattened sequence of little-endian
//! integer words. It is not cryptographic. `std`'s `DefaultHasher` is not
//! used because its output is not stable across compiler releases.
//!
//! Floats are folded through [`StateHasher::write_f64`], which hashes the bit
//! pattern, so any float that reaches the hash must itself be computed in a
//! bit-reproducible way.

/// Rolling FNV-1a checksum over numeric words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHasher(u64);

impl StateHasher {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    /// Starts a new hash.
    #[must_use]
    pub const fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    /// Feeds a `u64` word.
    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Feeds a `u32` word.
    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Feeds an `i32` word.
    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    /// Feeds a boolean as a single word.
    pub fn write_bool(&mut self, v: bool) {
        self.write_u32(u32::from(v));
    }

    /// Feeds the bit pattern of an `f64`.
    pub fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    /// Feeds a string as its length followed by its bytes.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write(s.as_bytes());
    }

    /// Feeds an optional word; `None` and `Some` hash differently.
    pub fn write_opt_u64(&mut self, v: Option<u64>) {
        match v {
            Some(v) => {
                self.write_u32(1);
                self.write_u64(v);
            }
            None => self.write_u32(0),
        }
    }

    /// Returns the current checksum.
    #[must_use]
    pub const fn finish(&self) -> u64 {
        self.0
    }
}

impl Default for StateHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// A structure that contributes to the simulation state hash.
///
/// Implementations must only walk ordered structures (registration order,
/// `BTreeMap`, `Vec`), never hash-bucket order.
pub trait StateHash {
    /// Folds this value into `hasher`.
    fn hash_state(&self, hasher: &mut StateHasher);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash_is_offset_basis() {
        assert_eq!(StateHasher::new().finish(), 0xcbf2_9ce4_8422_2325);
    }

    #[test]
    fn deterministic() {
        let mut a = StateHasher::new();
        let mut b = StateHasher::new();
        for v in [1u64, 2, 3, u64::MAX] {
            a.write_u64(v);
            b.write_u64(v);
        }
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn order_matters() {
        let mut a = StateHasher::new();
        a.write_u32(1);
        a.write_u32(2);

        let mut b = StateHasher::new();
        b.write_u32(2);
        b.write_u32(1);

        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn option_variants_differ() {
        let mut a = StateHasher::new();
        a.write_opt_u64(None);
        let mut b = StateHasher::new();
        b.write_opt_u64(Some(0));
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn strings_are_length_prefixed() {
        let mut a = StateHasher::new();
        a.write_str("ab");
        a.write_str("c");
        let mut b = StateHasher::new();
        b.write_str("a");
        b.write_str("bc");
        assert_ne!(a.finish(), b.finish());
    }
}
