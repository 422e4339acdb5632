//! Injectable 128-bit digest used for the entity hash.

/// A fast, non-cryptographic 128-bit hash.
///
/// The entity hash only needs to be stable across runs and releases so that
/// cache entries stay addressable; collision resistance against adversarial
/// input is not required.
pub trait DigestFunction {
    /// Digest `bytes` into a 128-bit value.
    fn digest128(&self, bytes: &[u8]) -> u128;
}

/// [`DigestFunction`] backed by XXH3-128.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Xxh3Digest;

impl DigestFunction for Xxh3Digest {
    fn digest128(&self, bytes: &[u8]) -> u128 {
        xxhash_rust::xxh3::xxh3_128(bytes)
    }
}

impl<D: DigestFunction + ?Sized> DigestFunction for &D {
    fn digest128(&self, bytes: &[u8]) -> u128 {
        (**self).digest128(bytes)
    }
}
