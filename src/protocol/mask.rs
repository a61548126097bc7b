//! Payload masking (RFC 6455 Section 5.3).
//!
//! Masking is an XOR of every payload byte with `key[i % 4]`, so applying the
//! same key twice restores the input.

use crate::error::{Error, Result};

/// Length of a masking key in bytes.
pub const MASK_LEN: usize = 4;

/// Scalar byte-by-byte XOR masking.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; MASK_LEN]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % MASK_LEN];
    }
}

/// Word-at-a-time masking.
///
/// Processes 4-byte chunks as `u32` and finishes the tail bytewise. The output
/// is identical to [`apply_mask`].
#[inline]
pub fn apply_mask_fast(data: &mut [u8], mask: [u8; MASK_LEN]) {
    let mask_u32 = u32::from_ne_bytes(mask);
    let mut chunks = data.chunks_exact_mut(MASK_LEN);
    for chunk in &mut chunks {
        let val = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&(val ^ mask_u32).to_ne_bytes());
    }
    // Chunks are 4-aligned, so the tail restarts at key index 0.
    for (byte, key) in chunks.into_remainder().iter_mut().zip(mask) {
        *byte ^= key;
    }
}

/// Draw `N` bytes from the operating system RNG.
///
/// # Errors
///
/// Returns `Error::Io` if the RNG is unavailable.
pub fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf).map_err(|e| Error::Io(format!("random source: {e}")))?;
    Ok(buf)
}

/// Generate a fresh masking key.
///
/// Every client frame gets its own key; keys are never derived from earlier
/// ones.
///
/// # Errors
///
/// Returns `Error::Io` if the RNG is unavailable.
#[inline]
pub fn generate_mask() -> Result<[u8; MASK_LEN]> {
    random_bytes::<MASK_LEN>()
}
