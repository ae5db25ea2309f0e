//! # Hashing Utilities
//!
//! The ledger names everything by BLAKE2b digest, so that is all this
//! module offers:
//!
//! - **BLAKE2b-224**: policy ids (hash of a tagged native script) and key
//!   hashes (hash of an Ed25519 public key). 28 bytes.
//! - **BLAKE2b-256**: transaction hashes. 32 bytes.
//!
//! Both are thin wrappers over the `blake2` crate. Fixed-size arrays come
//! back so that identifier types can wrap them without a length check.

use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};

type Blake2b224 = Blake2b<U28>;
type Blake2b256 = Blake2b<U32>;

/// Compute the BLAKE2b-224 digest of `data`.
///
/// # Example
///
/// ```
/// use fnft_protocol::crypto::blake2b_224;
///
/// let digest = blake2b_224(b"FNFT");
/// assert_eq!(digest.len(), 28);
/// ```
pub fn blake2b_224(data: &[u8]) -> [u8; 28] {
    let mut hasher = Blake2b224::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 28];
    output.copy_from_slice(&result);
    output
}

/// Compute the BLAKE2b-256 digest of `data`.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// BLAKE2b-224 over a tag byte followed by `data`, without building the
/// concatenated buffer. Script hashes are computed this way.
pub fn tagged_blake2b_224(tag: u8, data: &[u8]) -> [u8; 28] {
    let mut hasher = Blake2b224::new();
    hasher.update([tag]);
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 28];
    output.copy_from_slice(&result);
    output
}
