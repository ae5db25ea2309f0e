//! # Cryptographic Primitives
//!
//! BLAKE2b hashing for identifiers and Ed25519 keys for payment
//! credentials, both as the ledger defines them.

pub mod hash;
pub mod keys;

pub use hash::{blake2b_224, blake2b_256, tagged_blake2b_224};
pub use keys::{KeyError, WalletKeypair, WalletSignature};
