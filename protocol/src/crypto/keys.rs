//! # Key Management
//!
//! Ed25519 keypairs for wallet-side signing.
//!
//! The vault core never holds keys: signing belongs to the wallet layer.
//! This module exists for that layer (and for the in-memory ledger used in
//! tests and simulation) so that payment credentials, required signers and
//! witnesses all agree on one definition of "key hash".
//!
//! Key bytes are never logged.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::asset::KeyHash;

/// Errors that can occur during key operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: expected 32 bytes of hex")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// An Ed25519 signing keypair belonging to a wallet.
///
/// Not `Serialize`. `Debug` prints only the key hash.
pub struct WalletKeypair {
    signing_key: SigningKey,
}

/// A detached Ed25519 signature, always 64 bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSignature {
    bytes: Vec<u8>,
}

impl WalletKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Handy for fixtures.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded 32-byte secret key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Raw public key bytes.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The payment credential this keypair controls.
    pub fn key_hash(&self) -> KeyHash {
        KeyHash::from_public_key(&self.public_key_bytes())
    }

    /// Sign an arbitrary message (in practice, a transaction body hash).
    pub fn sign(&self, message: &[u8]) -> WalletSignature {
        let sig: DalekSignature = self.signing_key.sign(message);
        WalletSignature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &WalletSignature) -> bool {
        verify_with_public_key(&self.public_key_bytes(), message, signature)
    }
}

impl fmt::Debug for WalletKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletKeypair({})", self.key_hash())
    }
}

impl Clone for WalletKeypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

/// Verify `signature` over `message` for a raw 32-byte public key.
///
/// Malformed keys or signatures simply fail verification.
pub fn verify_with_public_key(
    public_key: &[u8; 32],
    message: &[u8],
    signature: &WalletSignature,
) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature.bytes.as_slice()) else {
        return false;
    };
    verifying_key
        .verify(message, &DalekSignature::from_bytes(&sig_bytes))
        .is_ok()
}

impl WalletSignature {
    /// Signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex encoding of the signature.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for WalletSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "WalletSignature({}...)", &hex[..hex.len().min(16)])
    }
}
