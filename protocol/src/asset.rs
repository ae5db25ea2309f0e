//! # Asset Identity
//!
//! Fully-qualified asset identifiers and the minting authorities they are
//! derived from.
//!
//! A [`Unit`] is `policy_id ∥ hex(asset_name)`. Policy ids are fixed-width
//! (28 bytes) so the concatenation is unambiguous: the first 56 hex
//! characters are always the policy, the rest is always the name. Units
//! are derived, compared and hashed, never mutated.
//!
//! A [`PolicyId`] names a minting authority. For the vault that authority
//! is a [`NativeScript`], typically "all of: signature by key K", and the
//! policy id is `BLAKE2b-224(0x00 ∥ cbor(script))`, the ledger's script
//! hash. Deriving it twice from the same script always gives the same id.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use ciborium_ll::Header;
use std::io;

use crate::codec::{encode_with, CborWriter};
use crate::config::{
    DEFAULT_VALIDITY_TOKEN_NAME, KEY_HASH_LENGTH, MAX_ASSET_NAME_LENGTH, NATIVE_SCRIPT_TAG,
    POLICY_ID_LENGTH,
};
use crate::crypto::hash::{blake2b_224, tagged_blake2b_224};
use crate::error::VaultError;

// ---------------------------------------------------------------------------
// 28-byte hash identifiers
// ---------------------------------------------------------------------------

fn parse_hash28(s: &str, what: &str) -> Result<[u8; 28], VaultError> {
    let bytes = hex::decode(s)
        .map_err(|e| VaultError::InvalidIdentifier(format!("{} {:?}: {}", what, s, e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        VaultError::InvalidIdentifier(format!(
            "{} must be {} bytes, got {}",
            what,
            POLICY_ID_LENGTH,
            b.len()
        ))
    })
}

/// Identifier of a minting policy: a 28-byte script hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyId([u8; POLICY_ID_LENGTH]);

impl PolicyId {
    pub fn from_bytes(bytes: [u8; POLICY_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parses a policy id from a byte slice of exactly 28 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, VaultError> {
        let arr: [u8; POLICY_ID_LENGTH] = bytes.try_into().map_err(|_| {
            VaultError::InvalidIdentifier(format!(
                "policy id must be {} bytes, got {}",
                POLICY_ID_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; POLICY_ID_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, VaultError> {
        parse_hash28(s, "policy id").map(Self)
    }
}

/// Hash of an Ed25519 public key: the payment credential a native script
/// requires a signature from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyHash([u8; KEY_HASH_LENGTH]);

impl KeyHash {
    pub fn from_bytes(bytes: [u8; KEY_HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// `BLAKE2b-224(public_key)`.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        Self(blake2b_224(public_key))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_HASH_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, VaultError> {
        parse_hash28(s, "key hash").map(Self)
    }
}

macro_rules! hex_identifier_impls {
    ($ty:ident, $label:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({}...)"), &self.to_hex()[..12])
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl FromStr for $ty {
            type Err = VaultError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_identifier_impls!(PolicyId, "PolicyId");
hex_identifier_impls!(KeyHash, "KeyHash");

// ---------------------------------------------------------------------------
// AssetName
// ---------------------------------------------------------------------------

/// Name component of a unit: up to 32 arbitrary bytes.
///
/// Usually a UTF-8 label such as `"FNFT_VALIDITY"`, but the ledger does not
/// require text, so the raw bytes are what is stored and compared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetName(Vec<u8>);

impl AssetName {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, VaultError> {
        if bytes.len() > MAX_ASSET_NAME_LENGTH {
            return Err(VaultError::InvalidAssetName(format!(
                "{} bytes exceeds the {}-byte limit",
                bytes.len(),
                MAX_ASSET_NAME_LENGTH
            )));
        }
        Ok(Self(bytes))
    }

    /// Name from a human-readable label (its UTF-8 bytes).
    pub fn from_label(label: &str) -> Result<Self, VaultError> {
        Self::from_bytes(label.as_bytes().to_vec())
    }

    /// Name from its hex encoding.
    pub fn from_hex(s: &str) -> Result<Self, VaultError> {
        let bytes = hex::decode(s)
            .map_err(|e| VaultError::InvalidAssetName(format!("{:?}: {}", s, e)))?;
        Self::from_bytes(bytes)
    }

    /// The validity token name every vault uses unless configured otherwise.
    pub fn validity_default() -> Self {
        Self(DEFAULT_VALIDITY_TOKEN_NAME.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// The name as text, when it is valid UTF-8.
    pub fn label(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl fmt::Debug for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "AssetName({:?})", label),
            None => write!(f, "AssetName(0x{})", self.to_hex()),
        }
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for AssetName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AssetName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// Fully-qualified asset class: `policy_id ∥ hex(asset_name)`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Unit {
    policy_id: PolicyId,
    asset_name: AssetName,
}

impl Unit {
    pub fn new(policy_id: PolicyId, asset_name: AssetName) -> Self {
        Self {
            policy_id,
            asset_name,
        }
    }

    pub fn policy_id(&self) -> &PolicyId {
        &self.policy_id
    }

    pub fn asset_name(&self) -> &AssetName {
        &self.asset_name
    }

    /// Raw bytes of the unit: policy id followed by the name bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(POLICY_ID_LENGTH + self.asset_name.0.len());
        bytes.extend_from_slice(self.policy_id.as_bytes());
        bytes.extend_from_slice(self.asset_name.as_bytes());
        bytes
    }

    /// Parses `policy_hex ∥ name_hex`. The name part may be empty.
    pub fn parse(s: &str) -> Result<Self, VaultError> {
        let split = POLICY_ID_LENGTH * 2;
        if s.len() < split || !s.is_char_boundary(split) {
            return Err(VaultError::InvalidIdentifier(format!(
                "unit {:?} is shorter than a policy id",
                s
            )));
        }
        let (policy_hex, name_hex) = s.split_at(split);
        Ok(Self::new(
            PolicyId::from_hex(policy_hex)?,
            AssetName::from_hex(name_hex)?,
        ))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.policy_id, self.asset_name)
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unit({:?}, {:?})", self.policy_id, self.asset_name)
    }
}

impl FromStr for Unit {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Derives the unit for `name` under `policy_id`. Pure and deterministic.
pub fn unit(policy_id: &PolicyId, name: &AssetName) -> Unit {
    Unit::new(*policy_id, name.clone())
}

// ---------------------------------------------------------------------------
// NativeScript
// ---------------------------------------------------------------------------

/// A native (non-Plutus) script, used as a minting authority.
///
/// The JSON form matches what wallet tooling emits, e.g.
/// `{"type": "all", "scripts": [{"type": "sig", "keyHash": "…"}]}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NativeScript {
    /// Requires a signature from the key with this hash.
    Sig {
        #[serde(rename = "keyHash")]
        key_hash: KeyHash,
    },
    /// Every sub-script must be satisfied.
    All { scripts: Vec<NativeScript> },
    /// At least one sub-script must be satisfied.
    Any { scripts: Vec<NativeScript> },
    /// At least `required` sub-scripts must be satisfied.
    AtLeast {
        required: u32,
        scripts: Vec<NativeScript>,
    },
    /// Valid only from this slot on.
    #[serde(rename = "after")]
    InvalidBefore { slot: u64 },
    /// Valid only before this slot.
    #[serde(rename = "before")]
    InvalidHereafter { slot: u64 },
}

impl NativeScript {
    /// The usual vault authority: all of one signature.
    pub fn single_signer(key_hash: KeyHash) -> Self {
        NativeScript::All {
            scripts: vec![NativeScript::Sig { key_hash }],
        }
    }

    /// Ledger CBOR encoding of the script.
    pub fn to_cbor(&self) -> Result<Vec<u8>, VaultError> {
        encode_with(|enc| self.encode_into(enc))
            .map_err(|e| VaultError::Encoding(e.to_string()))
    }

    fn encode_into(&self, enc: &mut CborWriter<'_>) -> io::Result<()> {
        match self {
            NativeScript::Sig { key_hash } => {
                enc.push(Header::Array(Some(2)))?;
                enc.push(Header::Positive(0))?;
                enc.bytes(key_hash.as_bytes(), None)
            }
            NativeScript::All { scripts } => {
                enc.push(Header::Array(Some(2)))?;
                enc.push(Header::Positive(1))?;
                Self::encode_list(enc, scripts)
            }
            NativeScript::Any { scripts } => {
                enc.push(Header::Array(Some(2)))?;
                enc.push(Header::Positive(2))?;
                Self::encode_list(enc, scripts)
            }
            NativeScript::AtLeast { required, scripts } => {
                enc.push(Header::Array(Some(3)))?;
                enc.push(Header::Positive(3))?;
                enc.push(Header::Positive(*required as u64))?;
                Self::encode_list(enc, scripts)
            }
            NativeScript::InvalidBefore { slot } => {
                enc.push(Header::Array(Some(2)))?;
                enc.push(Header::Positive(4))?;
                enc.push(Header::Positive(*slot))
            }
            NativeScript::InvalidHereafter { slot } => {
                enc.push(Header::Array(Some(2)))?;
                enc.push(Header::Positive(5))?;
                enc.push(Header::Positive(*slot))
            }
        }
    }

    fn encode_list(enc: &mut CborWriter<'_>, scripts: &[NativeScript]) -> io::Result<()> {
        enc.push(Header::Array(Some(scripts.len())))?;
        for script in scripts {
            script.encode_into(enc)?;
        }
        Ok(())
    }

    /// Every key hash the script mentions, sorted and deduplicated.
    pub fn required_signers(&self) -> Vec<KeyHash> {
        let mut out = Vec::new();
        self.collect_signers(&mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_signers(&self, out: &mut Vec<KeyHash>) {
        match self {
            NativeScript::Sig { key_hash } => out.push(*key_hash),
            NativeScript::All { scripts }
            | NativeScript::Any { scripts }
            | NativeScript::AtLeast { scripts, .. } => {
                for script in scripts {
                    script.collect_signers(out);
                }
            }
            NativeScript::InvalidBefore { .. } | NativeScript::InvalidHereafter { .. } => {}
        }
    }

    /// Checks that the script can act as a minting authority: every
    /// threshold is satisfiable and at least one signing credential is named.
    pub fn validate(&self) -> Result<(), VaultError> {
        self.validate_thresholds()?;
        if self.required_signers().is_empty() {
            return Err(VaultError::MalformedAuthority(
                "script names no signing credential".into(),
            ));
        }
        Ok(())
    }

    fn validate_thresholds(&self) -> Result<(), VaultError> {
        match self {
            NativeScript::AtLeast { required, scripts } => {
                if *required as usize > scripts.len() {
                    return Err(VaultError::MalformedAuthority(format!(
                        "atLeast requires {} of only {} scripts",
                        required,
                        scripts.len()
                    )));
                }
                scripts.iter().try_for_each(NativeScript::validate_thresholds)
            }
            NativeScript::All { scripts } | NativeScript::Any { scripts } => {
                scripts.iter().try_for_each(NativeScript::validate_thresholds)
            }
            _ => Ok(()),
        }
    }

    /// Whether a transaction signed by `signers` at `slot` satisfies the script.
    pub fn is_satisfied(&self, signers: &[KeyHash], slot: u64) -> bool {
        match self {
            NativeScript::Sig { key_hash } => signers.contains(key_hash),
            NativeScript::All { scripts } => scripts.iter().all(|s| s.is_satisfied(signers, slot)),
            NativeScript::Any { scripts } => scripts.iter().any(|s| s.is_satisfied(signers, slot)),
            NativeScript::AtLeast { required, scripts } => {
                let met = scripts
                    .iter()
                    .filter(|s| s.is_satisfied(signers, slot))
                    .count();
                met >= *required as usize
            }
            NativeScript::InvalidBefore { slot: start } => slot >= *start,
            NativeScript::InvalidHereafter { slot: end } => slot < *end,
        }
    }

    /// Policy id of this script. See [`policy_id_of`].
    pub fn policy_id(&self) -> Result<PolicyId, VaultError> {
        policy_id_of(self)
    }
}

/// Derives the policy id of a minting authority:
/// `BLAKE2b-224(0x00 ∥ cbor(script))`.
///
/// # Errors
///
/// Returns [`VaultError::MalformedAuthority`] if the script fails
/// [`NativeScript::validate`].
pub fn policy_id_of(authority: &NativeScript) -> Result<PolicyId, VaultError> {
    authority.validate()?;
    Ok(PolicyId(tagged_blake2b_224(
        NATIVE_SCRIPT_TAG,
        &authority.to_cbor()?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(byte: u8) -> PolicyId {
        PolicyId::from_bytes([byte; 28])
    }

    #[test]
    fn unit_is_policy_hex_then_name_hex() {
        let name = AssetName::from_label("nft1").unwrap();
        let u = unit(&policy(0xab), &name);
        assert_eq!(u.to_string(), format!("{}{}", "ab".repeat(28), "6e667431"));
    }

    #[test]
    fn unit_derivation_is_deterministic() {
        let name = AssetName::validity_default();
        assert_eq!(unit(&policy(1), &name), unit(&policy(1), &name));
        assert_eq!(
            unit(&policy(1), &name).to_bytes(),
            unit(&policy(1), &name).to_bytes()
        );
    }

    #[test]
    fn different_names_produce_different_units() {
        let a = unit(&policy(1), &AssetName::from_label("FNFT_SHARE").unwrap());
        let b = unit(&policy(1), &AssetName::validity_default());
        assert_ne!(a, b);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn different_policies_produce_different_units() {
        let name = AssetName::from_label("x").unwrap();
        assert_ne!(unit(&policy(1), &name), unit(&policy(2), &name));
    }

    #[test]
    fn unit_parse_roundtrip() {
        let u = unit(&policy(0x37), &AssetName::from_label("nft1").unwrap());
        assert_eq!(Unit::parse(&u.to_string()).unwrap(), u);

        let nameless = unit(&policy(0x37), &AssetName::from_bytes(vec![]).unwrap());
        assert_eq!(Unit::parse(&nameless.to_string()).unwrap(), nameless);
    }

    #[test]
    fn unit_parse_rejects_garbage() {
        assert!(Unit::parse("abcd").is_err());
        assert!(Unit::parse(&format!("{}zz", "00".repeat(28))).is_err());
        assert!(Unit::parse(&format!("{}0", "00".repeat(28))).is_err());
    }

    #[test]
    fn asset_name_length_limit() {
        assert!(AssetName::from_bytes(vec![0u8; 32]).is_ok());
        assert!(matches!(
            AssetName::from_bytes(vec![0u8; 33]),
            Err(VaultError::InvalidAssetName(_))
        ));
    }

    #[test]
    fn asset_name_label_and_hex_agree() {
        let from_label = AssetName::from_label("FNFT_VALIDITY").unwrap();
        let from_hex = AssetName::from_hex(&hex::encode("FNFT_VALIDITY")).unwrap();
        assert_eq!(from_label, from_hex);
        assert_eq!(from_label, AssetName::validity_default());
        assert_eq!(from_label.label(), Some("FNFT_VALIDITY"));
    }

    #[test]
    fn single_signer_script_cbor() {
        let script = NativeScript::single_signer(KeyHash::from_bytes([7u8; 28]));
        assert_eq!(
            hex::encode(script.to_cbor().unwrap()),
            format!("8201818200581c{}", "07".repeat(28))
        );
    }

    #[test]
    fn single_signer_policy_id_vector() {
        let script = NativeScript::single_signer(KeyHash::from_bytes([7u8; 28]));
        assert_eq!(
            policy_id_of(&script).unwrap().to_hex(),
            "1a65e9ff7e968fe6976e9aca773401a40dbf9b1a4965c9376d514f33"
        );
    }

    #[test]
    fn policy_id_is_stable_and_key_specific() {
        let a = NativeScript::single_signer(KeyHash::from_bytes([1u8; 28]));
        let b = NativeScript::single_signer(KeyHash::from_bytes([2u8; 28]));
        assert_eq!(policy_id_of(&a).unwrap(), policy_id_of(&a).unwrap());
        assert_ne!(policy_id_of(&a).unwrap(), policy_id_of(&b).unwrap());
    }

    #[test]
    fn unsatisfiable_threshold_is_malformed() {
        let script = NativeScript::AtLeast {
            required: 2,
            scripts: vec![NativeScript::Sig {
                key_hash: KeyHash::from_bytes([1u8; 28]),
            }],
        };
        assert!(matches!(
            policy_id_of(&script),
            Err(VaultError::MalformedAuthority(_))
        ));
    }

    #[test]
    fn script_without_signer_is_malformed() {
        let script = NativeScript::All {
            scripts: vec![NativeScript::InvalidHereafter { slot: 100 }],
        };
        assert!(matches!(
            script.policy_id(),
            Err(VaultError::MalformedAuthority(_))
        ));
    }

    #[test]
    fn required_signers_are_deduplicated() {
        let k = KeyHash::from_bytes([5u8; 28]);
        let script = NativeScript::Any {
            scripts: vec![
                NativeScript::Sig { key_hash: k },
                NativeScript::All {
                    scripts: vec![NativeScript::Sig { key_hash: k }],
                },
            ],
        };
        assert_eq!(script.required_signers(), vec![k]);
    }

    #[test]
    fn native_script_json_shape() {
        let json = format!(
            r#"{{"type":"all","scripts":[{{"type":"sig","keyHash":"{}"}},{{"type":"before","slot":9}}]}}"#,
            "07".repeat(28)
        );
        let script: NativeScript = serde_json::from_str(&json).unwrap();
        assert_eq!(
            script,
            NativeScript::All {
                scripts: vec![
                    NativeScript::Sig {
                        key_hash: KeyHash::from_bytes([7u8; 28])
                    },
                    NativeScript::InvalidHereafter { slot: 9 },
                ]
            }
        );
        assert_eq!(serde_json::to_string(&script).unwrap(), json);
    }

    #[test]
    fn key_hash_from_public_key_vector() {
        assert_eq!(
            KeyHash::from_public_key(&[3u8; 32]).to_hex(),
            "0653c0e43f55b3905a7ddaba226296ad77f56af0fbfcb9ca5510b3af"
        );
    }

    #[test]
    fn policy_id_hex_roundtrip_and_length_check() {
        let p = policy(0x42);
        assert_eq!(PolicyId::from_hex(&p.to_hex()).unwrap(), p);
        assert!(PolicyId::from_hex("abcd").is_err());
        assert!(PolicyId::try_from_slice(&[0u8; 27]).is_err());
    }

    #[test]
    fn script_satisfaction_follows_signers_and_slots() {
        let a = KeyHash::from_bytes([1u8; 28]);
        let b = KeyHash::from_bytes([2u8; 28]);
        let two_of_two = NativeScript::AtLeast {
            required: 2,
            scripts: vec![
                NativeScript::Sig { key_hash: a },
                NativeScript::Sig { key_hash: b },
            ],
        };
        assert!(two_of_two.is_satisfied(&[a, b], 0));
        assert!(!two_of_two.is_satisfied(&[a], 0));

        let timed = NativeScript::All {
            scripts: vec![
                NativeScript::Sig { key_hash: a },
                NativeScript::InvalidBefore { slot: 10 },
                NativeScript::InvalidHereafter { slot: 20 },
            ],
        };
        assert!(!timed.is_satisfied(&[a], 9));
        assert!(timed.is_satisfied(&[a], 10));
        assert!(!timed.is_satisfied(&[a], 20));
        assert!(NativeScript::single_signer(a).is_satisfied(&[b, a], 0));
    }
}
