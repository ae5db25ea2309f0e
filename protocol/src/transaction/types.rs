//! Core value types for ledger transactions.
//!
//! These mirror the ledger's view of the world: outputs are identified by
//! `(tx_hash, index)`, hold a bundle of assets, and may carry an inline
//! datum. Everything here serializes to JSON so requests can be logged,
//! persisted or shipped to a wallet process.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::asset::{NativeScript, Unit};
use crate::codec::PlutusData;
use crate::config::TX_HASH_LENGTH;
use crate::crypto::hash::tagged_blake2b_224;
use crate::error::VaultError;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A ledger address in its bech32 text form. Opaque to the vault core.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// TxHash / OutputRef
// ---------------------------------------------------------------------------

/// Hash identifying a submitted transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash([u8; TX_HASH_LENGTH]);

impl TxHash {
    pub fn from_bytes(bytes: [u8; TX_HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TX_HASH_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, VaultError> {
        let bytes = hex::decode(s)
            .map_err(|e| VaultError::InvalidIdentifier(format!("tx hash {:?}: {}", s, e)))?;
        let arr: [u8; TX_HASH_LENGTH] = bytes.try_into().map_err(|_| {
            VaultError::InvalidIdentifier(format!("tx hash must be {} bytes", TX_HASH_LENGTH))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({}...)", &self.to_hex()[..12])
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Reference to one output of a transaction: `tx_hash#index`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    pub tx_hash: TxHash,
    pub index: u32,
}

impl OutputRef {
    pub fn new(tx_hash: TxHash, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

impl fmt::Debug for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputRef({})", self)
    }
}

impl FromStr for OutputRef {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash, index) = s.split_once('#').ok_or_else(|| {
            VaultError::InvalidIdentifier(format!("output ref {:?} is not hash#index", s))
        })?;
        let index = index
            .parse::<u32>()
            .map_err(|e| VaultError::InvalidIdentifier(format!("output index {:?}: {}", index, e)))?;
        Ok(Self::new(TxHash::from_hex(hash)?, index))
    }
}

// ---------------------------------------------------------------------------
// AssetBundle
// ---------------------------------------------------------------------------

/// The value held by an output: base currency plus native assets.
///
/// Zero quantities are never stored, so two bundles with the same holdings
/// always compare equal. All arithmetic is checked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBundle {
    /// Base currency, in lovelace.
    pub lovelace: u64,
    assets: BTreeMap<Unit, u64>,
}

impl AssetBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lovelace(lovelace: u64) -> Self {
        Self {
            lovelace,
            assets: BTreeMap::new(),
        }
    }

    /// Builder-style insert. Panics on overflow, so only for fixtures.
    #[cfg(test)]
    pub fn with(mut self, unit: &Unit, quantity: u64) -> Self {
        self.add(unit, quantity).expect("fixture quantity overflow");
        self
    }

    pub fn quantity_of(&self, unit: &Unit) -> u64 {
        self.assets.get(unit).copied().unwrap_or(0)
    }

    pub fn contains(&self, unit: &Unit) -> bool {
        self.assets.contains_key(unit)
    }

    /// Adds `quantity` of `unit`.
    pub fn add(&mut self, unit: &Unit, quantity: u64) -> Result<(), VaultError> {
        if quantity == 0 {
            return Ok(());
        }
        let entry = self.assets.entry(unit.clone()).or_insert(0);
        *entry = entry
            .checked_add(quantity)
            .ok_or(VaultError::SupplyOverflow)?;
        Ok(())
    }

    /// Removes `quantity` of `unit`. Fails if the bundle holds less.
    pub fn subtract(&mut self, unit: &Unit, quantity: u64) -> Result<(), VaultError> {
        if quantity == 0 {
            return Ok(());
        }
        let held = self.quantity_of(unit);
        let left = held
            .checked_sub(quantity)
            .ok_or_else(|| VaultError::InsufficientAssets {
                unit: unit.clone(),
                requested: quantity,
                held,
            })?;
        if left == 0 {
            self.assets.remove(unit);
        } else {
            self.assets.insert(unit.clone(), left);
        }
        Ok(())
    }

    /// Adds everything in `other` (base currency included).
    pub fn merge(&mut self, other: &AssetBundle) -> Result<(), VaultError> {
        self.lovelace = self
            .lovelace
            .checked_add(other.lovelace)
            .ok_or(VaultError::SupplyOverflow)?;
        for (unit, quantity) in &other.assets {
            self.add(unit, *quantity)?;
        }
        Ok(())
    }

    /// Native assets, in unit order.
    pub fn assets(&self) -> impl Iterator<Item = (&Unit, u64)> {
        self.assets.iter().map(|(u, q)| (u, *q))
    }

    /// `true` when the bundle holds no native assets.
    pub fn has_no_assets(&self) -> bool {
        self.assets.is_empty()
    }

    /// `true` when the bundle holds nothing at all.
    pub fn is_empty(&self) -> bool {
        self.lovelace == 0 && self.assets.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Datums and Scripts
// ---------------------------------------------------------------------------

/// CBOR bytes of an inline datum, exactly as stored on-chain.
#[derive(Clone, PartialEq, Eq)]
pub struct InlineDatum(Vec<u8>);

impl InlineDatum {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for InlineDatum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InlineDatum({})", self.to_hex())
    }
}

impl Serialize for InlineDatum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for InlineDatum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s)
            .map(InlineDatum)
            .map_err(serde::de::Error::custom)
    }
}

/// Plutus language version of a compiled script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlutusVersion {
    V1,
    V2,
    V3,
}

impl PlutusVersion {
    /// Tag byte prepended when hashing a script of this version.
    fn hash_tag(self) -> u8 {
        match self {
            PlutusVersion::V1 => 0x01,
            PlutusVersion::V2 => 0x02,
            PlutusVersion::V3 => 0x03,
        }
    }
}

/// A compiled Plutus script, held as the hex of its CBOR.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlutusScript {
    pub version: PlutusVersion,
    pub cbor_hex: String,
}

impl PlutusScript {
    pub fn v2(cbor_hex: impl Into<String>) -> Self {
        Self {
            version: PlutusVersion::V2,
            cbor_hex: cbor_hex.into(),
        }
    }

    /// Script hash: `BLAKE2b-224(version_tag ∥ script_bytes)`.
    pub fn hash(&self) -> Result<[u8; 28], VaultError> {
        let bytes = hex::decode(&self.cbor_hex)
            .map_err(|e| VaultError::InvalidIdentifier(format!("script cbor: {}", e)))?;
        Ok(tagged_blake2b_224(self.version.hash_tag(), &bytes))
    }
}

/// A script attached to a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptWitness {
    /// A native minting authority.
    Native { script: NativeScript },
    /// A Plutus validator or policy.
    Plutus { script: PlutusScript },
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// An unspent output as reported by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub output_ref: OutputRef,
    pub address: Address,
    pub assets: AssetBundle,
    pub datum: Option<InlineDatum>,
}

/// An output a transaction will create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub assets: AssetBundle,
    pub datum: Option<InlineDatum>,
}

impl TxOutput {
    /// Plain payment output without a datum.
    pub fn payment(address: Address, assets: AssetBundle) -> Self {
        Self {
            address,
            assets,
            datum: None,
        }
    }
}

/// An input to consume, with the redeemer its script (if any) receives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub utxo: Utxo,
    pub redeemer: Option<PlutusData>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetName, PolicyId};

    fn unit_of(byte: u8, name: &str) -> Unit {
        Unit::new(
            PolicyId::from_bytes([byte; 28]),
            AssetName::from_label(name).unwrap(),
        )
    }

    #[test]
    fn output_ref_display_and_parse() {
        let r = OutputRef::new(TxHash::from_bytes([0x0f; 32]), 7);
        let s = r.to_string();
        assert_eq!(s, format!("{}#7", "0f".repeat(32)));
        assert_eq!(s.parse::<OutputRef>().unwrap(), r);
        assert!("nohash".parse::<OutputRef>().is_err());
        assert!(format!("{}#x", "0f".repeat(32)).parse::<OutputRef>().is_err());
    }

    #[test]
    fn bundle_drops_zero_quantities() {
        let share = unit_of(1, "share");
        let mut bundle = AssetBundle::new();
        bundle.add(&share, 10).unwrap();
        bundle.subtract(&share, 10).unwrap();
        assert!(bundle.has_no_assets());
        assert_eq!(bundle, AssetBundle::new());
    }

    #[test]
    fn bundle_subtract_beyond_holding_fails() {
        let share = unit_of(1, "share");
        let mut bundle = AssetBundle::new().with(&share, 5);
        match bundle.subtract(&share, 6) {
            Err(VaultError::InsufficientAssets {
                unit,
                requested,
                held,
            }) => {
                assert_eq!(unit, share);
                assert_eq!((requested, held), (6, 5));
            }
            other => panic!("expected InsufficientAssets, got {:?}", other),
        }
        assert_eq!(bundle.quantity_of(&share), 5);

        let absent = unit_of(2, "absent");
        assert!(matches!(
            bundle.subtract(&absent, 1),
            Err(VaultError::InsufficientAssets { held: 0, .. })
        ));
    }

    #[test]
    fn bundle_add_overflow_is_reported() {
        let share = unit_of(1, "share");
        let mut bundle = AssetBundle::new().with(&share, u64::MAX);
        assert!(matches!(
            bundle.add(&share, 1),
            Err(VaultError::SupplyOverflow)
        ));
    }

    #[test]
    fn bundle_merge_adds_everything() {
        let a = unit_of(1, "a");
        let b = unit_of(2, "b");
        let mut left = AssetBundle::with_lovelace(2_000_000).with(&a, 3);
        let right = AssetBundle::with_lovelace(1_000_000).with(&a, 2).with(&b, 1);
        left.merge(&right).unwrap();
        assert_eq!(left.lovelace, 3_000_000);
        assert_eq!(left.quantity_of(&a), 5);
        assert_eq!(left.quantity_of(&b), 1);
    }

    #[test]
    fn bundle_json_uses_unit_strings_as_keys() {
        let share = unit_of(0xaa, "s");
        let bundle = AssetBundle::with_lovelace(1).with(&share, 42);
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["assets"][share.to_string()], 42);
        let back: AssetBundle = serde_json::from_value(json).unwrap();
        assert_eq!(back, bundle);
    }

    #[test]
    fn plutus_script_hash_depends_on_version() {
        let v2 = PlutusScript::v2("4e4d01000033222220051200120011");
        let v1 = PlutusScript {
            version: PlutusVersion::V1,
            cbor_hex: v2.cbor_hex.clone(),
        };
        assert_ne!(v1.hash().unwrap(), v2.hash().unwrap());
        assert!(PlutusScript::v2("zz").hash().is_err());
    }
}
