//! The vault datum: the on-chain record of a live vault.
//!
//! The datum is attached inline to the vault output and is the only piece
//! of state the vault has. Its wire form is Plutus `Constr 0` with six
//! fields in a fixed order:
//!
//! ```text
//! Constr 0 [ share_policy_id        : bytes(28)
//!          , share_asset_name       : bytes(<=32)
//!          , minted_supply          : int
//!          , collectible_policy_id  : bytes(28)
//!          , collectible_asset_name : bytes(<=32)
//!          , remaining_supply       : int ]
//! ```
//!
//! Decoding is strict. Anything that is not exactly this shape is a
//! [`VaultError::MalformedDatum`], and a record claiming more shares locked
//! than minted is a [`VaultError::InvariantViolation`]. A vault whose datum
//! fails either check is never used as the basis for a transition.

use serde::{Deserialize, Serialize};

use crate::asset::{AssetName, PolicyId, Unit};
use crate::codec::PlutusData;
use crate::config::{VAULT_DATUM_CONSTRUCTOR, VAULT_DATUM_FIELD_COUNT};
use crate::error::VaultError;

/// Canonical state record of a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultDatum {
    /// Policy under which the shares and the validity token are minted.
    pub share_policy_id: PolicyId,
    pub share_asset_name: AssetName,
    /// Fixed at Mint. Never changes for the life of the vault.
    pub minted_supply: u64,
    pub collectible_policy_id: PolicyId,
    pub collectible_asset_name: AssetName,
    /// Shares currently locked in the vault. Always `<= minted_supply`.
    pub remaining_supply: u64,
}

impl VaultDatum {
    /// Datum of a freshly minted vault: every share is locked.
    pub fn new(
        share_policy_id: PolicyId,
        share_asset_name: AssetName,
        collectible: &Unit,
        minted_supply: u64,
    ) -> Self {
        Self {
            share_policy_id,
            share_asset_name,
            minted_supply,
            collectible_policy_id: *collectible.policy_id(),
            collectible_asset_name: collectible.asset_name().clone(),
            remaining_supply: minted_supply,
        }
    }

    /// `0 <= remaining <= minted`.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.remaining_supply > self.minted_supply {
            return Err(VaultError::InvariantViolation {
                remaining: self.remaining_supply,
                minted: self.minted_supply,
            });
        }
        Ok(())
    }

    /// Copy of this datum with a different remaining supply.
    pub fn with_remaining(&self, remaining_supply: u64) -> Result<Self, VaultError> {
        let next = Self {
            remaining_supply,
            ..self.clone()
        };
        next.validate()?;
        Ok(next)
    }

    /// Shares held outside the vault.
    pub fn outstanding(&self) -> u64 {
        self.minted_supply.saturating_sub(self.remaining_supply)
    }

    pub fn share_unit(&self) -> Unit {
        Unit::new(self.share_policy_id, self.share_asset_name.clone())
    }

    pub fn collectible_unit(&self) -> Unit {
        Unit::new(self.collectible_policy_id, self.collectible_asset_name.clone())
    }

    /// The authenticity token: the share policy with the configured name.
    pub fn validity_unit(&self, validity_token_name: &AssetName) -> Unit {
        Unit::new(self.share_policy_id, validity_token_name.clone())
    }

    // -----------------------------------------------------------------------
    // Wire Format
    // -----------------------------------------------------------------------

    pub fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            VAULT_DATUM_CONSTRUCTOR,
            vec![
                PlutusData::Bytes(self.share_policy_id.as_bytes().to_vec()),
                PlutusData::Bytes(self.share_asset_name.as_bytes().to_vec()),
                PlutusData::uint(self.minted_supply),
                PlutusData::Bytes(self.collectible_policy_id.as_bytes().to_vec()),
                PlutusData::Bytes(self.collectible_asset_name.as_bytes().to_vec()),
                PlutusData::uint(self.remaining_supply),
            ],
        )
    }

    pub fn from_plutus_data(data: &PlutusData) -> Result<Self, VaultError> {
        let fields = match data {
            PlutusData::Constr {
                alternative,
                fields,
            } if *alternative == VAULT_DATUM_CONSTRUCTOR => fields,
            PlutusData::Constr { alternative, .. } => {
                return Err(malformed(format!(
                    "unsupported datum constructor {}",
                    alternative
                )))
            }
            other => {
                return Err(malformed(format!(
                    "expected constr, found {}",
                    other.kind()
                )))
            }
        };

        if fields.len() != VAULT_DATUM_FIELD_COUNT {
            return Err(malformed(format!(
                "expected {} fields, found {}",
                VAULT_DATUM_FIELD_COUNT,
                fields.len()
            )));
        }

        let datum = Self {
            share_policy_id: policy_field(&fields[0], "share_policy_id")?,
            share_asset_name: name_field(&fields[1], "share_asset_name")?,
            minted_supply: quantity_field(&fields[2], "minted_supply")?,
            collectible_policy_id: policy_field(&fields[3], "collectible_policy_id")?,
            collectible_asset_name: name_field(&fields[4], "collectible_asset_name")?,
            remaining_supply: quantity_field(&fields[5], "remaining_supply")?,
        };
        datum.validate()?;
        Ok(datum)
    }

    /// CBOR bytes of the inline datum.
    pub fn encode(&self) -> Result<Vec<u8>, VaultError> {
        self.to_plutus_data()
            .to_cbor()
            .map_err(|e| VaultError::Encoding(e.to_string()))
    }

    /// Parses inline datum bytes. See the module docs for what is rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self, VaultError> {
        let data = PlutusData::from_cbor(bytes).map_err(|e| malformed(e.to_string()))?;
        Self::from_plutus_data(&data)
    }

    pub fn decode_hex(hex_str: &str) -> Result<Self, VaultError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| malformed(format!("hex: {}", e)))?;
        Self::decode(&bytes)
    }
}

fn malformed(reason: String) -> VaultError {
    VaultError::MalformedDatum(reason)
}

fn bytes_field<'a>(field: &'a PlutusData, name: &str) -> Result<&'a [u8], VaultError> {
    field
        .as_bytes()
        .ok_or_else(|| malformed(format!("{}: expected bytes, found {}", name, field.kind())))
}

fn policy_field(field: &PlutusData, name: &str) -> Result<PolicyId, VaultError> {
    let bytes = bytes_field(field, name)?;
    PolicyId::try_from_slice(bytes).map_err(|e| malformed(format!("{}: {}", name, e)))
}

fn name_field(field: &PlutusData, name: &str) -> Result<AssetName, VaultError> {
    let bytes = bytes_field(field, name)?;
    AssetName::from_bytes(bytes.to_vec()).map_err(|e| malformed(format!("{}: {}", name, e)))
}

fn quantity_field(field: &PlutusData, name: &str) -> Result<u64, VaultError> {
    let value = field
        .as_int()
        .ok_or_else(|| malformed(format!("{}: expected int, found {}", name, field.kind())))?;
    u64::try_from(value).map_err(|_| malformed(format!("{}: quantity {} out of range", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VaultDatum {
        let collectible = Unit::new(
            PolicyId::from_bytes([0x37; 28]),
            AssetName::from_label("nft1").unwrap(),
        );
        VaultDatum::new(
            PolicyId::from_bytes([0x1a; 28]),
            AssetName::from_label("FNFT").unwrap(),
            &collectible,
            1000,
        )
    }

    #[test]
    fn fresh_datum_locks_everything() {
        let d = sample();
        assert_eq!(d.remaining_supply, 1000);
        assert_eq!(d.outstanding(), 0);
        d.validate().unwrap();
    }

    #[test]
    fn encode_decode_round_trip() {
        let d = sample().with_remaining(700).unwrap();
        assert_eq!(VaultDatum::decode(&d.encode().unwrap()).unwrap(), d);
    }

    #[test]
    fn encoding_follows_canonical_layout() {
        let hex = hex::encode(sample().encode().unwrap());
        // tag 121, indefinite list, 28-byte policy id first
        assert!(hex.starts_with(&format!("d8799f581c{}", "1a".repeat(28))));
        // minted 1000 and remaining 1000 encode as 0x1903e8
        assert_eq!(hex.matches("1903e8").count(), 2);
        assert!(hex.ends_with("1903e8ff"));
    }

    #[test]
    fn rejects_remaining_above_minted() {
        let mut d = sample();
        d.remaining_supply = 1001;
        let err = VaultDatum::decode(&d.encode().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            VaultError::InvariantViolation {
                remaining: 1001,
                minted: 1000
            }
        ));
    }

    #[test]
    fn rejects_wrong_constructor() {
        let mut data = sample().to_plutus_data();
        if let PlutusData::Constr { alternative, .. } = &mut data {
            *alternative = 1;
        }
        let err = VaultDatum::decode(&data.to_cbor().unwrap()).unwrap_err();
        assert!(matches!(err, VaultError::MalformedDatum(_)));
    }

    #[test]
    fn rejects_missing_field() {
        let mut data = sample().to_plutus_data();
        if let PlutusData::Constr { fields, .. } = &mut data {
            fields.pop();
        }
        assert!(matches!(
            VaultDatum::decode(&data.to_cbor().unwrap()),
            Err(VaultError::MalformedDatum(_))
        ));
    }

    #[test]
    fn rejects_swapped_field_types() {
        let mut data = sample().to_plutus_data();
        if let PlutusData::Constr { fields, .. } = &mut data {
            fields.swap(1, 2);
        }
        assert!(matches!(
            VaultDatum::decode(&data.to_cbor().unwrap()),
            Err(VaultError::MalformedDatum(_))
        ));
    }

    #[test]
    fn rejects_negative_quantity() {
        let mut data = sample().to_plutus_data();
        if let PlutusData::Constr { fields, .. } = &mut data {
            fields[5] = PlutusData::Int(-1);
        }
        assert!(matches!(
            VaultDatum::decode(&data.to_cbor().unwrap()),
            Err(VaultError::MalformedDatum(_))
        ));
    }

    #[test]
    fn rejects_short_policy_id() {
        let mut data = sample().to_plutus_data();
        if let PlutusData::Constr { fields, .. } = &mut data {
            fields[0] = PlutusData::Bytes(vec![0x1a; 27]);
        }
        assert!(matches!(
            VaultDatum::decode(&data.to_cbor().unwrap()),
            Err(VaultError::MalformedDatum(_))
        ));
    }

    #[test]
    fn rejects_trailing_bytes_and_garbage() {
        let mut bytes = sample().encode().unwrap();
        bytes.push(0x00);
        assert!(matches!(
            VaultDatum::decode(&bytes),
            Err(VaultError::MalformedDatum(_))
        ));
        assert!(matches!(
            VaultDatum::decode(&[0xff, 0x01]),
            Err(VaultError::MalformedDatum(_))
        ));
        assert!(VaultDatum::decode_hex("not hex").is_err());
    }

    #[test]
    fn units_are_derived_from_fields() {
        let d = sample();
        let validity = d.validity_unit(&AssetName::validity_default());
        assert_eq!(validity.policy_id(), &d.share_policy_id);
        assert_ne!(validity, d.share_unit());
        assert_eq!(
            d.collectible_unit().to_string(),
            format!("{}{}", "37".repeat(28), hex::encode("nft1"))
        );
    }

    #[test]
    fn with_remaining_enforces_bound() {
        assert!(sample().with_remaining(1001).is_err());
        assert_eq!(sample().with_remaining(0).unwrap().outstanding(), 1000);
    }

    #[test]
    fn json_uses_hex_identifiers() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["share_policy_id"], "1a".repeat(28));
        assert_eq!(json["share_asset_name"], hex::encode("FNFT"));
        let back: VaultDatum = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }
}
