//! # Protocol Configuration & Constants
//!
//! Every fixed number the vault logic depends on lives here, next to the
//! per-instance [`VaultConfig`]. Nothing that identifies a particular vault
//! (addresses, policies, collectibles) is compiled in: it all arrives
//! through [`VaultConfig`] so the same code serves any vault.
//!
//! Changing a wire constant after vaults exist on-chain strands every one
//! of them. Bump the datum constructor instead.

use serde::{Deserialize, Serialize};

use crate::asset::{AssetName, NativeScript, Unit};
use crate::error::VaultError;
use crate::transaction::types::{Address, OutputRef, PlutusScript};

// ---------------------------------------------------------------------------
// Identifier Widths
// ---------------------------------------------------------------------------

/// Policy ids are BLAKE2b-224 digests: 28 bytes, 56 hex characters.
pub const POLICY_ID_LENGTH: usize = 28;

/// Payment credentials (key hashes) share the policy id width.
pub const KEY_HASH_LENGTH: usize = 28;

/// Ledger limit on asset name length, in bytes.
pub const MAX_ASSET_NAME_LENGTH: usize = 32;

/// Transaction hashes are BLAKE2b-256 digests.
pub const TX_HASH_LENGTH: usize = 32;

/// Tag byte prepended to a native script before hashing it into a policy id.
pub const NATIVE_SCRIPT_TAG: u8 = 0x00;

// ---------------------------------------------------------------------------
// Vault Wire Format
// ---------------------------------------------------------------------------

/// Label of the authenticity token minted alongside the shares.
pub const DEFAULT_VALIDITY_TOKEN_NAME: &str = "FNFT_VALIDITY";

/// Quantity of the validity token that lives in a vault. Always one.
pub const VALIDITY_TOKEN_QUANTITY: u64 = 1;

/// Constructor index of the vault datum. Acts as the datum version: a new
/// field layout gets a new index, never a reshuffle of this one.
pub const VAULT_DATUM_CONSTRUCTOR: u64 = 0;

/// Number of fields in a version-0 vault datum.
pub const VAULT_DATUM_FIELD_COUNT: usize = 6;

/// Redeemer constructor indices passed to the spending validator.
pub const REDEEMER_MINT: u64 = 0;
pub const REDEEMER_BURN: u64 = 1;
pub const REDEEMER_WITHDRAW: u64 = 2;
pub const REDEEMER_DEPOSIT: u64 = 3;

// ---------------------------------------------------------------------------
// Structured Data Limits
// ---------------------------------------------------------------------------

/// Plutus byte strings longer than this are split into chunks.
pub const PLUTUS_BYTES_CHUNK: usize = 64;

/// Nesting limit for decoded structured data. A vault datum is two levels
/// deep; anything near this limit is hostile input.
pub const MAX_DATA_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

/// Where the spending validator comes from when a vault output is spent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ValidatorSource {
    /// The compiled validator is attached to every spending transaction.
    Attached {
        /// The compiled script.
        script: PlutusScript,
    },
    /// The validator lives in a reference output that is read, not spent.
    Reference {
        /// Output carrying the validator as a reference script.
        output_ref: OutputRef,
    },
}

/// Everything the core needs to know about one vault instance.
///
/// The minting authority doubles as the share policy: the share policy id
/// is derived from it at Mint and must match the datum afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Script address that holds the vault output.
    pub vault_address: Address,

    /// Native script governing share and validity-token issuance.
    pub minting_authority: NativeScript,

    /// Name of the validity token, normally [`DEFAULT_VALIDITY_TOKEN_NAME`].
    #[serde(default = "default_validity_token_name")]
    pub validity_token_name: AssetName,

    /// Name component of the share unit.
    pub share_asset_name: AssetName,

    /// The collectible locked by this vault.
    pub collectible: Unit,

    /// How the spending validator is supplied.
    pub spending_validator: ValidatorSource,
}

fn default_validity_token_name() -> AssetName {
    AssetName::validity_default()
}

impl VaultConfig {
    /// Rejects configurations that could never produce a valid vault.
    ///
    /// The share and validity names must differ, otherwise the validity
    /// token would just be one more share.
    pub fn validate(&self) -> Result<(), VaultError> {
        self.minting_authority.policy_id()?;

        if self.validity_token_name == self.share_asset_name {
            return Err(VaultError::InvalidAssetName(format!(
                "share name {} collides with the validity token name",
                self.share_asset_name
            )));
        }

        if self.vault_address.as_str().is_empty() {
            return Err(VaultError::InvalidIdentifier(
                "vault address must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Loads a configuration from its JSON representation and validates it.
    pub fn from_json(json: &str) -> Result<Self, VaultError> {
        let config: VaultConfig = serde_json::from_str(json)
            .map_err(|e| VaultError::InvalidIdentifier(format!("vault config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{KeyHash, PolicyId};

    fn sample_config() -> VaultConfig {
        VaultConfig {
            vault_address: Address::new("addr_test1wvault"),
            minting_authority: NativeScript::single_signer(KeyHash::from_bytes([7u8; 28])),
            validity_token_name: AssetName::validity_default(),
            share_asset_name: AssetName::from_label("FNFT_SHARE").unwrap(),
            collectible: Unit::new(
                PolicyId::from_bytes([9u8; 28]),
                AssetName::from_label("nft1").unwrap(),
            ),
            spending_validator: ValidatorSource::Attached {
                script: PlutusScript::v2("4e4d01000033222220051200120011"),
            },
        }
    }

    #[test]
    fn test_identifier_widths() {
        assert_eq!(POLICY_ID_LENGTH, 28);
        assert_eq!(KEY_HASH_LENGTH, POLICY_ID_LENGTH);
        assert_eq!(TX_HASH_LENGTH, 32);
    }

    #[test]
    fn test_redeemer_indices_are_distinct() {
        let mut indices = vec![REDEEMER_MINT, REDEEMER_BURN, REDEEMER_WITHDRAW, REDEEMER_DEPOSIT];
        indices.sort();
        indices.dedup();
        assert_eq!(indices.len(), 4);
    }

    #[test]
    fn test_validity_name_fits_ledger_limit() {
        assert!(DEFAULT_VALIDITY_TOKEN_NAME.len() <= MAX_ASSET_NAME_LENGTH);
    }

    #[test]
    fn test_sample_config_validates() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_share_name_must_differ_from_validity_name() {
        let mut config = sample_config();
        config.share_asset_name = AssetName::validity_default();
        assert!(matches!(
            config.validate(),
            Err(VaultError::InvalidAssetName(_))
        ));
    }

    #[test]
    fn test_config_json_roundtrip_and_default_name() {
        let config = sample_config();
        let json = serde_json::to_string(&config).unwrap();
        let recovered = VaultConfig::from_json(&json).unwrap();
        assert_eq!(config, recovered);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value.as_object_mut().unwrap().remove("validity_token_name");
        let defaulted = VaultConfig::from_json(&value.to_string()).unwrap();
        assert_eq!(defaulted.validity_token_name, AssetName::validity_default());
    }
}
