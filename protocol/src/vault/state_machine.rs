//! The vault state machine.
//!
//! ```text
//!            Mint                 Burn
//! NoVault ────────► Active(d) ────────► Closed
//!                   │      ▲
//!                   └──────┘
//!              Withdraw / Deposit
//! ```
//!
//! [`apply`] is pure: it validates an operation against the current state
//! and returns the [`Transition`] to perform, or the reason it cannot be
//! performed. It never touches the ledger, so every precondition failure
//! surfaces before anything is built or submitted.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::datum::VaultDatum;
use crate::asset::{AssetName, NativeScript, Unit};
use crate::error::VaultError;

/// Lifecycle state of a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "datum", rename_all = "snake_case")]
pub enum VaultState {
    /// No vault exists yet.
    NoVault,
    /// A live vault with its current datum.
    Active(VaultDatum),
    /// The vault was burned. Terminal.
    Closed,
}

impl VaultState {
    pub fn name(&self) -> &'static str {
        match self {
            VaultState::NoVault => "NoVault",
            VaultState::Active(_) => "Active",
            VaultState::Closed => "Closed",
        }
    }

    pub fn datum(&self) -> Option<&VaultDatum> {
        match self {
            VaultState::Active(d) => Some(d),
            _ => None,
        }
    }

    /// Shorthand for [`apply`].
    pub fn apply(&self, operation: VaultOperation) -> Result<Transition, VaultError> {
        apply(self, operation)
    }
}

impl fmt::Display for VaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultState::Active(d) => write!(
                f,
                "Active(remaining {}/{})",
                d.remaining_supply, d.minted_supply
            ),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// An operation a caller asks the vault to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum VaultOperation {
    /// Lock `collectible` and mint `initial_supply` shares against it.
    ///
    /// The share and validity tokens share a policy, so their names must
    /// differ.
    Mint {
        authority: NativeScript,
        collectible: Unit,
        share_asset_name: AssetName,
        #[serde(default = "AssetName::validity_default")]
        validity_token_name: AssetName,
        initial_supply: u64,
    },
    /// Redeem the full supply and release the collectible.
    Burn,
    /// Take `amount` shares out of the vault.
    Withdraw { amount: u64 },
    /// Return `amount` shares to the vault.
    Deposit { amount: u64 },
}

impl VaultOperation {
    pub fn name(&self) -> &'static str {
        match self {
            VaultOperation::Mint { .. } => "Mint",
            VaultOperation::Burn => "Burn",
            VaultOperation::Withdraw { .. } => "Withdraw",
            VaultOperation::Deposit { .. } => "Deposit",
        }
    }
}

/// Net issuance a transition requires, in shares and validity tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintDeltas {
    pub shares: i128,
    pub validity: i128,
}

impl MintDeltas {
    pub fn is_zero(&self) -> bool {
        self.shares == 0 && self.validity == 0
    }
}

/// A validated state change, ready to be composed into a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub operation: VaultOperation,
    pub from: VaultState,
    pub to: VaultState,
    pub mint_deltas: MintDeltas,
}

/// Validates `operation` against `state` and computes the next state.
pub fn apply(state: &VaultState, operation: VaultOperation) -> Result<Transition, VaultError> {
    let (to, mint_deltas) = match (state, &operation) {
        (
            VaultState::NoVault,
            VaultOperation::Mint {
                authority,
                collectible,
                share_asset_name,
                validity_token_name,
                initial_supply,
            },
        ) => {
            if *initial_supply == 0 {
                return Err(VaultError::ZeroAmount);
            }
            if share_asset_name == validity_token_name {
                return Err(VaultError::InvalidAssetName(format!(
                    "share name {} collides with the validity token name",
                    share_asset_name
                )));
            }
            let share_policy_id = authority.policy_id()?;
            let datum = VaultDatum::new(
                share_policy_id,
                share_asset_name.clone(),
                collectible,
                *initial_supply,
            );
            let deltas = MintDeltas {
                shares: i128::from(*initial_supply),
                validity: 1,
            };
            (VaultState::Active(datum), deltas)
        }

        (VaultState::Active(datum), VaultOperation::Burn) => {
            datum.validate()?;
            if datum.remaining_supply != datum.minted_supply {
                return Err(VaultError::OutstandingShares {
                    outstanding: datum.outstanding(),
                });
            }
            let deltas = MintDeltas {
                shares: -i128::from(datum.minted_supply),
                validity: -1,
            };
            (VaultState::Closed, deltas)
        }

        (VaultState::Active(datum), VaultOperation::Withdraw { amount }) => {
            datum.validate()?;
            if *amount == 0 {
                return Err(VaultError::ZeroAmount);
            }
            if *amount > datum.remaining_supply {
                return Err(VaultError::InsufficientRemainingSupply {
                    requested: *amount,
                    remaining: datum.remaining_supply,
                });
            }
            let remaining = datum
                .remaining_supply
                .checked_sub(*amount)
                .ok_or(VaultError::SupplyOverflow)?;
            (
                VaultState::Active(datum.with_remaining(remaining)?),
                MintDeltas::default(),
            )
        }

        (VaultState::Active(datum), VaultOperation::Deposit { amount }) => {
            datum.validate()?;
            if *amount == 0 {
                return Err(VaultError::ZeroAmount);
            }
            let remaining = datum
                .remaining_supply
                .checked_add(*amount)
                .ok_or(VaultError::SupplyOverflow)?;
            if remaining > datum.minted_supply {
                return Err(VaultError::ExceedsMintedSupply {
                    requested: *amount,
                    remaining: datum.remaining_supply,
                    minted: datum.minted_supply,
                });
            }
            (
                VaultState::Active(datum.with_remaining(remaining)?),
                MintDeltas::default(),
            )
        }

        (state, operation) => {
            return Err(VaultError::InvalidState {
                state: state.name().to_string(),
                operation: operation.name().to_string(),
            })
        }
    };

    Ok(Transition {
        operation,
        from: state.clone(),
        to,
        mint_deltas,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
