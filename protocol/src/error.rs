//! Error types for vault operations.
//!
//! Every fallible operation in the crate returns a [`VaultError`]. The
//! variants fall into four groups:
//!
//! - **State errors**: `MalformedDatum`, `InvariantViolation`,
//!   `HoldingsMismatch`. The on-chain record cannot be trusted; never
//!   retried, never used as input.
//! - **Caller errors**: bad amounts, wrong state, missing holdings, bad
//!   identifiers. Recoverable by supplying different parameters.
//! - **Concurrency**: `StaleState`. Re-fetch and retry the whole operation.
//! - **Submission**: the ledger refused or did not answer. Surfaced as-is.
//!
//! Everything except `StaleState` and `Submission` is raised before any
//! side-effecting call.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::asset::Unit;
use crate::transaction::types::{Address, OutputRef};

/// Whether a failed submission may still land on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionFailure {
    /// The ledger refused the transaction. It was definitely not applied.
    Rejected,
    /// No definitive answer (timeout, dropped connection). The transaction
    /// may or may not be applied; check before retrying.
    Indeterminate,
}

impl fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "rejected"),
            Self::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// Errors that can occur while reading, transitioning or submitting a vault.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The datum bytes could not be decoded into a vault record.
    #[error("malformed datum: {0}")]
    MalformedDatum(String),

    /// The datum decoded but claims more shares locked than were minted.
    #[error("invariant violation: remaining supply {remaining} exceeds minted supply {minted}")]
    InvariantViolation {
        /// Decoded remaining supply.
        remaining: u64,
        /// Decoded minted supply.
        minted: u64,
    },

    /// The vault output's holdings disagree with its datum.
    #[error("vault holds {held} of {unit}, datum records {recorded}")]
    HoldingsMismatch {
        /// The asset whose quantity is off.
        unit: Unit,
        /// Quantity the datum implies.
        recorded: u64,
        /// Quantity actually on the output.
        held: u64,
    },

    /// Withdraw asked for more shares than the vault holds.
    #[error("insufficient remaining supply: requested {requested}, vault holds {remaining}")]
    InsufficientRemainingSupply {
        /// Amount the caller asked to withdraw.
        requested: u64,
        /// Shares currently locked in the vault.
        remaining: u64,
    },

    /// Deposit would push the vault above its minted supply.
    #[error(
        "deposit of {requested} exceeds minted supply: vault holds {remaining} of {minted}"
    )]
    ExceedsMintedSupply {
        /// Amount the caller asked to deposit.
        requested: u64,
        /// Shares currently locked in the vault.
        remaining: u64,
        /// Total shares ever minted.
        minted: u64,
    },

    /// Burn attempted while shares are still in circulation.
    #[error("cannot burn: {outstanding} shares are outstanding outside the vault")]
    OutstandingShares {
        /// Shares that must be deposited before burning.
        outstanding: u64,
    },

    /// The caller has no outputs holding enough shares to deposit.
    #[error("no share holdings: need {required} of {unit}, caller holds {held}")]
    NoShareHoldings {
        /// The share unit.
        unit: Unit,
        /// Amount the deposit requires.
        required: u64,
        /// Amount found at the caller's address.
        held: u64,
    },

    /// Supply amounts must be strictly positive.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The operation does not apply to the vault's current state.
    #[error("{operation} is not allowed in state {state}")]
    InvalidState {
        /// Name of the current state.
        state: String,
        /// Name of the attempted operation.
        operation: String,
    },

    /// A supply computation would overflow.
    #[error("supply overflow")]
    SupplyOverflow,

    /// An asset bundle was asked to give up more of a unit than it holds.
    #[error("insufficient {unit}: requested {requested}, held {held}")]
    InsufficientAssets {
        unit: Unit,
        requested: u64,
        held: u64,
    },

    /// A mint operation does not describe the vault this client is
    /// configured for.
    #[error("operation does not match vault configuration: {0}")]
    ConfigMismatch(String),

    /// The minting authority script cannot name a policy.
    #[error("malformed minting authority: {0}")]
    MalformedAuthority(String),

    /// An asset name is too long or not valid hex.
    #[error("invalid asset name: {0}")]
    InvalidAssetName(String),

    /// A policy id, key hash, unit, address or hash failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The caller does not hold the collectible being fractionalized.
    #[error("collectible {0} not found at the caller's address")]
    CollectibleNotFound(Unit),

    /// No genuine vault output (one carrying the validity token) exists.
    #[error("no vault output found at {0}")]
    VaultNotFound(Address),

    /// The vault output this request spends has already been consumed.
    #[error("stale state: output(s) already spent: {}", format_refs(.spent))]
    StaleState {
        /// Inputs the ledger reported as spent.
        spent: Vec<OutputRef>,
    },

    /// The ledger refused or failed to confirm the transaction.
    #[error("submission {kind}: {message}")]
    Submission {
        /// Whether the transaction may still have been applied.
        kind: SubmissionFailure,
        /// The ledger's own explanation, verbatim.
        message: String,
    },

    /// A composed request does not conserve an asset. Always a bug.
    #[error("unbalanced transaction for {unit}: consumed {consumed}, produced {produced}")]
    Unbalanced {
        /// The offending asset.
        unit: Unit,
        /// Inputs plus mints.
        consumed: i128,
        /// Outputs.
        produced: i128,
    },

    /// The ledger could not be queried.
    #[error("ledger query failed: {0}")]
    Ledger(String),

    /// A datum, redeemer or script could not be serialized.
    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl VaultError {
    /// `true` when re-fetching state and retrying the same operation can
    /// succeed without the caller changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VaultError::StaleState { .. })
    }

    /// `true` when the transaction is known not to have been applied.
    pub fn definitely_not_applied(&self) -> bool {
        !matches!(
            self,
            VaultError::Submission {
                kind: SubmissionFailure::Indeterminate,
                ..
            }
        )
    }
}

fn format_refs(refs: &[OutputRef]) -> String {
    refs.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::types::TxHash;

    #[test]
    fn only_stale_state_is_retryable() {
        let stale = VaultError::StaleState {
            spent: vec![OutputRef::new(TxHash::from_bytes([1u8; 32]), 0)],
        };
        assert!(stale.is_retryable());
        assert!(!VaultError::ZeroAmount.is_retryable());
        assert!(!VaultError::OutstandingShares { outstanding: 1 }.is_retryable());
    }

    #[test]
    fn indeterminate_submission_may_be_applied() {
        let timeout = VaultError::Submission {
            kind: SubmissionFailure::Indeterminate,
            message: "timeout".into(),
        };
        let rejected = VaultError::Submission {
            kind: SubmissionFailure::Rejected,
            message: "bad".into(),
        };
        assert!(!timeout.definitely_not_applied());
        assert!(rejected.definitely_not_applied());
    }

    #[test]
    fn stale_state_message_lists_outputs() {
        let err = VaultError::StaleState {
            spent: vec![
                OutputRef::new(TxHash::from_bytes([0xaa; 32]), 0),
                OutputRef::new(TxHash::from_bytes([0xbb; 32]), 3),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains(&format!("{}#0", "aa".repeat(32))));
        assert!(msg.contains(&format!("{}#3", "bb".repeat(32))));
    }
}
