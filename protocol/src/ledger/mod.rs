//! # Ledger Collaborator
//!
//! The vault core never talks to a chain directly. Everything it needs from
//! the outside world goes through the [`Ledger`] trait: read the outputs at
//! an address, and sign-and-submit a [`TxRequest`]. Those two calls are the
//! only suspension points of a vault operation.
//!
//! Implementations own key management, fee and base-currency balancing,
//! body serialization and confirmation tracking. [`InMemoryLedger`] is a
//! complete implementation over an in-process UTxO set, used by the tests
//! and the CLI simulator.

pub mod memory;

pub use memory::{InMemoryLedger, VkeyWitness};

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{SubmissionFailure, VaultError};
use crate::transaction::builder::TxRequest;
use crate::transaction::types::{Address, OutputRef, TxHash, Utxo};

/// Failures reported by a [`Ledger`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// One or more inputs of the request no longer exist.
    #[error("inputs already spent: {0:?}")]
    InputsSpent(Vec<OutputRef>),

    /// The request was refused. It was not applied.
    #[error("rejected: {0}")]
    Rejected(String),

    /// No definitive answer. The request may or may not have been applied.
    #[error("indeterminate: {0}")]
    Indeterminate(String),

    /// The ledger could not be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Maps a submission failure onto the vault error taxonomy.
    ///
    /// Spent inputs only mean a stale vault when one of them is in
    /// `vault_inputs`. A spent caller output is a plain rejection: the
    /// vault did not move.
    pub fn into_submission_error(self, vault_inputs: &[OutputRef]) -> VaultError {
        match self {
            LedgerError::InputsSpent(spent)
                if spent.iter().any(|r| vault_inputs.contains(r)) =>
            {
                VaultError::StaleState { spent }
            }
            LedgerError::InputsSpent(spent) => VaultError::Submission {
                kind: SubmissionFailure::Rejected,
                message: format!(
                    "caller input(s) already spent: {}",
                    spent
                        .iter()
                        .map(|r| r.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            },
            LedgerError::Rejected(message) => VaultError::Submission {
                kind: SubmissionFailure::Rejected,
                message,
            },
            LedgerError::Indeterminate(message) => VaultError::Submission {
                kind: SubmissionFailure::Indeterminate,
                message,
            },
            // Nothing was sent, so nothing can have been applied.
            LedgerError::Unavailable(message) => VaultError::Submission {
                kind: SubmissionFailure::Rejected,
                message,
            },
        }
    }

    /// Maps a query failure onto the vault error taxonomy.
    pub fn into_query_error(self) -> VaultError {
        VaultError::Ledger(self.to_string())
    }
}

/// Access to the ledger: output queries and transaction submission.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Unspent outputs currently sitting at `address`.
    async fn outputs_at(&self, address: &Address) -> Result<Vec<Utxo>, LedgerError>;

    /// Completes, signs and submits `request`. Returns once the ledger has
    /// accepted or refused it.
    async fn submit(&self, request: &TxRequest) -> Result<TxHash, LedgerError>;
}
