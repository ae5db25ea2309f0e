//! # Vault Module
//!
//! The fractionalized vault itself: its on-chain record, the rules for
//! moving between states, and the client that drives operations against a
//! ledger.
//!
//! ## Architecture
//!
//! ```text
//! datum.rs          VaultDatum: canonical state record and its wire codec
//! state_machine.rs  NoVault -> Active -> Closed, pure transitions
//! client.rs         fetch -> transition -> compose -> submit
//! ```
//!
//! ## Invariants
//!
//! 1. `0 <= remaining_supply <= minted_supply`, checked on every decode
//!    and every transition.
//! 2. `minted_supply` is fixed at Mint.
//! 3. Exactly one output carries the validity token while a vault is live.
//!    Outputs at the vault address without it are ignored.
//! 4. Burn only when every share is back in the vault.

pub mod client;
pub mod datum;
pub mod state_machine;

pub use client::{OperationReceipt, PreparedOperation, VaultClient};
pub use datum::VaultDatum;
pub use state_machine::{apply, MintDeltas, Transition, VaultOperation, VaultState};
