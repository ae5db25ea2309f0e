//! # Transaction Module
//!
//! Ledger-facing value types and the construction of transaction requests.
//!
//! ## Architecture
//!
//! ```text
//! types.rs     Addresses, output references, asset bundles, UTxOs, scripts
//! builder.rs   TxRequest and the fluent TxRequestBuilder
//! composer.rs  Vault transition -> balanced TxRequest
//! ```
//!
//! ## Design Decisions
//!
//! - A [`TxRequest`] is not a ledger transaction body. Fees, base-currency
//!   balancing and serialization belong to the wallet collaborator.
//! - Every native asset a request touches is conserved:
//!   `inputs + mints == outputs`. The builder refuses anything else.
//! - Quantities are `u64`; signed mint deltas are `i128` so a full burn of
//!   `u64::MAX` is still representable.

pub mod builder;
pub mod composer;
pub mod types;

pub use builder::{TxRequest, TxRequestBuilder};
pub use composer::{select_share_outputs, LedgerSnapshot, TransactionComposer, VaultRedeemer};
pub use types::{
    Address, AssetBundle, InlineDatum, OutputRef, PlutusScript, PlutusVersion, ScriptWitness,
    TxHash, TxInput, TxOutput, Utxo,
};
