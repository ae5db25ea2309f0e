// Copyright (c) 2026 FNFT Vault Contributors. MIT License.
// See LICENSE for details.

//! # FNFT Protocol: Core Library
//!
//! Fractionalized NFT vaults. A collectible is locked behind a spending
//! validator and a fungible supply of shares is minted against it. Shares
//! can be withdrawn from and deposited back into the vault; once every
//! share is back, the whole supply is burned and the collectible released.
//!
//! ## Architecture
//!
//! - **asset**: policy ids, asset names, units, native-script authorities.
//! - **codec**: the CBOR subset and Plutus structured data the ledger uses.
//! - **vault**: the vault datum, the state machine and the client.
//! - **transaction**: ledger value types, request builder, composer.
//! - **ledger**: the async collaborator trait and an in-memory ledger.
//! - **crypto**: BLAKE2b hashing and the Ed25519 wallet key.
//! - **config**: wire constants and per-vault configuration.
//! - **error**: the [`VaultError`] taxonomy.
//!
//! ## Flow
//!
//! ```text
//! Ledger::outputs_at ─► VaultState ─► apply(op) ─► Transition
//!                                                   │
//!        Ledger::submit ◄─ TxRequest ◄─ TransactionComposer
//! ```
//!
//! The state machine and the composer are pure. The only suspension points
//! are the two ledger calls.

pub mod asset;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod transaction;
pub mod vault;

pub use asset::{policy_id_of, unit, AssetName, KeyHash, NativeScript, PolicyId, Unit};
pub use config::VaultConfig;
pub use error::VaultError;
pub use ledger::{InMemoryLedger, Ledger, LedgerError};
pub use vault::{VaultClient, VaultDatum, VaultOperation, VaultState};
