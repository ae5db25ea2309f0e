//! In-process ledger over a plain UTxO set.
//!
//! Plays both collaborator roles at once: it is the wallet (it holds
//! signing keys and witnesses every request with all of them) and the
//! chain (it verifies the witnesses, checks the request and applies it).
//! The checks are the ones a vault operation can actually trip over:
//!
//! 1. every witness signature verifies over the request body;
//! 2. every input still exists and matches what the request claims;
//! 3. native assets are conserved, and no base currency is created;
//! 4. every required signer has a valid witness;
//! 5. every minted policy has its native script attached and satisfied
//!    by the witnessed keys;
//! 6. script-locked inputs have a validator, attached or referenced.
//!
//! Accepted requests are applied atomically under a single write lock.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use async_trait::async_trait;

use super::{Ledger, LedgerError};
use crate::asset::{KeyHash, NativeScript, Unit};
use crate::crypto::hash::blake2b_256;
use crate::crypto::keys::{verify_with_public_key, WalletKeypair, WalletSignature};
use crate::transaction::builder::TxRequest;
use crate::transaction::types::{
    Address, AssetBundle, InlineDatum, OutputRef, ScriptWitness, TxHash, Utxo,
};

/// Domain prefix for hashes of outputs created out of thin air.
const GENESIS_DOMAIN: &[u8] = b"fnft-ledger-genesis";

#[derive(Debug, Default)]
struct LedgerState {
    utxos: BTreeMap<OutputRef, Utxo>,
    sequence: u64,
    slot: u64,
    history: Vec<TxHash>,
    injected_failure: Option<LedgerError>,
}

/// A public key and its signature over a request body.
#[derive(Debug, Clone)]
pub struct VkeyWitness {
    pub public_key: [u8; 32],
    pub signature: WalletSignature,
}

impl VkeyWitness {
    pub fn key_hash(&self) -> KeyHash {
        KeyHash::from_public_key(&self.public_key)
    }
}

/// A self-contained ledger with its own wallet.
pub struct InMemoryLedger {
    wallet: WalletKeypair,
    cosigners: Vec<WalletKeypair>,
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(wallet: WalletKeypair) -> Self {
        Self {
            wallet,
            cosigners: Vec::new(),
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Adds a key the wallet also witnesses with, for multi-signature
    /// authorities.
    pub fn with_cosigner(mut self, key: WalletKeypair) -> Self {
        self.cosigners.push(key);
        self
    }

    /// Key hash of the wallet's primary key.
    pub fn wallet_key_hash(&self) -> KeyHash {
        self.wallet.key_hash()
    }

    /// Witnesses `body` with every key the wallet holds.
    pub fn witness(&self, body: &[u8]) -> Vec<VkeyWitness> {
        std::iter::once(&self.wallet)
            .chain(&self.cosigners)
            .map(|key| VkeyWitness {
                public_key: key.public_key_bytes(),
                signature: key.sign(body),
            })
            .collect()
    }

    /// Creates an output at `address` without a transaction. For seeding.
    pub fn fund(&self, address: &Address, assets: AssetBundle) -> OutputRef {
        self.fund_with_datum(address, assets, None)
    }

    /// Creates an output carrying an inline datum. Lets tests place forged
    /// or malformed vault outputs on the ledger.
    pub fn fund_with_datum(
        &self,
        address: &Address,
        assets: AssetBundle,
        datum: Option<InlineDatum>,
    ) -> OutputRef {
        let mut state = self.state.write();
        state.sequence += 1;
        let mut preimage = GENESIS_DOMAIN.to_vec();
        preimage.extend_from_slice(&state.sequence.to_be_bytes());
        let output_ref = OutputRef::new(TxHash::from_bytes(blake2b_256(&preimage)), 0);
        state.utxos.insert(
            output_ref,
            Utxo {
                output_ref,
                address: address.clone(),
                assets,
                datum,
            },
        );
        debug!(output = %output_ref, address = %address, "funded output");
        output_ref
    }

    pub fn utxo(&self, output_ref: &OutputRef) -> Option<Utxo> {
        self.state.read().utxos.get(output_ref).cloned()
    }

    /// Total quantity of `unit` held across all outputs at `address`.
    pub fn balance_of(&self, address: &Address, unit: &Unit) -> u64 {
        self.state
            .read()
            .utxos
            .values()
            .filter(|u| &u.address == address)
            .map(|u| u.assets.quantity_of(unit))
            .sum()
    }

    /// Hashes of accepted transactions, oldest first.
    pub fn history(&self) -> Vec<TxHash> {
        self.state.read().history.clone()
    }

    /// Sets the current slot, used to evaluate time-locked scripts.
    pub fn set_slot(&self, slot: u64) {
        self.state.write().slot = slot;
    }

    /// Makes the next submission fail with `error` without being applied.
    pub fn fail_next_submission(&self, error: LedgerError) {
        self.state.write().injected_failure = Some(error);
    }

    /// Chain side of submission: verifies `witnesses` over the request
    /// body, checks the request and applies it.
    pub fn submit_witnessed(
        &self,
        request: &TxRequest,
        witnesses: &[VkeyWitness],
    ) -> Result<TxHash, LedgerError> {
        let body = request
            .signable_bytes()
            .map_err(|e| LedgerError::Rejected(format!("request serialization: {}", e)))?;

        let mut signers = Vec::with_capacity(witnesses.len());
        for witness in witnesses {
            if !verify_with_public_key(&witness.public_key, &body, &witness.signature) {
                warn!(signer = %witness.key_hash(), "witness does not verify");
                return Err(LedgerError::Rejected(format!(
                    "invalid witness from {}",
                    witness.key_hash()
                )));
            }
            signers.push(witness.key_hash());
        }

        let mut state = self.state.write();

        if let Some(error) = state.injected_failure.take() {
            warn!(error = %error, "injected submission failure");
            return Err(error);
        }

        if let Err(e) = Self::check(&state, request, &signers) {
            warn!(error = %e, "request refused");
            return Err(e);
        }

        state.sequence += 1;
        let mut preimage = body;
        preimage.extend_from_slice(&state.sequence.to_be_bytes());
        let tx_hash = TxHash::from_bytes(blake2b_256(&preimage));

        for input in &request.inputs {
            state.utxos.remove(&input.utxo.output_ref);
        }
        for (index, output) in request.outputs.iter().enumerate() {
            let output_ref = OutputRef::new(tx_hash, index as u32);
            state.utxos.insert(
                output_ref,
                Utxo {
                    output_ref,
                    address: output.address.clone(),
                    assets: output.assets.clone(),
                    datum: output.datum.clone(),
                },
            );
        }
        state.history.push(tx_hash);

        info!(
            tx_hash = %tx_hash,
            inputs = request.inputs.len(),
            outputs = request.outputs.len(),
            mints = request.mints.len(),
            witnesses = witnesses.len(),
            "transaction applied"
        );
        Ok(tx_hash)
    }

    fn check(
        state: &LedgerState,
        request: &TxRequest,
        signers: &[KeyHash],
    ) -> Result<(), LedgerError> {
        let spent: Vec<OutputRef> = request
            .inputs
            .iter()
            .map(|i| i.utxo.output_ref)
            .filter(|r| !state.utxos.contains_key(r))
            .collect();
        if !spent.is_empty() {
            return Err(LedgerError::InputsSpent(spent));
        }

        for input in &request.inputs {
            if state.utxos.get(&input.utxo.output_ref) != Some(&input.utxo) {
                return Err(LedgerError::Rejected(format!(
                    "input {} does not match the ledger",
                    input.utxo.output_ref
                )));
            }
        }

        for reference in &request.reference_inputs {
            if !state.utxos.contains_key(reference) {
                return Err(LedgerError::Rejected(format!(
                    "reference input {} does not exist",
                    reference
                )));
            }
        }

        request
            .check_balanced()
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;

        let consumed: u128 = request
            .inputs
            .iter()
            .map(|i| u128::from(i.utxo.assets.lovelace))
            .sum();
        let produced: u128 = request
            .outputs
            .iter()
            .map(|o| u128::from(o.assets.lovelace))
            .sum();
        if produced > consumed {
            return Err(LedgerError::Rejected(format!(
                "outputs carry {} lovelace but inputs only {}",
                produced, consumed
            )));
        }

        for required in &request.required_signers {
            if !signers.contains(required) {
                return Err(LedgerError::Rejected(format!(
                    "missing signature from {}",
                    required
                )));
            }
        }

        let native: Vec<&NativeScript> = request
            .scripts
            .iter()
            .filter_map(|s| match s {
                ScriptWitness::Native { script } => Some(script),
                ScriptWitness::Plutus { .. } => None,
            })
            .collect();
        for unit in request.mints.keys() {
            let script = native
                .iter()
                .find(|s| s.policy_id().ok().as_ref() == Some(unit.policy_id()))
                .ok_or_else(|| {
                    LedgerError::Rejected(format!(
                        "no minting script attached for policy {}",
                        unit.policy_id()
                    ))
                })?;
            if !script.is_satisfied(signers, state.slot) {
                return Err(LedgerError::Rejected(format!(
                    "minting script for policy {} is not satisfied",
                    unit.policy_id()
                )));
            }
        }

        let spends_script = request.inputs.iter().any(|i| i.redeemer.is_some());
        let has_validator = request
            .scripts
            .iter()
            .any(|s| matches!(s, ScriptWitness::Plutus { .. }))
            || !request.reference_inputs.is_empty();
        if spends_script && !has_validator {
            return Err(LedgerError::Rejected(
                "script input spent without a validator".into(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn outputs_at(&self, address: &Address) -> Result<Vec<Utxo>, LedgerError> {
        Ok(self
            .state
            .read()
            .utxos
            .values()
            .filter(|u| &u.address == address)
            .cloned()
            .collect())
    }

    async fn submit(&self, request: &TxRequest) -> Result<TxHash, LedgerError> {
        let body = request
            .signable_bytes()
            .map_err(|e| LedgerError::Rejected(format!("request serialization: {}", e)))?;
        let witnesses = self.witness(&body);
        self.submit_witnessed(request, &witnesses)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
