//! Transaction requests and the builder that assembles them.
//!
//! A [`TxRequest`] is everything the wallet collaborator needs to produce a
//! ledger transaction: what to spend, what to mint or burn, which scripts
//! and signers are involved, and what to pay where. It is not a serialized
//! transaction body; fees, base-currency balancing and signing happen on
//! the other side of [`crate::ledger::Ledger::submit`].
//!
//! [`TxRequestBuilder`] refuses to produce a request that does not conserve
//! every native asset it touches.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::types::{OutputRef, ScriptWitness, TxInput, TxOutput, Utxo};
use crate::asset::{KeyHash, Unit};
use crate::codec::PlutusData;
use crate::error::VaultError;

// ---------------------------------------------------------------------------
// TxRequest
// ---------------------------------------------------------------------------

/// An atomic, all-or-nothing transaction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    /// Outputs to consume. Script-locked inputs carry their redeemer.
    pub inputs: Vec<TxInput>,

    /// Outputs read but not consumed (validators supplied by reference).
    pub reference_inputs: Vec<OutputRef>,

    /// Net issuance per unit. Positive mints, negative burns. Never zero.
    pub mints: BTreeMap<Unit, i128>,

    /// Redeemer passed to the minting policy, when anything is minted.
    pub mint_redeemer: Option<PlutusData>,

    /// Scripts attached to the transaction body.
    pub scripts: Vec<ScriptWitness>,

    /// Outputs to create, in order.
    pub outputs: Vec<TxOutput>,

    /// Key hashes whose signatures the transaction must carry.
    pub required_signers: Vec<KeyHash>,
}

impl TxRequest {
    /// References of every consumed input, in request order.
    pub fn input_refs(&self) -> Vec<OutputRef> {
        self.inputs.iter().map(|i| i.utxo.output_ref).collect()
    }

    /// Checks that for every native asset `Σinputs + Σmints == Σoutputs`.
    ///
    /// Base currency is excluded: fees and minimum deposits are settled by
    /// the wallet collaborator.
    pub fn check_balanced(&self) -> Result<(), VaultError> {
        let mut consumed: BTreeMap<&Unit, i128> = BTreeMap::new();
        let mut produced: BTreeMap<&Unit, i128> = BTreeMap::new();

        for input in &self.inputs {
            for (unit, quantity) in input.utxo.assets.assets() {
                *consumed.entry(unit).or_insert(0) += i128::from(quantity);
            }
        }
        for (unit, delta) in &self.mints {
            *consumed.entry(unit).or_insert(0) += *delta;
        }
        for output in &self.outputs {
            for (unit, quantity) in output.assets.assets() {
                *produced.entry(unit).or_insert(0) += i128::from(quantity);
            }
        }

        let units: BTreeSet<&Unit> = consumed.keys().chain(produced.keys()).copied().collect();
        for unit in units {
            let c = consumed.get(unit).copied().unwrap_or(0);
            let p = produced.get(unit).copied().unwrap_or(0);
            if c != p {
                return Err(VaultError::Unbalanced {
                    unit: unit.clone(),
                    consumed: c,
                    produced: p,
                });
            }
        }
        Ok(())
    }

    /// Canonical bytes used for hashing and signing the request.
    ///
    /// JSON is stable here: every map in the request is a `BTreeMap`.
    pub fn signable_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

// ---------------------------------------------------------------------------
// TxRequestBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`TxRequest`].
///
/// ```rust,no_run
/// use fnft_protocol::transaction::TxRequestBuilder;
/// # fn demo(vault: fnft_protocol::transaction::types::Utxo,
/// #         out: fnft_protocol::transaction::types::TxOutput,
/// #         redeemer: fnft_protocol::codec::PlutusData) {
/// let request = TxRequestBuilder::new()
///     .spend(vault, redeemer)
///     .pay_to(out)
///     .build();
/// # }
/// ```
#[derive(Debug, Default)]
pub struct TxRequestBuilder {
    inputs: Vec<TxInput>,
    reference_inputs: Vec<OutputRef>,
    mints: BTreeMap<Unit, i128>,
    mint_redeemer: Option<PlutusData>,
    scripts: Vec<ScriptWitness>,
    outputs: Vec<TxOutput>,
    required_signers: Vec<KeyHash>,
}

impl TxRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a script-locked output, passing `redeemer` to its validator.
    pub fn spend(mut self, utxo: Utxo, redeemer: PlutusData) -> Self {
        self.inputs.push(TxInput {
            utxo,
            redeemer: Some(redeemer),
        });
        self
    }

    /// Consumes a key-locked output owned by the caller.
    pub fn collect(mut self, utxo: Utxo) -> Self {
        self.inputs.push(TxInput {
            utxo,
            redeemer: None,
        });
        self
    }

    /// Reads an output without consuming it.
    pub fn read_from(mut self, output_ref: OutputRef) -> Self {
        if !self.reference_inputs.contains(&output_ref) {
            self.reference_inputs.push(output_ref);
        }
        self
    }

    /// Adds `delta` to the net issuance of `unit`. Deltas that cancel out
    /// leave no entry behind.
    pub fn mint(mut self, unit: Unit, delta: i128) -> Self {
        let net = self.mints.get(&unit).copied().unwrap_or(0) + delta;
        if net == 0 {
            self.mints.remove(&unit);
        } else {
            self.mints.insert(unit, net);
        }
        self
    }

    pub fn mint_redeemer(mut self, redeemer: PlutusData) -> Self {
        self.mint_redeemer = Some(redeemer);
        self
    }

    /// Attaches a script. Attaching the same script twice is a no-op.
    pub fn attach(mut self, script: ScriptWitness) -> Self {
        if !self.scripts.contains(&script) {
            self.scripts.push(script);
        }
        self
    }

    pub fn pay_to(mut self, output: TxOutput) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn require_signers(mut self, signers: impl IntoIterator<Item = KeyHash>) -> Self {
        for signer in signers {
            if !self.required_signers.contains(&signer) {
                self.required_signers.push(signer);
            }
        }
        self
    }

    /// Consumes the builder, refusing requests that do not conserve assets.
    pub fn build(self) -> Result<TxRequest, VaultError> {
        let request = TxRequest {
            inputs: self.inputs,
            reference_inputs: self.reference_inputs,
            mints: self.mints,
            mint_redeemer: self.mint_redeemer,
            scripts: self.scripts,
            outputs: self.outputs,
            required_signers: self.required_signers,
        };
        request.check_balanced()?;
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetName, PolicyId};
    use crate::transaction::types::{Address, AssetBundle, TxHash};

    fn share() -> Unit {
        Unit::new(
            PolicyId::from_bytes([0x11; 28]),
            AssetName::from_label("share").unwrap(),
        )
    }

    fn utxo(index: u32, assets: AssetBundle) -> Utxo {
        Utxo {
            output_ref: OutputRef::new(TxHash::from_bytes([0x22; 32]), index),
            address: Address::new("addr_test1caller"),
            assets,
            datum: None,
        }
    }

    #[test]
    fn transfer_without_mint_is_balanced() {
        let request = TxRequestBuilder::new()
            .collect(utxo(0, AssetBundle::with_lovelace(5).with(&share(), 10)))
            .pay_to(TxOutput::payment(
                Address::new("addr_test1a"),
                AssetBundle::new().with(&share(), 4),
            ))
            .pay_to(TxOutput::payment(
                Address::new("addr_test1b"),
                AssetBundle::new().with(&share(), 6),
            ))
            .build()
            .unwrap();
        assert_eq!(request.input_refs().len(), 1);
    }

    #[test]
    fn minted_assets_must_be_paid_out() {
        let err = TxRequestBuilder::new()
            .mint(share(), 100)
            .pay_to(TxOutput::payment(
                Address::new("addr_test1a"),
                AssetBundle::new().with(&share(), 99),
            ))
            .build()
            .unwrap_err();
        match err {
            VaultError::Unbalanced {
                consumed, produced, ..
            } => {
                assert_eq!(consumed, 100);
                assert_eq!(produced, 99);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn burn_consumes_without_output() {
        let request = TxRequestBuilder::new()
            .collect(utxo(1, AssetBundle::new().with(&share(), 7)))
            .mint(share(), -7)
            .build()
            .unwrap();
        assert_eq!(request.mints.get(&share()), Some(&-7));
        assert!(request.outputs.is_empty());
    }

    #[test]
    fn cancelling_mints_leave_no_entry() {
        let request = TxRequestBuilder::new()
            .mint(share(), 5)
            .mint(share(), -5)
            .build()
            .unwrap();
        assert!(request.mints.is_empty());
    }

    #[test]
    fn lovelace_is_not_part_of_the_balance() {
        TxRequestBuilder::new()
            .collect(utxo(0, AssetBundle::with_lovelace(10_000_000)))
            .pay_to(TxOutput::payment(
                Address::new("addr_test1a"),
                AssetBundle::with_lovelace(1),
            ))
            .build()
            .unwrap();
    }

    #[test]
    fn signers_and_references_are_deduplicated() {
        let signer = KeyHash::from_bytes([9; 28]);
        let reference = OutputRef::new(TxHash::from_bytes([3; 32]), 0);
        let request = TxRequestBuilder::new()
            .require_signers([signer, signer])
            .read_from(reference)
            .read_from(reference)
            .build()
            .unwrap();
        assert_eq!(request.required_signers, vec![signer]);
        assert_eq!(request.reference_inputs, vec![reference]);
    }

    #[test]
    fn signable_bytes_are_deterministic() {
        let build = || {
            TxRequestBuilder::new()
                .mint(share(), 1)
                .pay_to(TxOutput::payment(
                    Address::new("addr_test1a"),
                    AssetBundle::new().with(&share(), 1),
                ))
                .build()
                .unwrap()
        };
        assert_eq!(
            build().signable_bytes().unwrap(),
            build().signable_bytes().unwrap()
        );
    }
}
