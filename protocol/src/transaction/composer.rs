//! Renders a vault [`Transition`] into a balanced [`TxRequest`].
//!
//! The composer is where the abstract state change meets concrete outputs:
//! which UTxOs to consume, what to mint or burn, which scripts to attach and
//! what each new output holds. It performs no I/O. Everything it needs is in
//! the [`VaultConfig`] and the [`LedgerSnapshot`] it is handed, so the same
//! transition and snapshot always produce the same request.
//!
//! Per operation:
//!
//! | Operation | Consumes | Mints | Produces |
//! |-----------|----------|-------|----------|
//! | Mint | caller output holding the collectible | `+minted` shares, `+1` validity | vault output, caller change |
//! | Burn | vault output | `-minted` shares, `-1` validity | collectible to caller |
//! | Withdraw | vault output | | vault output, `amount` shares to caller |
//! | Deposit | vault output, caller share outputs | | vault output, caller change |

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::builder::{TxRequest, TxRequestBuilder};
use super::types::{Address, AssetBundle, InlineDatum, ScriptWitness, TxOutput, Utxo};
use crate::asset::Unit;
use crate::codec::PlutusData;
use crate::config::{
    ValidatorSource, VaultConfig, REDEEMER_BURN, REDEEMER_DEPOSIT, REDEEMER_MINT,
    REDEEMER_WITHDRAW, VALIDITY_TOKEN_QUANTITY,
};
use crate::error::VaultError;
use crate::vault::datum::VaultDatum;
use crate::vault::state_machine::{MintDeltas, Transition, VaultOperation, VaultState};

// ---------------------------------------------------------------------------
// Redeemers
// ---------------------------------------------------------------------------

/// Argument passed to the spending validator and the minting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultRedeemer {
    Mint,
    Burn,
    Withdraw,
    Deposit,
}

impl VaultRedeemer {
    pub fn for_operation(operation: &VaultOperation) -> Self {
        match operation {
            VaultOperation::Mint { .. } => VaultRedeemer::Mint,
            VaultOperation::Burn => VaultRedeemer::Burn,
            VaultOperation::Withdraw { .. } => VaultRedeemer::Withdraw,
            VaultOperation::Deposit { .. } => VaultRedeemer::Deposit,
        }
    }

    pub fn index(self) -> u64 {
        match self {
            VaultRedeemer::Mint => REDEEMER_MINT,
            VaultRedeemer::Burn => REDEEMER_BURN,
            VaultRedeemer::Withdraw => REDEEMER_WITHDRAW,
            VaultRedeemer::Deposit => REDEEMER_DEPOSIT,
        }
    }

    /// `Constr index []`.
    pub fn to_plutus_data(self) -> PlutusData {
        PlutusData::constr(self.index(), Vec::new())
    }

    pub fn from_plutus_data(data: &PlutusData) -> Option<Self> {
        match data {
            PlutusData::Constr {
                alternative,
                fields,
            } if fields.is_empty() => match *alternative {
                REDEEMER_MINT => Some(VaultRedeemer::Mint),
                REDEEMER_BURN => Some(VaultRedeemer::Burn),
                REDEEMER_WITHDRAW => Some(VaultRedeemer::Withdraw),
                REDEEMER_DEPOSIT => Some(VaultRedeemer::Deposit),
                _ => None,
            },
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerSnapshot
// ---------------------------------------------------------------------------

/// The slice of ledger state a transition is composed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// The genuine vault output, when a vault is live.
    pub vault_output: Option<Utxo>,
    /// Where payouts and change go.
    pub caller_address: Address,
    /// Outputs the caller can spend.
    pub caller_outputs: Vec<Utxo>,
}

impl LedgerSnapshot {
    /// Total quantity of `unit` across the caller's outputs.
    pub fn caller_holdings(&self, unit: &Unit) -> u64 {
        self.caller_outputs
            .iter()
            .map(|u| u.assets.quantity_of(unit))
            .fold(0u64, u64::saturating_add)
    }
}

// ---------------------------------------------------------------------------
// TransactionComposer
// ---------------------------------------------------------------------------

/// Builds transaction requests for one vault instance.
#[derive(Debug, Clone)]
pub struct TransactionComposer<'a> {
    config: &'a VaultConfig,
}

impl<'a> TransactionComposer<'a> {
    pub fn new(config: &'a VaultConfig) -> Self {
        Self { config }
    }

    /// Composes the request that performs `transition`.
    ///
    /// # Errors
    ///
    /// Caller-input errors (`CollectibleNotFound`, `NoShareHoldings`,
    /// `VaultNotFound`, `MalformedAuthority`) when the snapshot cannot
    /// support the transition, and `Unbalanced` if the result would not
    /// conserve assets.
    pub fn compose(
        &self,
        transition: &Transition,
        snapshot: &LedgerSnapshot,
    ) -> Result<TxRequest, VaultError> {
        let redeemer = VaultRedeemer::for_operation(&transition.operation);
        let request = match (&transition.operation, &transition.from, &transition.to) {
            (VaultOperation::Mint { .. }, VaultState::NoVault, VaultState::Active(next)) => {
                self.compose_mint(next, transition.mint_deltas, snapshot, redeemer)?
            }
            (VaultOperation::Burn, VaultState::Active(current), VaultState::Closed) => {
                self.compose_burn(current, transition.mint_deltas, snapshot, redeemer)?
            }
            (
                VaultOperation::Withdraw { amount },
                VaultState::Active(current),
                VaultState::Active(next),
            ) => self.compose_withdraw(current, next, *amount, snapshot, redeemer)?,
            (
                VaultOperation::Deposit { amount },
                VaultState::Active(current),
                VaultState::Active(next),
            ) => self.compose_deposit(current, next, *amount, snapshot, redeemer)?,
            (operation, from, _) => {
                return Err(VaultError::InvalidState {
                    state: from.name().to_string(),
                    operation: operation.name().to_string(),
                })
            }
        };

        debug!(
            operation = transition.operation.name(),
            inputs = request.inputs.len(),
            outputs = request.outputs.len(),
            mints = request.mints.len(),
            "composed transaction request"
        );
        Ok(request)
    }

    // -----------------------------------------------------------------------
    // Per-operation composition
    // -----------------------------------------------------------------------

    fn compose_mint(
        &self,
        next: &VaultDatum,
        deltas: MintDeltas,
        snapshot: &LedgerSnapshot,
        redeemer: VaultRedeemer,
    ) -> Result<TxRequest, VaultError> {
        self.check_authority(next)?;

        let collectible = next.collectible_unit();
        let source = snapshot
            .caller_outputs
            .iter()
            .find(|u| u.assets.quantity_of(&collectible) >= 1)
            .ok_or_else(|| VaultError::CollectibleNotFound(collectible.clone()))?;

        let share = next.share_unit();
        let validity = next.validity_unit(&self.config.validity_token_name);

        let mut locked = AssetBundle::new();
        locked.add(&share, next.minted_supply)?;
        locked.add(&validity, VALIDITY_TOKEN_QUANTITY)?;
        locked.add(&collectible, 1)?;

        let mut change = source.assets.clone();
        change.subtract(&collectible, 1)?;

        let builder = TxRequestBuilder::new()
            .collect(source.clone())
            .mint(share, deltas.shares)
            .mint(validity, deltas.validity)
            .mint_redeemer(redeemer.to_plutus_data())
            .attach(ScriptWitness::Native {
                script: self.config.minting_authority.clone(),
            })
            .require_signers(self.config.minting_authority.required_signers())
            .pay_to(self.vault_output(locked, next)?);

        with_change(builder, &snapshot.caller_address, change).build()
    }

    fn compose_burn(
        &self,
        current: &VaultDatum,
        deltas: MintDeltas,
        snapshot: &LedgerSnapshot,
        redeemer: VaultRedeemer,
    ) -> Result<TxRequest, VaultError> {
        self.check_authority(current)?;
        let vault = self.vault_input(current, snapshot)?;

        let share = current.share_unit();
        let validity = current.validity_unit(&self.config.validity_token_name);
        let held_shares = vault.assets.quantity_of(&share);

        // Everything but the burned tokens goes back to the caller.
        let mut released = vault.assets.clone();
        released.subtract(&share, held_shares)?;
        released.subtract(&validity, VALIDITY_TOKEN_QUANTITY)?;

        let builder = self
            .spend_vault(TxRequestBuilder::new(), vault, redeemer)
            .mint(share, deltas.shares)
            .mint(validity, deltas.validity)
            .mint_redeemer(redeemer.to_plutus_data())
            .attach(ScriptWitness::Native {
                script: self.config.minting_authority.clone(),
            })
            .require_signers(self.config.minting_authority.required_signers());

        with_change(builder, &snapshot.caller_address, released).build()
    }

    fn compose_withdraw(
        &self,
        current: &VaultDatum,
        next: &VaultDatum,
        amount: u64,
        snapshot: &LedgerSnapshot,
        redeemer: VaultRedeemer,
    ) -> Result<TxRequest, VaultError> {
        let vault = self.vault_input(current, snapshot)?;
        let share = current.share_unit();

        let mut relocked = vault.assets.clone();
        relocked.subtract(&share, amount)?;

        let mut payout = AssetBundle::new();
        payout.add(&share, amount)?;

        self.spend_vault(TxRequestBuilder::new(), vault, redeemer)
            .pay_to(self.vault_output(relocked, next)?)
            .pay_to(TxOutput::payment(snapshot.caller_address.clone(), payout))
            .build()
    }

    fn compose_deposit(
        &self,
        current: &VaultDatum,
        next: &VaultDatum,
        amount: u64,
        snapshot: &LedgerSnapshot,
        redeemer: VaultRedeemer,
    ) -> Result<TxRequest, VaultError> {
        let vault = self.vault_input(current, snapshot)?;
        let share = current.share_unit();

        let selected = select_share_outputs(&snapshot.caller_outputs, &share, amount)?;

        let mut relocked = vault.assets.clone();
        relocked.add(&share, amount)?;

        let mut change = AssetBundle::new();
        for utxo in &selected {
            change.merge(&utxo.assets)?;
        }
        change.subtract(&share, amount)?;

        let mut builder = self.spend_vault(TxRequestBuilder::new(), vault, redeemer);
        for utxo in selected {
            builder = builder.collect(utxo.clone());
        }
        let builder = builder.pay_to(self.vault_output(relocked, next)?);

        with_change(builder, &snapshot.caller_address, change).build()
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// The configured authority must be the one the datum's shares were
    /// minted under, or the ledger would reject the mint or burn.
    fn check_authority(&self, datum: &VaultDatum) -> Result<(), VaultError> {
        let policy_id = self.config.minting_authority.policy_id()?;
        if policy_id != datum.share_policy_id {
            return Err(VaultError::MalformedAuthority(format!(
                "authority hashes to {}, vault shares use {}",
                policy_id, datum.share_policy_id
            )));
        }
        Ok(())
    }

    /// The live vault output. It must carry the validity token, and its
    /// share and collectible holdings must agree with the datum.
    fn vault_input<'s>(
        &self,
        datum: &VaultDatum,
        snapshot: &'s LedgerSnapshot,
    ) -> Result<&'s Utxo, VaultError> {
        let validity = datum.validity_unit(&self.config.validity_token_name);
        let vault = snapshot
            .vault_output
            .as_ref()
            .filter(|u| u.assets.quantity_of(&validity) == VALIDITY_TOKEN_QUANTITY)
            .ok_or_else(|| VaultError::VaultNotFound(self.config.vault_address.clone()))?;

        let expected = [
            (datum.share_unit(), datum.remaining_supply),
            (datum.collectible_unit(), 1),
        ];
        for (unit, recorded) in expected {
            let held = vault.assets.quantity_of(&unit);
            if held != recorded {
                return Err(VaultError::HoldingsMismatch {
                    unit,
                    recorded,
                    held,
                });
            }
        }
        Ok(vault)
    }

    fn spend_vault(
        &self,
        builder: TxRequestBuilder,
        vault: &Utxo,
        redeemer: VaultRedeemer,
    ) -> TxRequestBuilder {
        let builder = builder.spend(vault.clone(), redeemer.to_plutus_data());
        match &self.config.spending_validator {
            ValidatorSource::Attached { script } => builder.attach(ScriptWitness::Plutus {
                script: script.clone(),
            }),
            ValidatorSource::Reference { output_ref } => builder.read_from(*output_ref),
        }
    }

    fn vault_output(&self, assets: AssetBundle, datum: &VaultDatum) -> Result<TxOutput, VaultError> {
        Ok(TxOutput {
            address: self.config.vault_address.clone(),
            assets,
            datum: Some(InlineDatum::new(datum.encode()?)),
        })
    }
}

/// Pays `change` back to the caller unless there is nothing to pay.
fn with_change(builder: TxRequestBuilder, caller: &Address, change: AssetBundle) -> TxRequestBuilder {
    if change.is_empty() {
        builder
    } else {
        builder.pay_to(TxOutput::payment(caller.clone(), change))
    }
}

/// Picks caller outputs covering `amount` of `unit`.
///
/// The smallest single output that covers the amount wins. Failing that,
/// outputs are taken largest-first until the amount is reached.
pub fn select_share_outputs<'u>(
    outputs: &'u [Utxo],
    unit: &Unit,
    amount: u64,
) -> Result<Vec<&'u Utxo>, VaultError> {
    let mut holding: Vec<&Utxo> = outputs
        .iter()
        .filter(|u| u.assets.quantity_of(unit) > 0)
        .collect();

    let held = holding
        .iter()
        .map(|u| u.assets.quantity_of(unit))
        .fold(0u64, u64::saturating_add);
    if held < amount {
        return Err(VaultError::NoShareHoldings {
            unit: unit.clone(),
            required: amount,
            held,
        });
    }

    if let Some(single) = holding
        .iter()
        .filter(|u| u.assets.quantity_of(unit) >= amount)
        .min_by_key(|u| (u.assets.quantity_of(unit), u.output_ref))
    {
        return Ok(vec![*single]);
    }

    holding.sort_by(|a, b| {
        b.assets
            .quantity_of(unit)
            .cmp(&a.assets.quantity_of(unit))
            .then(a.output_ref.cmp(&b.output_ref))
    });
    let mut selected = Vec::new();
    let mut covered = 0u64;
    for utxo in holding {
        if covered >= amount {
            break;
        }
        covered = covered.saturating_add(utxo.assets.quantity_of(unit));
        selected.push(utxo);
    }
    Ok(selected)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
