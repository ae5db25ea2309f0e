//! Orchestration of vault operations against a [`Ledger`].
//!
//! A vault operation is: read the ledger, run the state machine, compose a
//! request, submit it. [`VaultClient`] strings those steps together and
//! maps collaborator failures onto [`VaultError`]. Preparation and
//! submission are separate calls, so a request can be built, inspected (or
//! dropped, at no cost) and submitted later.
//!
//! Nothing is retried automatically. A [`VaultError::StaleState`] means
//! another transaction consumed the vault output first; prepare again.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::asset::Unit;
use crate::config::{VaultConfig, VALIDITY_TOKEN_QUANTITY};
use crate::error::VaultError;
use crate::ledger::Ledger;
use crate::transaction::builder::TxRequest;
use crate::transaction::composer::{LedgerSnapshot, TransactionComposer};
use crate::transaction::types::{Address, OutputRef, TxHash, Utxo};
use crate::vault::datum::VaultDatum;
use crate::vault::state_machine::{apply, Transition, VaultOperation, VaultState};

/// A composed, not yet submitted, operation.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedOperation {
    pub transition: Transition,
    pub request: TxRequest,
}

/// Outcome of a submitted operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationReceipt {
    pub tx_hash: TxHash,
    pub operation: &'static str,
    /// State of the vault once the transaction is applied.
    pub state: VaultState,
    pub submitted_at: DateTime<Utc>,
}

/// Client for a single vault instance, acting for a single caller.
pub struct VaultClient<L: Ledger> {
    ledger: Arc<L>,
    config: VaultConfig,
    caller: Address,
}

impl<L: Ledger> VaultClient<L> {
    /// Creates a client. Fails if `config` could never describe a vault.
    pub fn new(ledger: Arc<L>, config: VaultConfig, caller: Address) -> Result<Self, VaultError> {
        config.validate()?;
        Ok(Self {
            ledger,
            config,
            caller,
        })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn caller(&self) -> &Address {
        &self.caller
    }

    /// Share unit of this vault, derived from the configured authority.
    pub fn share_unit(&self) -> Result<Unit, VaultError> {
        Ok(Unit::new(
            self.config.minting_authority.policy_id()?,
            self.config.share_asset_name.clone(),
        ))
    }

    /// Validity token unit of this vault.
    pub fn validity_unit(&self) -> Result<Unit, VaultError> {
        Ok(Unit::new(
            self.config.minting_authority.policy_id()?,
            self.config.validity_token_name.clone(),
        ))
    }

    /// Current state of the vault as recorded on the ledger.
    ///
    /// A vault that was burned leaves nothing behind, so it reads as
    /// [`VaultState::NoVault`].
    pub async fn fetch_state(&self) -> Result<VaultState, VaultError> {
        let (state, _) = self.fetch_vault().await?;
        Ok(state)
    }

    /// Reads the ledger and composes `operation` against it.
    pub async fn prepare(&self, operation: VaultOperation) -> Result<PreparedOperation, VaultError> {
        let (state, vault_output) = self.fetch_vault().await?;
        let caller_outputs = self
            .ledger
            .outputs_at(&self.caller)
            .await
            .map_err(|e| e.into_query_error())?;

        self.check_operation(&operation)?;
        let transition = apply(&state, operation)?;
        let snapshot = LedgerSnapshot {
            vault_output,
            caller_address: self.caller.clone(),
            caller_outputs,
        };
        let request = TransactionComposer::new(&self.config).compose(&transition, &snapshot)?;

        debug!(
            operation = transition.operation.name(),
            vault = %self.config.vault_address,
            from = %transition.from,
            to = %transition.to,
            "operation prepared"
        );
        Ok(PreparedOperation {
            transition,
            request,
        })
    }

    /// Submits a prepared operation.
    pub async fn submit(&self, prepared: PreparedOperation) -> Result<OperationReceipt, VaultError> {
        let operation = prepared.transition.operation.name();
        let vault_inputs: Vec<OutputRef> = prepared
            .request
            .inputs
            .iter()
            .filter(|i| i.utxo.address == self.config.vault_address)
            .map(|i| i.utxo.output_ref)
            .collect();
        match self.ledger.submit(&prepared.request).await {
            Ok(tx_hash) => {
                info!(
                    operation,
                    tx_hash = %tx_hash,
                    vault = %self.config.vault_address,
                    remaining = prepared.transition.to.datum().map(|d| d.remaining_supply),
                    "vault transition submitted"
                );
                Ok(OperationReceipt {
                    tx_hash,
                    operation,
                    state: prepared.transition.to,
                    submitted_at: Utc::now(),
                })
            }
            Err(e) => {
                let err = e.into_submission_error(&vault_inputs);
                warn!(operation, error = %err, "vault transition not applied");
                Err(err)
            }
        }
    }

    /// Prepares and submits in one step.
    pub async fn execute(&self, operation: VaultOperation) -> Result<OperationReceipt, VaultError> {
        let prepared = self.prepare(operation).await?;
        self.submit(prepared).await
    }

    /// Locks the configured collectible and mints `initial_supply` shares.
    pub async fn mint(&self, initial_supply: u64) -> Result<OperationReceipt, VaultError> {
        self.execute(VaultOperation::Mint {
            authority: self.config.minting_authority.clone(),
            collectible: self.config.collectible.clone(),
            share_asset_name: self.config.share_asset_name.clone(),
            validity_token_name: self.config.validity_token_name.clone(),
            initial_supply,
        })
        .await
    }

    pub async fn burn(&self) -> Result<OperationReceipt, VaultError> {
        self.execute(VaultOperation::Burn).await
    }

    pub async fn withdraw(&self, amount: u64) -> Result<OperationReceipt, VaultError> {
        self.execute(VaultOperation::Withdraw { amount }).await
    }

    pub async fn deposit(&self, amount: u64) -> Result<OperationReceipt, VaultError> {
        self.execute(VaultOperation::Deposit { amount }).await
    }

    /// A mint must describe the configured vault, or the client would
    /// later look for the vault under the wrong units.
    fn check_operation(&self, operation: &VaultOperation) -> Result<(), VaultError> {
        let VaultOperation::Mint {
            authority,
            collectible,
            share_asset_name,
            validity_token_name,
            ..
        } = operation
        else {
            return Ok(());
        };
        let mismatch = if *authority != self.config.minting_authority {
            Some("minting authority")
        } else if *collectible != self.config.collectible {
            Some("collectible")
        } else if *share_asset_name != self.config.share_asset_name {
            Some("share asset name")
        } else if *validity_token_name != self.config.validity_token_name {
            Some("validity token name")
        } else {
            None
        };
        match mismatch {
            Some(field) => Err(VaultError::ConfigMismatch(format!(
                "{} differs from the configured one",
                field
            ))),
            None => Ok(()),
        }
    }

    /// Finds the genuine vault output and decodes its datum.
    ///
    /// Outputs at the vault address without exactly one validity token are
    /// ignored: anyone can pay to a script address, only the authority can
    /// mint the token.
    async fn fetch_vault(&self) -> Result<(VaultState, Option<Utxo>), VaultError> {
        let validity = self.validity_unit()?;
        let outputs = self
            .ledger
            .outputs_at(&self.config.vault_address)
            .await
            .map_err(|e| e.into_query_error())?;

        let total = outputs.len();
        let mut genuine: Vec<Utxo> = outputs
            .into_iter()
            .filter(|u| u.assets.quantity_of(&validity) == VALIDITY_TOKEN_QUANTITY)
            .collect();
        if genuine.len() < total {
            debug!(
                ignored = total - genuine.len(),
                vault = %self.config.vault_address,
                "ignoring outputs without the validity token"
            );
        }

        genuine.sort_by_key(|u| u.output_ref);
        if genuine.len() > 1 {
            warn!(
                count = genuine.len(),
                vault = %self.config.vault_address,
                using = %genuine[0].output_ref,
                "several outputs carry the validity token"
            );
        }
        let Some(vault) = genuine.into_iter().next() else {
            return Ok((VaultState::NoVault, None));
        };

        let datum_bytes = vault.datum.as_ref().ok_or_else(|| {
            VaultError::MalformedDatum(format!("vault output {} has no inline datum", vault.output_ref))
        })?;
        let datum = VaultDatum::decode(datum_bytes.as_bytes())?;

        if datum.share_policy_id != *validity.policy_id() {
            return Err(VaultError::MalformedDatum(format!(
                "datum names share policy {}, vault policy is {}",
                datum.share_policy_id,
                validity.policy_id()
            )));
        }

        Ok((VaultState::Active(datum), Some(vault)))
    }
}
