//! Lifecycle simulation against the in-memory ledger.
//!
//! Seeds a caller with a collectible, then runs Mint, Withdraw, Deposit and
//! Burn through a [`VaultClient`], reporting each step. An attempted Burn
//! while shares are outstanding is included to show the refusal path.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;

use fnft_protocol::asset::{AssetName, NativeScript, PolicyId, Unit};
use fnft_protocol::config::{ValidatorSource, VaultConfig};
use fnft_protocol::crypto::keys::WalletKeypair;
use fnft_protocol::error::VaultError;
use fnft_protocol::transaction::types::{Address, AssetBundle, PlutusScript};
use fnft_protocol::vault::client::OperationReceipt;
use fnft_protocol::vault::VaultClient;
use fnft_protocol::InMemoryLedger;

use crate::cli::SimulateArgs;

/// Compiled always-succeeds validator, enough for the in-memory ledger.
const SIM_VALIDATOR_CBOR: &str = "4e4d01000033222220051200120011";

#[derive(Serialize)]
struct Step<'a> {
    step: &'a str,
    outcome: &'a str,
    tx_hash: Option<String>,
    remaining: Option<u64>,
    minted: Option<u64>,
    caller_shares: u64,
    detail: Option<String>,
}

struct Reporter {
    json: bool,
}

impl Reporter {
    fn emit(&self, step: &Step<'_>) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(step)?);
            return Ok(());
        }
        let supply = match (step.remaining, step.minted) {
            (Some(r), Some(m)) => format!("remaining {}/{}", r, m),
            _ => "no vault".to_string(),
        };
        println!(
            "{:<9} {:<8} {:<22} caller holds {:>6} shares  {}",
            step.step,
            step.outcome,
            supply,
            step.caller_shares,
            step.tx_hash
                .as_deref()
                .or(step.detail.as_deref())
                .unwrap_or_default()
        );
        Ok(())
    }
}

pub async fn run(args: SimulateArgs) -> Result<()> {
    if args.withdraw == 0 || args.withdraw > args.supply {
        bail!(
            "--withdraw must be between 1 and --supply ({}), got {}",
            args.supply,
            args.withdraw
        );
    }

    let wallet = match &args.seed {
        Some(seed) => WalletKeypair::from_hex(seed).context("invalid --seed")?,
        None => WalletKeypair::generate(),
    };

    let ledger = Arc::new(InMemoryLedger::new(wallet));
    let caller = Address::new("addr_test1qsimcaller");
    let collectible = Unit::new(PolicyId::from_bytes([0x37; 28]), AssetName::from_label("nft1")?);

    let mut seed_assets = AssetBundle::with_lovelace(10_000_000);
    seed_assets.add(&collectible, 1)?;
    ledger.fund(&caller, seed_assets);

    let config = VaultConfig {
        vault_address: Address::new("addr_test1wsimvault"),
        minting_authority: NativeScript::single_signer(ledger.wallet_key_hash()),
        validity_token_name: AssetName::validity_default(),
        share_asset_name: AssetName::from_label("FNFT_nft1")?,
        collectible,
        spending_validator: ValidatorSource::Attached {
            script: PlutusScript::v2(SIM_VALIDATOR_CBOR),
        },
    };
    let client = VaultClient::new(Arc::clone(&ledger), config, caller.clone())?;
    let share = client.share_unit()?;
    let reporter = Reporter { json: args.json };

    tracing::info!(
        supply = args.supply,
        withdraw = args.withdraw,
        share = %share,
        "starting simulation"
    );

    let report = |name: &'static str, result: &Result<OperationReceipt, VaultError>| {
        let caller_shares = ledger.balance_of(&caller, &share);
        let step = match result {
            Ok(receipt) => Step {
                step: name,
                outcome: "ok",
                tx_hash: Some(receipt.tx_hash.to_string()),
                remaining: receipt.state.datum().map(|d| d.remaining_supply),
                minted: receipt.state.datum().map(|d| d.minted_supply),
                caller_shares,
                detail: None,
            },
            Err(e) => Step {
                step: name,
                outcome: "refused",
                tx_hash: None,
                remaining: None,
                minted: None,
                caller_shares,
                detail: Some(e.to_string()),
            },
        };
        reporter.emit(&step)
    };

    let minted = client.mint(args.supply).await;
    report("mint", &minted)?;
    minted.context("mint failed")?;

    let withdrawn = client.withdraw(args.withdraw).await;
    report("withdraw", &withdrawn)?;
    withdrawn.context("withdraw failed")?;

    let early_burn = client.burn().await;
    report("burn", &early_burn)?;
    if !matches!(early_burn, Err(VaultError::OutstandingShares { .. })) {
        bail!("burn with outstanding shares was not refused");
    }

    let deposited = client.deposit(args.withdraw).await;
    report("deposit", &deposited)?;
    deposited.context("deposit failed")?;

    let burned = client.burn().await;
    report("burn", &burned)?;
    burned.context("burn failed")?;

    tracing::info!(
        transactions = ledger.history().len(),
        "simulation complete"
    );
    Ok(())
}
