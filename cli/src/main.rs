// Copyright (c) 2026 FNFT Vault Contributors. MIT License.
// See LICENSE for details.

//! # FNFT CLI
//!
//! Entry point for the `fnft` binary. Parses CLI arguments, initializes
//! logging and dispatches to a subcommand:
//!
//! - `unit`           derive a unit from policy id and name
//! - `policy-id`      derive a single-signer policy id
//! - `decode-datum`   hex datum to JSON
//! - `encode-datum`   JSON datum to hex
//! - `inspect-config` validate a vault configuration file
//! - `simulate`       full lifecycle on an in-memory ledger
//! - `version`        print build version information

mod cli;
mod logging;
mod simulate;

use anyhow::{Context, Result};
use clap::Parser;

use fnft_protocol::asset::{unit, AssetName, KeyHash, NativeScript, PolicyId};
use fnft_protocol::config::VaultConfig;
use fnft_protocol::vault::VaultDatum;

use cli::{Commands, FnftCli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = FnftCli::parse();
    logging::init_logging("fnft_cli=info,fnft_protocol=info", cli.log_format);

    match cli.command {
        Commands::Unit(args) => derive_unit(args),
        Commands::PolicyId(args) => derive_policy_id(args),
        Commands::DecodeDatum(args) => decode_datum(args),
        Commands::EncodeDatum(args) => encode_datum(args),
        Commands::InspectConfig(args) => inspect_config(args),
        Commands::Simulate(args) => simulate::run(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn derive_unit(args: cli::UnitArgs) -> Result<()> {
    let policy_id = PolicyId::from_hex(&args.policy_id).context("invalid --policy-id")?;
    let name = match (&args.name, &args.name_hex) {
        (Some(label), _) => AssetName::from_label(label)?,
        (None, Some(hex_name)) => AssetName::from_hex(hex_name)?,
        (None, None) => anyhow::bail!("one of --name or --name-hex is required"),
    };
    println!("{}", unit(&policy_id, &name));
    Ok(())
}

fn derive_policy_id(args: cli::PolicyIdArgs) -> Result<()> {
    let key_hash = match (&args.key_hash, &args.public_key) {
        (Some(hash), _) => KeyHash::from_hex(hash).context("invalid --key-hash")?,
        (None, Some(public_key)) => {
            let bytes: [u8; 32] = hex::decode(public_key)
                .context("public key is not hex")?
                .try_into()
                .map_err(|_| anyhow::anyhow!("public key must be 32 bytes"))?;
            KeyHash::from_public_key(&bytes)
        }
        (None, None) => anyhow::bail!("one of --key-hash or --public-key is required"),
    };

    let script = NativeScript::single_signer(key_hash);
    let policy_id = script.policy_id()?;
    tracing::debug!(key_hash = %key_hash, policy_id = %policy_id, "derived policy id");

    let out = serde_json::json!({
        "policy_id": policy_id,
        "key_hash": key_hash,
        "script": script,
        "script_cbor": hex::encode(script.to_cbor()?),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn decode_datum(args: cli::DecodeDatumArgs) -> Result<()> {
    let datum = VaultDatum::decode_hex(&args.datum_hex)?;
    let out = serde_json::json!({
        "datum": datum,
        "share_unit": datum.share_unit(),
        "collectible_unit": datum.collectible_unit(),
        "outstanding": datum.outstanding(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn encode_datum(args: cli::EncodeDatumArgs) -> Result<()> {
    let json = match (&args.file, &args.json) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read datum file {}", path.display()))?,
        (None, Some(inline)) => inline.clone(),
        (None, None) => anyhow::bail!("one of --file or --json is required"),
    };
    let datum: VaultDatum = serde_json::from_str(&json).context("invalid datum JSON")?;
    datum.validate()?;
    println!("{}", hex::encode(datum.encode()?));
    Ok(())
}

fn inspect_config(args: cli::InspectConfigArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read config {}", args.config.display()))?;
    let config = VaultConfig::from_json(&raw)
        .with_context(|| format!("invalid vault config {}", args.config.display()))?;
    let policy_id = config.minting_authority.policy_id()?;

    tracing::info!(path = %args.config.display(), "vault config is valid");
    let out = serde_json::json!({
        "vault_address": config.vault_address,
        "share_policy_id": policy_id,
        "share_unit": unit(&policy_id, &config.share_asset_name),
        "validity_unit": unit(&policy_id, &config.validity_token_name),
        "collectible_unit": config.collectible,
        "required_signers": config.minting_authority.required_signers(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("fnft          {}", env!("CARGO_PKG_VERSION"));
    println!("datum version {}", fnft_protocol::config::VAULT_DATUM_CONSTRUCTOR);
}
