//! # CLI Interface
//!
//! Argument structure for the `fnft` binary, using `clap` derive.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Fractionalized NFT vault tooling.
///
/// Derives identifiers, inspects and builds vault datums, and simulates a
/// full vault lifecycle against an in-memory ledger.
#[derive(Parser, Debug)]
#[command(
    name = "fnft",
    about = "Fractionalized NFT vault tooling",
    version,
    propagate_version = true
)]
pub struct FnftCli {
    /// Log output format.
    #[arg(long, global = true, env = "FNFT_LOG", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive a unit from a policy id and an asset name.
    Unit(UnitArgs),
    /// Derive the policy id of a single-signer minting authority.
    PolicyId(PolicyIdArgs),
    /// Decode a hex-encoded vault datum and print it as JSON.
    DecodeDatum(DecodeDatumArgs),
    /// Encode a JSON vault datum to hex CBOR.
    EncodeDatum(EncodeDatumArgs),
    /// Validate a vault configuration file and print the units it implies.
    InspectConfig(InspectConfigArgs),
    /// Run Mint, Withdraw, Deposit and Burn against an in-memory ledger.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for `unit`.
#[derive(Args, Debug)]
pub struct UnitArgs {
    /// Hex policy id (56 characters).
    #[arg(long)]
    pub policy_id: String,

    /// Asset name as a UTF-8 label.
    #[arg(long, conflicts_with = "name_hex", required_unless_present = "name_hex")]
    pub name: Option<String>,

    /// Asset name as hex.
    #[arg(long)]
    pub name_hex: Option<String>,
}

/// Arguments for `policy-id`.
#[derive(Args, Debug)]
pub struct PolicyIdArgs {
    /// Hex key hash of the signing credential (56 characters).
    #[arg(long, conflicts_with = "public_key", required_unless_present = "public_key")]
    pub key_hash: Option<String>,

    /// Hex Ed25519 public key; its key hash is derived first.
    #[arg(long)]
    pub public_key: Option<String>,
}

/// Arguments for `decode-datum`.
#[derive(Args, Debug)]
pub struct DecodeDatumArgs {
    /// Hex-encoded datum CBOR.
    pub datum_hex: String,
}

/// Arguments for `encode-datum`.
#[derive(Args, Debug)]
pub struct EncodeDatumArgs {
    /// Path to a JSON file holding the datum.
    #[arg(long, short = 'f', conflicts_with = "json", required_unless_present = "json")]
    pub file: Option<PathBuf>,

    /// The datum as an inline JSON string.
    #[arg(long)]
    pub json: Option<String>,
}

/// Arguments for `inspect-config`.
#[derive(Args, Debug)]
pub struct InspectConfigArgs {
    /// Path to the vault configuration (JSON).
    #[arg(long, short = 'c', env = "FNFT_CONFIG")]
    pub config: PathBuf,
}

/// Arguments for `simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of shares to mint.
    #[arg(long, default_value_t = 1000)]
    pub supply: u64,

    /// Shares to withdraw and then deposit back.
    #[arg(long, default_value_t = 300)]
    pub withdraw: u64,

    /// Hex 32-byte seed for the simulated wallet. Random when omitted.
    #[arg(long, env = "FNFT_SIM_SEED")]
    pub seed: Option<String>,

    /// Print each step as a JSON line instead of text.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        FnftCli::command().debug_assert();
    }

    #[test]
    fn simulate_defaults() {
        let cli = FnftCli::try_parse_from(["fnft", "simulate"]).unwrap();
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.supply, 1000);
                assert_eq!(args.withdraw, 300);
                assert!(!args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unit_requires_a_name() {
        let policy = "00".repeat(28);
        assert!(FnftCli::try_parse_from(["fnft", "unit", "--policy-id", &policy]).is_err());
        assert!(FnftCli::try_parse_from([
            "fnft",
            "unit",
            "--policy-id",
            &policy,
            "--name",
            "nft1",
            "--name-hex",
            "6e667431",
        ])
        .is_err());
    }
}
