//! Build (and optionally authorize) a zkApp command from a scenario file

use anyhow::{bail, Context};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use zkapp_core::crypto::{KeyPair, KeyringAuthorizer};
use zkapp_core::tree::AccountUpdateForest;
use zkapp_core::{
    create_unsigned_zkapp_command, AccountUpdate, ChainView, Config, Engine, Error, FeePayer,
    InMemoryLedger, Memo,
};

#[derive(Debug, Parser)]
#[clap(name = "zkapp-apply", version, about = "Apply a zkApp command scenario")]
struct CliOptions {
    /// Scenario JSON: ledger, chain, fee payer, memo and update forest
    scenario: PathBuf,

    /// TOML config file (defaults to ZKAPP_* environment variables)
    #[clap(long, short)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[clap(long)]
    json: bool,

    /// Hex ed25519 seed to sign with; repeat for several signers
    #[clap(long = "sign-seed")]
    sign_seeds: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    ledger: InMemoryLedger,
    #[serde(default)]
    chain: ChainView,
    fee_payer: FeePayer,
    #[serde(default)]
    memo: Memo,
    #[serde(default)]
    forest: AccountUpdateForest<AccountUpdate>,
}

fn parse_seed(seed: &str) -> anyhow::Result<KeyPair> {
    let bytes = hex::decode(seed.trim_start_matches("0x")).context("seed is not hex")?;
    let seed: [u8; 32] = match bytes.try_into() {
        Ok(seed) => seed,
        Err(bytes) => bail!("seed must be 32 bytes, got {}", bytes.len()),
    };
    Ok(KeyPair::from_seed(&seed))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = CliOptions::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    if options.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = match &options.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    tracing::info!(network = ?config.network_id, "Starting zkapp-apply");

    let content = std::fs::read_to_string(&options.scenario)
        .with_context(|| format!("reading {}", options.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&content).context("parsing scenario")?;

    let engine = Engine::new(config)?;
    let mut ledger = scenario.ledger;
    let forest = scenario.forest;

    let command = match create_unsigned_zkapp_command(
        &mut ledger,
        &scenario.chain,
        &engine,
        scenario.fee_payer,
        scenario.memo,
        |ctx| {
            for tree in forest {
                ctx.add_tree(tree);
            }
            Ok(())
        },
    ) {
        Ok(command) => command,
        Err(Error::CommandRejected(trace)) => {
            eprintln!("{}", trace.generate_report());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if options.sign_seeds.is_empty() {
        println!("{}", serde_json::to_string_pretty(&command)?);
    } else {
        let mut authorizer = KeyringAuthorizer::new();
        for seed in &options.sign_seeds {
            authorizer.insert(parse_seed(seed)?);
        }
        let authorized = command.authorize(&engine, &authorizer).await?;
        println!("{}", serde_json::to_string_pretty(&authorized)?);
    }

    tracing::info!(accounts = ledger.len(), "Scenario applied");
    Ok(())
}
