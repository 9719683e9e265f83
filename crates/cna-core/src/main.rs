use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use cna_core::{load_contract, AnalyticsConfig, AnalyticsSession};
use cna_metrics::{build_series, MetricsEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let contract = Arg::new("contract")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Contract upload (.json, .yaml or .yml)");
    let config = Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("Engine configuration (.toml, .yaml or .yml)");
    let seed = Arg::new("seed")
        .long("seed")
        .value_parser(value_parser!(u64))
        .help("Seed for the vendor-flexibility signal");

    Command::new("cna")
        .version(cna_core::VERSION)
        .about("Contract negotiation analytics")
        .subcommand_required(true)
        .subcommand(
            Command::new("derive")
                .about("Derive metrics and chart series for a contract")
                .arg(contract.clone())
                .arg(config.clone())
                .arg(seed.clone()),
        )
        .subcommand(
            Command::new("animate")
                .about("Apply edits and print every animation frame as a JSON line")
                .arg(contract)
                .arg(config)
                .arg(seed)
                .arg(
                    Arg::new("edit")
                        .long("edit")
                        .action(ArgAction::Append)
                        .value_parser(parse_edit)
                        .help("Field edit as field=<json>, e.g. totalSpend=4000000"),
                ),
        )
}

fn parse_edit(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=<json>, got '{raw}'"))?;
    // bare words are taken as strings so carrier=FedEx works
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((field.trim().to_string(), value))
}

fn load_config(args: &ArgMatches) -> Result<AnalyticsConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => AnalyticsConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalyticsConfig::default(),
    };
    if let Some(seed) = args.get_one::<u64>("seed") {
        config = config.with_signal_seed(*seed);
    }
    Ok(config)
}

fn derive(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<PathBuf>("contract")
        .context("contract path is required")?;
    let snapshot = load_contract(path)?;
    let config = load_config(args)?;

    let market = Arc::new(config.market.clone());
    let mut engine = MetricsEngine::new(Arc::clone(&market), config.signal_provider());
    let metrics = engine.derive(&snapshot)?;
    let series = build_series(&snapshot, &market)?;

    let output = serde_json::json!({ "metrics": metrics, "series": series });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn animate(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<PathBuf>("contract")
        .context("contract path is required")?;
    let snapshot = load_contract(path)?;
    let config = load_config(args)?;
    let edits: Vec<(String, serde_json::Value)> = args
        .get_many::<(String, serde_json::Value)>("edit")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let session = AnalyticsSession::spawn(snapshot, config)?;
    let mut frames = session.subscribe().await?;

    // initial frame
    if let Some(frame) = frames.recv().await {
        println!("{}", serde_json::to_string(frame.as_ref())?);
    }

    for (field, value) in edits {
        tracing::info!(%field, %value, "Applying edit");
        match session.edit(field.as_str(), value).await {
            Ok(snapshot) => {
                tracing::debug!(total_spend = snapshot.total_spend(), "Edit accepted");
            }
            Err(e) if e.is_user_error() => {
                tracing::warn!(%field, error = %e, "Edit rejected");
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        // every accepted edit publishes a frame; follow it until it settles
        loop {
            let Some(frame) = frames.recv().await else {
                bail!("session closed while animating");
            };
            println!("{}", serde_json::to_string(frame.as_ref())?);
            if !frame.animating {
                break;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("derive", args)) => derive(args),
        Some(("animate", args)) => animate(args).await,
        _ => bail!("unknown subcommand"),
    }
}
