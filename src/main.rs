//! Thin CLI front end over the mailprobe core: verify one or more
//! addresses at a chosen thoroughness level and print the outcome.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use mailprobe_core::{Config, EmailAddressParts, RunContext, Verdict, Verifier};

#[derive(Parser, Debug)]
#[command(name = "mailprobe", version, about = "Incremental email deliverability verification")]
struct Cli {
    /// Addresses to verify.
    #[arg(required = true)]
    addresses: Vec<String>,

    /// How far down the pipeline to go.
    #[arg(short, long, value_enum, default_value_t = Level::Lookup)]
    level: Level,

    /// Overall time budget per address, in seconds.
    #[arg(short, long, default_value_t = 10, env = "MAILPROBE_TIMEOUT")]
    timeout: u64,

    /// Path to a TOML configuration file.
    #[arg(short, long, env = "MAILPROBE_CONFIG")]
    config: Option<String>,

    /// Emit one JSON object per address instead of human-readable lines.
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Level {
    /// Structural check only.
    Syntax,
    /// Syntax + MX existence + MX-host IP resolution.
    Lookup,
    /// Adds a TCP connect to a resolved MX host.
    Connect,
    /// Adds an SMTP session probing recipient acceptance.
    Rcpt,
}

#[derive(Serialize)]
struct Report<'a> {
    address: &'a str,
    valid: bool,
    outcome: &'a mailprobe_core::Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config from {path}"))?,
        None => Config::default(),
    };
    let verifier = Verifier::new(Arc::new(config)).context("initializing verifier")?;

    let mut any_invalid = false;
    for address in &cli.addresses {
        let verdict = match EmailAddressParts::parse(address) {
            Ok(parts) => {
                let ctx = RunContext::new().deadline_in(Duration::from_secs(cli.timeout));
                match cli.level {
                    Level::Syntax => verifier.check_syntax(&parts, ctx).await,
                    Level::Lookup => verifier.check_lookup(&parts, ctx).await,
                    Level::Connect => verifier.check_connect(&parts, ctx).await,
                    Level::Rcpt => verifier.check_rcpt(&parts, ctx).await,
                }
            }
            Err(e) => Verdict {
                outcome: Default::default(),
                error: Some(e),
            },
        };

        if !verdict.is_valid() {
            any_invalid = true;
        }
        print_verdict(address, &verdict, cli.json)?;
    }

    if any_invalid {
        std::process::exit(1);
    }
    Ok(())
}

fn print_verdict(address: &str, verdict: &Verdict, json: bool) -> anyhow::Result<()> {
    if json {
        let report = Report {
            address,
            valid: verdict.is_valid(),
            outcome: &verdict.outcome,
            error: verdict.error.as_ref().map(|e| e.to_string()),
        };
        println!("{}", serde_json::to_string(&report)?);
    } else if let Some(error) = &verdict.error {
        println!("{address}: INVALID ({error})");
    } else {
        println!(
            "{address}: VALID (passed: {})",
            verdict.outcome.validations
        );
    }
    Ok(())
}
