#[macro_use]
extern crate log;

use std::io::Write;
use std::path::Path;
use std::{fs, process, thread};

use anyhow::{Context, Result};
use chrono::Local;
use env_logger::Env;
use serde::Serialize;
use structopt::StructOpt;
use toml::Value;

use rls_repair::client::ServiceClientFactory;
use rls_repair::common::helpers::print_error_chain;
use rls_repair::config::Config;
use rls_repair::diagnose::diagnose;
use rls_repair::repair::{RepairOutcome, RepairPipeline};
use rls_repair::verify::VerificationSuite;

use crate::args::Args;

mod args;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    match init().await.with_context(|| "Repair failed") {
        Ok(true) => Ok(()),
        Ok(false) => process::exit(1),
        Err(errors) => {
            print_error_chain(&errors);
            process::exit(2);
        }
    }
}

async fn init() -> Result<bool> {
    let options = Args::from_args();

    initialize_logger(options.verbose, options.quiet);

    let mut config = load_config(&options.config).context("Failed to load config file")?;
    if let Some(migration) = &options.migration {
        config.override_source(migration.clone());
    }

    debug!("Loaded configuration: {:?}", config);
    info!("Initializing clients for {}", config.service().url);

    let factory = ServiceClientFactory::new(
        config.service().clone(),
        config.migration().rpc.clone(),
    );

    if options.diagnose {
        let client = factory.unprivileged()?;
        let verification = config.verification();
        let report = diagnose(
            &client,
            &verification.protected_collection,
            &verification.sweep_collections,
        )
        .await;

        if options.json {
            print_json(&report)?;
        }

        return Ok(!report.needs_repair());
    }

    let privileged = factory.privileged()?;
    let unprivileged = factory.unprivileged()?;

    let suite = VerificationSuite::new(
        &privileged,
        &unprivileged,
        config.verification().clone(),
    );
    let pipeline = RepairPipeline::new(&privileged, config.policy().clone());

    let outcome = pipeline
        .repair(
            &config.migration().source,
            (!options.skip_verification).then_some(&suite),
        )
        .await?;

    log_outcome(&outcome);

    if options.json {
        print_json(&outcome)?;
    }

    Ok(outcome.succeeded())
}

fn log_outcome(outcome: &RepairOutcome) {
    info!(
        "Migration: {}/{} statements successful, {} failed",
        outcome.report.successful(),
        outcome.report.total,
        outcome.report.fatal.len()
    );

    if let Some(verification) = &outcome.verification {
        info!(
            "Verification: {} passed, {} failed",
            verification.passed_count(),
            verification.failed_count()
        );
    }

    if outcome.succeeded() {
        info!("Repair succeeded");
    } else {
        warn!("Repair did not fully succeed");
    }
}

fn print_json<T: Serialize>(report: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

fn initialize_logger(verbose: bool, quiet: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .filter_module("reqwest", log::LevelFilter::Warn)
        .filter_module("hyper", log::LevelFilter::Warn)
        .format(|buf, record| {
            let timestamp = Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "{} {:<5} [{}] - {}",
                timestamp,
                record.level(),
                thread::current().name().unwrap_or("<unnamed>"),
                record.args()
            )
        })
        .init();
}

fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let value = content.parse::<Value>()?;
    let config = Config::from_toml(value)?;
    Ok(config)
}
