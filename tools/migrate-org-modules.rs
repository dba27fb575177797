//! Migrate legacy organization module state
//!
//! Folds the embedded `moduleStates`/`moduleSettings` maps of organization
//! documents and the flat `org_modules` collection into the canonical
//! `organization_modules` collection. Safe to re-run.
//!
//! Usage:
//!   migrate-org-modules <data-source> [--config <file>] [--unknown-status preserve|reject] [--json]
//!
//! Data sources: `redb://<dir>`, `sled://<dir>`, `memory://`, or a bare directory.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use tenant_modules::migration::{MigrationPass, UnknownStatusPolicy};
use tenant_modules::storage::{DataSource, Storage};
use tenant_modules::utils::init_logging_from_config;
use tenant_modules::ServiceConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnknownStatusArg {
    Preserve,
    Reject,
}

impl From<UnknownStatusArg> for UnknownStatusPolicy {
    fn from(arg: UnknownStatusArg) -> Self {
        match arg {
            UnknownStatusArg::Preserve => UnknownStatusPolicy::Preserve,
            UnknownStatusArg::Reject => UnknownStatusPolicy::Reject,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "migrate-org-modules", about = "Migrate legacy organization module state")]
struct Args {
    /// Data-source connection string
    data_source: String,

    /// Service configuration file (logging and migration sections)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured unknown-status policy
    #[arg(long, value_enum)]
    unknown_status: Option<UnknownStatusArg>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

async fn run(args: &Args, config: &ServiceConfig) -> anyhow::Result<()> {
    let source = DataSource::parse(&args.data_source)?;
    let storage = Storage::open(&source)?;
    let policy = args
        .unknown_status
        .map(UnknownStatusPolicy::from)
        .unwrap_or(config.migration.unknown_status);

    info!("Migrating {} (unknown statuses: {:?})", source, policy);
    let summary = MigrationPass::new(storage.database())
        .with_unknown_status_policy(policy)
        .run()
        .await?;
    storage.flush()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = match args.config {
        Some(ref path) => match ServiceConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ServiceConfig::default(),
    };
    init_logging_from_config(config.logging.as_ref());

    match run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Migration failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
