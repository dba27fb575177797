//! Validate a module catalog
//!
//! Loads the built-in catalog or a TOML catalog file, then reports malformed
//! entries, dependency cycles and dangling dependencies.
//!
//! Usage:
//!   check-catalog [<catalog.toml>] [--strict] [--suites]
//!
//! Exits non-zero on malformed entries or cycles. Dangling dependencies are
//! reported but only fail the run with `--strict`.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use tenant_modules::module::registry::{ModuleCatalog, ModuleDependencies, ModuleRegistry};
use tenant_modules::utils::init_logging;

#[derive(Parser, Debug)]
#[command(name = "check-catalog", about = "Validate a module catalog")]
struct Args {
    /// Catalog file; the built-in catalog when omitted
    catalog: Option<PathBuf>,

    /// Also fail on dangling dependencies
    #[arg(long)]
    strict: bool,

    /// List suites and their members
    #[arg(long)]
    suites: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(Some("warn"));

    let loaded = match args.catalog {
        Some(ref path) => ModuleCatalog::from_file(path),
        None => ModuleCatalog::builtin(),
    };
    let catalog = match loaded {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let validation = ModuleDependencies::new(&catalog).validate();
    println!("{} modules", catalog.len());
    for cycle in &validation.cycles {
        println!("cycle: {}", cycle.join(" -> "));
    }
    for missing in &validation.missing {
        println!(
            "dangling: {} depends on unknown {}",
            missing.module, missing.dependency
        );
    }

    if args.suites {
        let registry = ModuleRegistry::new(std::sync::Arc::new(catalog));
        for suite in registry.suites() {
            println!("suite {}: {}", suite.name, suite.members.join(", "));
        }
    }

    if !validation.is_acyclic() || (args.strict && !validation.is_clean()) {
        return ExitCode::FAILURE;
    }
    println!("ok");
    ExitCode::SUCCESS
}
