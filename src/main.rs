//! # Animuse
//!
//! Builds a taste model from a user's rated history and ranks candidate titles
//! against it.
//!
//! ## Usage
//!
//! ```bash
//! # Show the modeled tags
//! animuse --user=alice list
//!
//! # Recommend from a season, another user's list, or the top listing
//! animuse recommend winter 2016
//! animuse recommend bob --new
//! animuse recommend
//! ```

use animuse::catalog::JsonCatalog;
use animuse::config::RuntimeConfig;
use animuse::recommend::{self, RecommendOptions};
use animuse::session::Session;
use animuse::{cli, completion, db, report};
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{error, info};
use std::io::Write;

/// Prints `done/total` on one line, overwriting the previous count.
fn print_progress(done: usize, total: usize) {
    eprint!("{done}/{total}\r");
    let _ = std::io::stderr().flush();
    if done == total {
        eprintln!();
    }
}

/// Runs one command against an open session.
fn run(args: &cli::Args, config: &RuntimeConfig, session: &mut Session) -> Result<()> {
    // A cached model is enough to list it.
    let needs_catalog = session.needs_rebuild(args.refresh)
        || matches!(args.command, cli::Command::Recommend { .. });
    let catalog = if needs_catalog {
        let catalog = JsonCatalog::open(&config.catalog_path).with_context(|| {
            format!("Failed to load catalog {}", config.catalog_path.display())
        })?;
        Some(catalog)
    } else {
        None
    };

    let model = match &catalog {
        Some(catalog) => session.ensure_model(catalog, args.refresh, print_progress)?,
        None => session
            .model()
            .context("No cached preference model")?,
    };

    match &args.command {
        cli::Command::List => {
            println!("{}", report::render_listing(&model.listing()));
        }
        cli::Command::Recommend {
            season_or_user,
            year,
            new,
            pages,
            jobs,
            main_studio,
        } => {
            let filter = cli::candidate_filter(season_or_user.as_deref(), *year, *pages)?;
            info!("Recommending from {filter:?}");
            let options = RecommendOptions {
                filter,
                only_new: *new,
                policy: *main_studio,
                jobs: (*jobs).max(1),
            };
            let catalog = catalog.as_ref().context("Catalog not loaded")?;
            let recs = recommend::run(model, catalog, &options, &print_progress)?;
            print!("{}", report::render_tiers(&recs.classes));
        }
        cli::Command::Completion { .. } => unreachable!("handled before opening a session"),
    }

    Ok(())
}

/// Main entry point for the Animuse application.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug animuse recommend` - Enable debug logging
/// - `RUST_LOG=animuse::algorithm=trace animuse recommend` - Per-tag weights
///
/// The snapshot is saved after every command, failed ones included.
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    if let cli::Command::Completion { shell } = args.command {
        let mut cmd = cli::Args::command();
        completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        return Ok(());
    }

    let config = RuntimeConfig::resolve(args.db.clone(), args.catalog.clone())?;
    let store = db::Store::open(&config.db_path)?;
    let mut session = Session::open(store)?;
    session.select_user(args.user.as_deref());

    let outcome = run(&args, &config, &mut session);
    let persisted = session.persist();

    match (outcome, persisted) {
        (Err(err), Err(persist_err)) => {
            error!("{persist_err:#}");
            Err(err)
        }
        (outcome, persisted) => outcome.and(persisted),
    }
}
