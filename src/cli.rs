//! # Command-Line Interface Module
//!
//! Clap definitions for the `animuse` binary.
//!
//! ## Commands
//!
//! - `list`: Show the per-tag statistics of the preference model
//! - `recommend`: Rank candidates from a season, another user's list or the
//!   score-ranked listing
//! - `completion`: Generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! animuse --user=alice list
//! animuse recommend spring 2016
//! animuse recommend bob --new
//! animuse recommend --pages 5
//! ```

use crate::catalog::{CandidateFilter, Season};
use crate::tags::MainStudioPolicy;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "animuse")]
#[command(about = "Animuse: learns your taste from rated watch history and recommends what to watch next")]
#[command(version)]
pub struct Args {
    /// User whose rating history the model is built from
    ///
    /// Remembered between runs. Switching users rebuilds the model.
    #[arg(long, global = true, env = "ANIMUSE_USER")]
    pub user: Option<String>,

    /// Rebuild the preference model even if a cached one exists
    #[arg(long, global = true)]
    pub refresh: bool,

    /// Snapshot database location
    #[arg(long, global = true, env = "ANIMUSE_DB", value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Catalog dump to read records and user lists from
    #[arg(long, global = true, env = "ANIMUSE_CATALOG", value_hint = clap::ValueHint::FilePath)]
    pub catalog: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the modeled tags, best liked first
    ///
    /// Each line shows the tag, how many rated titles carried it, and the
    /// mean and standard deviation of their scores.
    List,

    /// Recommend titles based on the preference model
    ///
    /// recommend <season> <year>   candidates from that season
    /// recommend <user>            titles that user has completed
    /// recommend                   the score-ranked listing
    Recommend {
        /// Season name, or another user's name when no year follows
        season_or_user: Option<String>,

        /// Year of the season
        year: Option<u16>,

        /// Only recommend titles missing from the rating history
        #[arg(long)]
        new: bool,

        /// Pages of the score-ranked listing to consider
        #[arg(long, default_value_t = 3)]
        pages: u32,

        /// Concurrent record fetches (1 = sequential)
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,

        /// Main studio handling when scoring: plain, duplicate or extra
        #[arg(long, default_value = "extra")]
        main_studio: MainStudioPolicy,
    },

    /// Generate shell completions
    ///
    /// Usage: animuse completion bash > ~/.local/share/bash-completion/completions/animuse
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Turns the positional `recommend` arguments into a candidate filter.
pub fn candidate_filter(
    season_or_user: Option<&str>,
    year: Option<u16>,
    pages: u32,
) -> Result<CandidateFilter> {
    match (season_or_user, year) {
        (Some(season), Some(year)) => {
            let season: Season = season.parse().map_err(|e: String| anyhow!(e))?;
            Ok(CandidateFilter::Season { year, season })
        }
        (Some(user), None) => Ok(CandidateFilter::WatchedBy {
            user: user.to_string(),
        }),
        (None, _) => Ok(CandidateFilter::Top { pages }),
    }
}
