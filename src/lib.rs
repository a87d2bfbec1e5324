//! Taste modeling and recommendations from a rated watch history.
//!
//! Core modules:
//! - [`tags`] - Feature tag extraction (genres, studios, staff roles, classification)
//! - [`role`] - Staff role normalization
//! - [`model`] - Preference model: per-tag rating statistics
//! - [`algorithm`] - Confidence weights and candidate scoring
//! - [`tiers`] - Weight classes of ranked candidates
//! - [`recommend`] - The fetch, score and rank pipeline
//!
//! ### Supporting Modules
//!
//! - [`catalog`] - Catalog records and the data source seam
//! - [`db`] - SQLite snapshot of the last computed model
//! - [`session`] - Run context persisted on every exit path
//! - [`report`] - Text rendering
//! - [`config`] - Data directory management
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use animuse::catalog::{CandidateStub, CatalogRecord, RatedRecord};
//! use animuse::model::build_model;
//! use animuse::recommend::recommend;
//! use animuse::tags::MainStudioPolicy;
//!
//! let action = |id, score| RatedRecord {
//!     record: CatalogRecord { id, genres: vec!["Action".into()], ..Default::default() },
//!     score,
//! };
//! let model = build_model(&[action(1, 8.0), action(2, 6.0)], |_, _| {});
//!
//! let candidate = CatalogRecord { id: 3, genres: vec!["Action".into()], ..Default::default() };
//! let recs = recommend(
//!     &model,
//!     &[(CandidateStub::from(&candidate), candidate.clone())],
//!     MainStudioPolicy::ExtraTag,
//! );
//! assert!((recs.ranked[0].calc_score - 7.0).abs() < 1e-9);
//! ```
//!
//! ## Algorithm Details
//!
//! Every rated title is broken into feature tags and its score is recorded
//! against each tag. Tags are summarized as `(count, mean, stdev)`. At scoring
//! time each tag gets a confidence weight from its sample count, its spread and
//! a fixed prior for its class; a candidate's score is the weight-averaged mean
//! of the tags it shares with the model, and the summed weight decides its
//! weight class.
//!
//! ## Error Handling
//!
//! Catalog failures are [`catalog::CatalogError`]s and abort the run. Everything
//! above the catalog returns `anyhow::Result` with context.

pub mod algorithm;
pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod model;
pub mod recommend;
pub mod report;
pub mod role;
pub mod session;
pub mod tags;
pub mod tiers;
