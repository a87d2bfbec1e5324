//! # Catalog Module
//!
//! Records describing titles, and the collaborator seam the core fetches them
//! through.
//!
//! The recommendation core never talks to a catalog service directly. It asks a
//! [`CatalogSource`] for a user's rated history, for a batch of candidate stubs
//! and for the full record behind each stub. [`JsonCatalog`] is the offline
//! implementation shipped with the binary: it serves everything from one JSON
//! dump on disk.
//!
//! ## Dump Format
//!
//! ```json
//! {
//!   "records": [
//!     { "id": 1, "title": "Mushishi", "genres": ["Mystery"],
//!       "studios": [{ "name": "Artland", "main": true }],
//!       "staff": [{ "last_name": "Nagahama", "first_name": "Hiroshi", "role": "Director" }],
//!       "classification": "PG-13", "year": 2005, "season": "fall",
//!       "average_score": 86.0, "episodes": 26 }
//!   ],
//!   "users": {
//!     "alice": [ { "id": 1, "score": 9.0 }, { "title": "Haibane Renmei", "score": 8.0 } ]
//!   }
//! }
//! ```
//!
//! List entries may name a title instead of an id; those go through the
//! [`TitleResolver`] and are dropped with a warning when nothing matches.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Catalog-wide identifier of a title.
pub type RecordId = u32;

/// Number of titles per page of the score-ranked listing.
pub const TOP_PAGE_SIZE: usize = 40;

/// Failures at the catalog boundary. All of them abort the current run.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed catalog payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Unknown catalog record: {0}")]
    UnknownRecord(RecordId),
}

/// A studio credit on a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioCredit {
    pub name: String,
    /// Whether this is the principal animation studio.
    #[serde(default)]
    pub main: bool,
}

/// A staff credit on a title. The role is free text and may carry qualifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffCredit {
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Broadcast season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "winter" => Ok(Self::Winter),
            "spring" => Ok(Self::Spring),
            "summer" => Ok(Self::Summer),
            "fall" | "autumn" => Ok(Self::Fall),
            other => Err(format!(
                "Unknown season: {other}. Use winter, spring, summer or fall"
            )),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
        };
        f.write_str(name)
    }
}

/// Full description of one title, as supplied by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: RecordId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub average_score: Option<f64>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub studios: Vec<StudioCredit>,
    #[serde(default)]
    pub staff: Vec<StaffCredit>,
    #[serde(default)]
    pub classification: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub season: Option<Season>,
}

/// A watched title together with the score the user gave it.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedRecord {
    pub record: CatalogRecord,
    pub score: f64,
}

/// Minimal listing entry for a candidate, hydrated later via
/// [`CatalogSource::fetch_candidate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStub {
    pub id: RecordId,
    pub title: String,
    pub title_english: Option<String>,
    pub average_score: Option<f64>,
    pub episodes: Option<u32>,
}

impl CandidateStub {
    /// Romaji title, followed by the English one in parentheses when it differs.
    #[must_use]
    pub fn display_title(&self) -> String {
        match &self.title_english {
            Some(english) if !english.is_empty() && *english != self.title => {
                format!("{} ({english})", self.title)
            }
            _ => self.title.clone(),
        }
    }
}

impl From<&CatalogRecord> for CandidateStub {
    fn from(record: &CatalogRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            title_english: record.title_english.clone(),
            average_score: record.average_score,
            episodes: record.episodes,
        }
    }
}

/// Which titles to consider for recommendation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateFilter {
    /// Everything that aired in the given season.
    Season { year: u16, season: Season },
    /// The first `pages` pages of the score-ranked listing.
    Top { pages: u32 },
    /// Everything another user has completed.
    WatchedBy { user: String },
}

/// Source of catalog data. Implementations perform blocking fetches.
pub trait CatalogSource: Send + Sync {
    /// Completed titles of `user`, in list order, with the user's scores.
    fn fetch_rating_history(&self, user: &str) -> Result<Vec<RatedRecord>, CatalogError>;

    /// Full record of one title.
    fn fetch_candidate(&self, id: RecordId) -> Result<CatalogRecord, CatalogError>;

    /// Stubs of all titles matching `filter`. May contain duplicates.
    fn fetch_candidate_batch(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<CandidateStub>, CatalogError>;
}

/// Maps an external title to a catalog id.
pub trait TitleResolver: Send + Sync {
    fn resolve(&self, title: &str) -> Option<RecordId>;
}

/// Exact, case-insensitive match on the romaji or English title.
///
/// When several records share a title the first one in catalog order wins.
#[derive(Debug, Clone, Default)]
pub struct ExactTitleResolver {
    titles: HashMap<String, RecordId>,
}

impl ExactTitleResolver {
    #[must_use]
    pub fn from_records(records: &[CatalogRecord]) -> Self {
        let mut titles = HashMap::new();
        for record in records {
            let english = record.title_english.as_deref().into_iter();
            for title in std::iter::once(record.title.as_str()).chain(english) {
                titles.entry(title.to_lowercase()).or_insert(record.id);
            }
        }
        Self { titles }
    }
}

impl TitleResolver for ExactTitleResolver {
    fn resolve(&self, title: &str) -> Option<RecordId> {
        self.titles.get(&title.trim().to_lowercase()).copied()
    }
}

/// One entry of a user's completed list in the dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEntry {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub title: Option<String>,
    pub score: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogDump {
    #[serde(default)]
    records: Vec<CatalogRecord>,
    #[serde(default)]
    users: HashMap<String, Vec<ListEntry>>,
}

/// Catalog served from a JSON dump.
///
/// List entries given by title are reconciled through a [`TitleResolver`],
/// an [`ExactTitleResolver`] over the dump's records unless another one is
/// supplied with [`JsonCatalog::with_resolver`].
pub struct JsonCatalog {
    records: Vec<CatalogRecord>,
    index: HashMap<RecordId, usize>,
    users: HashMap<String, Vec<ListEntry>>,
    resolver: Box<dyn TitleResolver>,
}

impl fmt::Debug for JsonCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCatalog")
            .field("records", &self.records.len())
            .field("users", &self.users.len())
            .finish_non_exhaustive()
    }
}

impl JsonCatalog {
    /// Loads a dump from `path`.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&raw)?;
        debug!(
            "Loaded {} catalog records and {} user lists from {}",
            catalog.records.len(),
            catalog.users.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parses a dump from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let dump: CatalogDump = serde_json::from_str(raw)?;
        Ok(Self::new(dump.records, dump.users))
    }

    #[must_use]
    pub fn new(records: Vec<CatalogRecord>, users: HashMap<String, Vec<ListEntry>>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.id, position))
            .collect();
        let resolver: Box<dyn TitleResolver> =
            Box::new(ExactTitleResolver::from_records(&records));
        Self {
            records,
            index,
            users,
            resolver,
        }
    }

    /// Replaces the title resolver used for list entries without an id.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl TitleResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    fn record(&self, id: RecordId) -> Option<&CatalogRecord> {
        self.index.get(&id).map(|&position| &self.records[position])
    }

    fn user_list(&self, user: &str) -> Result<&[ListEntry], CatalogError> {
        self.users
            .get(user)
            .map(Vec::as_slice)
            .ok_or_else(|| CatalogError::UnknownUser(user.to_string()))
    }

    /// Catalog id for a list entry, through the resolver when only a title is given.
    fn entry_id(&self, entry: &ListEntry) -> Option<RecordId> {
        match (entry.id, entry.title.as_deref()) {
            (Some(id), _) => Some(id),
            (None, Some(title)) => {
                let resolved = self.resolver.resolve(title);
                if resolved.is_none() {
                    warn!("No catalog record matches list entry \u{201c}{title}\u{201d}, skipping");
                }
                resolved
            }
            (None, None) => None,
        }
    }

    /// Records sorted by descending average score; unscored titles last.
    fn ranked(&self) -> Vec<&CatalogRecord> {
        let mut ranked: Vec<&CatalogRecord> = self.records.iter().collect();
        ranked.sort_by(|a, b| {
            let a = a.average_score.unwrap_or(f64::NEG_INFINITY);
            let b = b.average_score.unwrap_or(f64::NEG_INFINITY);
            b.total_cmp(&a)
        });
        ranked
    }
}

impl CatalogSource for JsonCatalog {
    fn fetch_rating_history(&self, user: &str) -> Result<Vec<RatedRecord>, CatalogError> {
        let mut history = Vec::new();
        for entry in self.user_list(user)? {
            let Some(id) = self.entry_id(entry) else {
                continue;
            };
            let record = self.fetch_candidate(id)?;
            history.push(RatedRecord {
                record,
                score: entry.score,
            });
        }
        Ok(history)
    }

    fn fetch_candidate(&self, id: RecordId) -> Result<CatalogRecord, CatalogError> {
        self.record(id)
            .cloned()
            .ok_or(CatalogError::UnknownRecord(id))
    }

    fn fetch_candidate_batch(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<CandidateStub>, CatalogError> {
        let stubs = match filter {
            CandidateFilter::Season { year, season } => self
                .records
                .iter()
                .filter(|record| record.year == Some(*year) && record.season == Some(*season))
                .map(CandidateStub::from)
                .collect(),
            CandidateFilter::Top { pages } => {
                let limit = TOP_PAGE_SIZE.saturating_mul(*pages as usize);
                self.ranked()
                    .into_iter()
                    .take(limit)
                    .map(CandidateStub::from)
                    .collect()
            }
            CandidateFilter::WatchedBy { user } => {
                let mut stubs = Vec::new();
                for entry in self.user_list(user)? {
                    if let Some(id) = self.entry_id(entry) {
                        let record = self.record(id).ok_or(CatalogError::UnknownRecord(id))?;
                        stubs.push(CandidateStub::from(record));
                    }
                }
                stubs
            }
        };
        Ok(stubs)
    }
}
