//! Feature tags: the modeling unit of the preference model.
//!
//! A title is broken down into genre, studio, staff and classification tags.
//! Each tag renders to a stable string key (`"Genre: Drama"`,
//! `"Staff: Director: Nagahama, Hiroshi"`, ...) which is what the model is
//! keyed and persisted by.

use crate::catalog::{CatalogRecord, StaffCredit};
use crate::role::normalize_role;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const MAIN_SUFFIX: &str = " (main)";

/// Tag class, the part of the key before the first colon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Genre,
    Studio,
    Staff,
    Classification,
}

impl TagClass {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Genre => "Genre",
            Self::Studio => "Studio",
            Self::Staff => "Staff",
            Self::Classification => "Classification",
        }
    }

    /// Inverse of [`TagClass::prefix`].
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        [Self::Genre, Self::Studio, Self::Staff, Self::Classification]
            .into_iter()
            .find(|class| class.prefix() == prefix)
    }
}

/// One labeled attribute of a title.
///
/// Equality, ordering and hashing follow the rendered key, so two tags are the
/// same tag exactly when they print the same. The key is not parsed back: a
/// role or name may itself contain `": "`, so tags are serialized and stored
/// field by field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeatureTag {
    Genre(String),
    Studio { name: String, main: bool },
    Staff { role: Option<String>, name: String },
    Classification(String),
}

impl FeatureTag {
    #[must_use]
    pub const fn class(&self) -> TagClass {
        match self {
            Self::Genre(_) => TagClass::Genre,
            Self::Studio { .. } => TagClass::Studio,
            Self::Staff { .. } => TagClass::Staff,
            Self::Classification(_) => TagClass::Classification,
        }
    }

    /// Canonical string key.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Reassembles a tag from its stored fields. `role` only applies to staff
    /// tags and `main` only to studio tags.
    #[must_use]
    pub fn from_parts(class: TagClass, name: String, role: Option<String>, main: bool) -> Self {
        match class {
            TagClass::Genre => Self::Genre(name),
            TagClass::Studio => Self::Studio { name, main },
            TagClass::Staff => Self::Staff { role, name },
            TagClass::Classification => Self::Classification(name),
        }
    }

    /// The genre, studio, person or classification label.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Genre(name) | Self::Classification(name) => name,
            Self::Studio { name, .. } | Self::Staff { name, .. } => name,
        }
    }

    #[must_use]
    pub fn role(&self) -> Option<&str> {
        match self {
            Self::Staff { role, .. } => role.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_main(&self) -> bool {
        matches!(self, Self::Studio { main: true, .. })
    }
}

impl fmt::Display for FeatureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.class().prefix();
        match self {
            Self::Genre(name) | Self::Classification(name) => write!(f, "{prefix}: {name}"),
            Self::Studio { name, main: false } => write!(f, "{prefix}: {name}"),
            Self::Studio { name, main: true } => write!(f, "{prefix}: {name}{MAIN_SUFFIX}"),
            Self::Staff { role: Some(role), name } => write!(f, "{prefix}: {role}: {name}"),
            Self::Staff { role: None, name } => write!(f, "{prefix}: {name}"),
        }
    }
}

impl PartialEq for FeatureTag {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for FeatureTag {}

impl Hash for FeatureTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for FeatureTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FeatureTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// How a title's principal studio is turned into tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MainStudioPolicy {
    /// Only the plain studio tag.
    Plain,
    /// The plain tag and the `(main)` tag.
    Duplicate,
    /// Only the `(main)` tag.
    #[default]
    ExtraTag,
}

impl FromStr for MainStudioPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "duplicate" | "double" => Ok(Self::Duplicate),
            "extra" | "extra-tag" => Ok(Self::ExtraTag),
            other => Err(format!(
                "Unknown main studio policy: {other}. Use plain, duplicate or extra"
            )),
        }
    }
}

/// Extracts the feature tags of `record`.
///
/// Order: genres, studios, staff, then exactly one classification tag.
/// Duplicates are kept.
///
/// # Examples
///
/// ```
/// use animuse::catalog::{CatalogRecord, StudioCredit};
/// use animuse::tags::{extract_tags, MainStudioPolicy};
///
/// let record = CatalogRecord {
///     studios: vec![StudioCredit { name: "Madhouse".to_string(), main: true }],
///     ..Default::default()
/// };
/// let keys: Vec<String> = extract_tags(&record, MainStudioPolicy::ExtraTag)
///     .iter()
///     .map(ToString::to_string)
///     .collect();
/// assert_eq!(keys, ["Studio: Madhouse (main)", "Classification: "]);
/// ```
#[must_use]
pub fn extract_tags(record: &CatalogRecord, policy: MainStudioPolicy) -> Vec<FeatureTag> {
    let genres = record
        .genres
        .iter()
        .map(|genre| FeatureTag::Genre(genre.clone()));

    let studios = record.studios.iter().flat_map(|studio| {
        let plain = || FeatureTag::Studio {
            name: studio.name.clone(),
            main: false,
        };
        let main = || FeatureTag::Studio {
            name: studio.name.clone(),
            main: true,
        };
        match (studio.main, policy) {
            (true, MainStudioPolicy::Duplicate) => vec![plain(), main()],
            (true, MainStudioPolicy::ExtraTag) => vec![main()],
            _ => vec![plain()],
        }
    });

    let staff = record.staff.iter().flat_map(staff_tags);

    genres
        .chain(studios)
        .chain(staff)
        .chain(std::iter::once(FeatureTag::Classification(
            record.classification.clone(),
        )))
        .collect()
}

/// "last, first" when both are present, else whichever one is.
fn display_name(credit: &StaffCredit) -> Option<String> {
    match (credit.last_name.is_empty(), credit.first_name.is_empty()) {
        (true, true) => None,
        (true, false) => Some(credit.first_name.clone()),
        (false, true) => Some(credit.last_name.clone()),
        (false, false) => Some(format!("{}, {}", credit.last_name, credit.first_name)),
    }
}

/// One tag per comma-separated role of the credit.
fn staff_tags(credit: &StaffCredit) -> Vec<FeatureTag> {
    let Some(name) = display_name(credit) else {
        return Vec::new();
    };
    let roles = normalize_role(credit.role.as_deref().unwrap_or(""));

    roles
        .split(',')
        .map(str::trim)
        .map(|role| FeatureTag::Staff {
            role: (!role.is_empty()).then(|| role.to_string()),
            name: name.clone(),
        })
        .collect()
}
