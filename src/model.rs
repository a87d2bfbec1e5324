//! # Preference Model
//!
//! Aggregates a user's rated history into per-tag statistics.
//!
//! Every watched title is expanded into its feature tags (main studios are
//! counted twice, once plain and once as `(main)`), each tag receives the
//! title's score as one sample, and samples are summarized per tag as
//! `(count, mean, stdev)`. Mean and standard deviation are unweighted over the
//! raw samples; the deviation is the population one.

use crate::algorithm::statistics;
use crate::catalog::{RatedRecord, RecordId};
use crate::tags::{extract_tags, FeatureTag, MainStudioPolicy};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One score attributed to one tag.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSample {
    pub tag: FeatureTag,
    pub score: f64,
}

/// Summary of all samples sharing a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagStatistic {
    pub tag: FeatureTag,
    pub samples: usize,
    pub mean: f64,
    pub stdev: f64,
}

/// Per-tag statistics plus the ids of every title the history contained.
///
/// Serializes as `{ "stats": [TagStatistic, ...], "seen": [id, ...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceModel {
    #[serde(with = "stats_as_list")]
    stats: BTreeMap<FeatureTag, TagStatistic>,
    seen: BTreeSet<RecordId>,
}

impl PreferenceModel {
    /// Assembles a model from already computed parts, e.g. a stored snapshot.
    #[must_use]
    pub fn from_parts(
        stats: impl IntoIterator<Item = TagStatistic>,
        seen: impl IntoIterator<Item = RecordId>,
    ) -> Self {
        Self {
            stats: stats
                .into_iter()
                .map(|stat| (stat.tag.clone(), stat))
                .collect(),
            seen: seen.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn get(&self, tag: &FeatureTag) -> Option<&TagStatistic> {
        self.stats.get(tag)
    }

    /// Statistics in key order.
    pub fn statistics(&self) -> impl Iterator<Item = &TagStatistic> {
        self.stats.values()
    }

    #[must_use]
    pub fn seen(&self) -> &BTreeSet<RecordId> {
        &self.seen
    }

    #[must_use]
    pub fn has_seen(&self, id: RecordId) -> bool {
        self.seen.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// All statistics sorted by descending mean. Equal means keep key order.
    #[must_use]
    pub fn listing(&self) -> Vec<TagStatistic> {
        let mut listing: Vec<TagStatistic> = self.stats.values().cloned().collect();
        listing.sort_by(|a, b| b.mean.total_cmp(&a.mean));
        listing
    }
}

/// Tags are not strings, so the map goes over the wire as its values.
mod stats_as_list {
    use super::{FeatureTag, TagStatistic};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(
        stats: &BTreeMap<FeatureTag, TagStatistic>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(stats.values())
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<FeatureTag, TagStatistic>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let list = Vec::<TagStatistic>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|stat| (stat.tag.clone(), stat))
            .collect())
    }
}

/// Expands the history into one sample per (title, emitted tag).
#[must_use]
pub fn expand_samples(history: &[RatedRecord]) -> Vec<RatingSample> {
    history
        .iter()
        .flat_map(|rated| {
            extract_tags(&rated.record, MainStudioPolicy::Duplicate)
                .into_iter()
                .map(move |tag| RatingSample {
                    tag,
                    score: rated.score,
                })
        })
        .collect()
}

/// Builds the preference model from a rated history.
///
/// `progress` is called with `(done, total)` after every title. An empty
/// history yields an empty model.
pub fn build_model<F>(history: &[RatedRecord], mut progress: F) -> PreferenceModel
where
    F: FnMut(usize, usize),
{
    if history.is_empty() {
        warn!("Rating history is empty, the preference model will be empty too");
    }

    let total = history.len();
    let mut votes: BTreeMap<FeatureTag, Vec<f64>> = BTreeMap::new();
    let mut seen = BTreeSet::new();

    for (done, rated) in history.iter().enumerate() {
        seen.insert(rated.record.id);
        for sample in expand_samples(std::slice::from_ref(rated)) {
            votes.entry(sample.tag).or_default().push(sample.score);
        }
        progress(done + 1, total);
    }

    let stats = votes.into_iter().map(|(tag, scores)| TagStatistic {
        tag,
        samples: scores.len(),
        mean: statistics::mean(&scores),
        stdev: statistics::population_stdev(&scores),
    });

    let model = PreferenceModel::from_parts(stats, seen);
    debug!(
        "Built preference model with {} tags from {} titles",
        model.len(),
        total
    );
    model
}
