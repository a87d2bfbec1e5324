//! Confidence weighting and recommendation scoring.
//!
//! Turns the per-tag statistics of a [`PreferenceModel`] into confidence
//! weights, and combines the weights of the tags a candidate carries into one
//! score.
//!
//! ```text
//! spread(t) = (stdev(t) + 4 / count(t)) / prior(class(t))
//! weight(t) = 1 / (1 + spread(t))
//! score(c)  = Σ mean(t)·weight(t) / Σ weight(t)     over matched tags t of c
//! ```

use crate::catalog::{CandidateStub, CatalogRecord, RecordId};
use crate::model::{PreferenceModel, TagStatistic};
use crate::tags::{extract_tags, FeatureTag, MainStudioPolicy, TagClass};
use log::trace;
use std::collections::HashMap;

/// Spread contributed by sample scarcity, divided by the sample count.
const SCARCITY_SPREAD: f64 = 4.0;

lazy_static::lazy_static! {
    /// Priors for staff roles that carry more (or less) signal than a generic credit.
    static ref STAFF_ROLE_PRIORS: HashMap<&'static str, f64> = [
        ("Director", 1.0),
        ("Script", 1.0),
        ("Storyboard", 0.7),
        ("Screenplay", 0.7),
        ("Music", 1.0),
        ("Sound Director", 0.5),
        ("Art Director", 1.0),
        ("Key Animation", 0.3),
        ("Episode Director", 1.0),
        ("Animation Director", 0.3),
        ("Character Design", 0.7),
        ("Series Composition", 0.3),
        ("Original Creator", 0.4),
        ("Special Effects", 0.2),
        ("Theme Song Composition", 0.3),
        ("Original Character Design", 0.7),
        ("Chief Animation Director", 0.2),
    ]
    .into_iter()
    .collect();
}

/// Prior trust in a tag class. Staff tags prefer their role's prior.
#[must_use]
pub fn prior_for(tag: &FeatureTag) -> f64 {
    match tag {
        FeatureTag::Staff {
            role: Some(role), ..
        } => STAFF_ROLE_PRIORS
            .get(role.as_str())
            .copied()
            .unwrap_or_else(|| class_prior(TagClass::Staff)),
        other => class_prior(other.class()),
    }
}

const fn class_prior(class: TagClass) -> f64 {
    match class {
        TagClass::Genre => 1.0,
        TagClass::Studio => 0.3,
        TagClass::Staff => 0.1,
        TagClass::Classification => 0.1,
    }
}

/// Weight in (0, 1] for a tag observed `samples` times with spread `stdev`.
///
/// # Examples
///
/// ```
/// use animuse::algorithm::confidence_weight;
///
/// assert!((confidence_weight(2, 1.0, 1.0) - 0.25).abs() < 1e-12);
/// ```
#[must_use]
pub fn confidence_weight(samples: usize, stdev: f64, prior: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let scarcity = SCARCITY_SPREAD / samples.max(1) as f64;
    let spread = (stdev + scarcity) / prior;
    1.0 / (1.0 + spread)
}

/// Trust placed in one tag's historical mean.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceWeight {
    pub tag: FeatureTag,
    pub mean: f64,
    pub weight: f64,
}

impl From<&TagStatistic> for ConfidenceWeight {
    fn from(stat: &TagStatistic) -> Self {
        Self {
            tag: stat.tag.clone(),
            mean: stat.mean,
            weight: confidence_weight(stat.samples, stat.stdev, prior_for(&stat.tag)),
        }
    }
}

/// Confidence weights of every modeled tag, computed once per scoring run.
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    weights: HashMap<FeatureTag, ConfidenceWeight>,
}

impl WeightTable {
    #[must_use]
    pub fn from_model(model: &PreferenceModel) -> Self {
        let weights = model
            .statistics()
            .map(|stat| {
                let weighted = ConfidenceWeight::from(stat);
                trace!(
                    "{}: mean {:.2}, weight {:.3}",
                    weighted.tag,
                    weighted.mean,
                    weighted.weight
                );
                (stat.tag.clone(), weighted)
            })
            .collect();
        Self { weights }
    }

    #[must_use]
    pub fn get(&self, tag: &FeatureTag) -> Option<&ConfidenceWeight> {
        self.weights.get(tag)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Score of one record against a weight table.
#[derive(Debug, Clone, PartialEq)]
pub struct TagScore {
    /// Weighted mean of matched tag means; `-inf` when nothing matched.
    pub calc_score: f64,
    /// Sum of matched weights.
    pub total_weight: f64,
    /// Matched tags, heaviest first. Empty when nothing matched.
    pub matched: Vec<ConfidenceWeight>,
}

impl TagScore {
    const UNMATCHED: Self = Self {
        calc_score: f64::NEG_INFINITY,
        total_weight: 0.0,
        matched: Vec::new(),
    };

    #[must_use]
    pub fn is_unmatched(&self) -> bool {
        self.matched.is_empty()
    }

    /// `"tag (mean * weight)"` per matched tag, joined with `", "`.
    #[must_use]
    pub fn explanation(&self) -> Option<String> {
        if self.is_unmatched() {
            return None;
        }
        let parts: Vec<String> = self
            .matched
            .iter()
            .map(|w| format!("{} ({:.2} * {:.2})", w.tag, w.mean, w.weight))
            .collect();
        Some(parts.join(", "))
    }
}

/// Scores `record` against `weights`.
///
/// Tags are extracted with `policy`; the model itself was built with
/// [`MainStudioPolicy::Duplicate`], so [`MainStudioPolicy::ExtraTag`] keeps a
/// main studio from being counted twice here.
#[must_use]
pub fn score_record(
    record: &CatalogRecord,
    weights: &WeightTable,
    policy: MainStudioPolicy,
) -> TagScore {
    let mut matched: Vec<ConfidenceWeight> = extract_tags(record, policy)
        .iter()
        .filter_map(|tag| weights.get(tag).cloned())
        .collect();

    if matched.is_empty() {
        return TagScore::UNMATCHED;
    }

    let total_weight: f64 = matched.iter().map(|w| w.weight).sum();
    let weighted_sum: f64 = matched.iter().map(|w| w.mean * w.weight).sum();
    matched.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    TagScore {
        calc_score: weighted_sum / total_weight,
        total_weight,
        matched,
    }
}

/// A candidate after scoring, ready for ranking and display.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub id: RecordId,
    pub title: String,
    pub avg_score: Option<f64>,
    pub episodes: Option<u32>,
    pub calc_score: f64,
    pub total_weight: f64,
    pub explanation: Option<String>,
}

impl ScoredCandidate {
    #[must_use]
    pub fn new(stub: &CandidateStub, score: &TagScore) -> Self {
        Self {
            id: stub.id,
            title: stub.display_title(),
            avg_score: stub.average_score,
            episodes: stub.episodes,
            calc_score: score.calc_score,
            total_weight: score.total_weight,
            explanation: score.explanation(),
        }
    }
}

/// Stable sort by descending score; unmatched candidates end up last.
pub fn rank(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| b.calc_score.total_cmp(&a.calc_score));
}

/// Summary statistics over plain samples.
pub mod statistics {
    /// Arithmetic mean; `0.0` for no samples.
    #[must_use]
    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = samples.len() as f64;
        samples.iter().sum::<f64>() / n
    }

    /// Population standard deviation (divides by N); `0.0` for no samples.
    #[must_use]
    pub fn population_stdev(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let avg = mean(samples);
        let squares: Vec<f64> = samples.iter().map(|&s| (s - avg).powi(2)).collect();
        mean(&squares).sqrt()
    }
}
