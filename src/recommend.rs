//! # Recommendation Pipeline
//!
//! From a candidate filter to a ranked, weight-classed list:
//!
//! 1. fetch the candidate stubs for the filter
//! 2. drop duplicate ids (first occurrence wins)
//! 3. optionally drop titles the user has already seen
//! 4. hydrate every stub into its full record
//! 5. score against the model's weight table, rank, bucket
//!
//! Hydration is sequential unless more than one job is requested, in which
//! case it runs on a bounded rayon pool. Results are gathered back in input
//! order either way, and the first failed fetch aborts the run.

use crate::algorithm::{rank, score_record, ScoredCandidate, WeightTable};
use crate::catalog::{CandidateFilter, CandidateStub, CatalogRecord, CatalogSource};
use crate::model::PreferenceModel;
use crate::tags::MainStudioPolicy;
use crate::tiers::WeightClasses;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Knobs for one recommendation run.
#[derive(Debug, Clone)]
pub struct RecommendOptions {
    pub filter: CandidateFilter,
    /// Skip titles already in the model's history.
    pub only_new: bool,
    pub policy: MainStudioPolicy,
    /// Concurrent fetches; `1` keeps hydration sequential.
    pub jobs: usize,
}

impl RecommendOptions {
    #[must_use]
    pub fn new(filter: CandidateFilter) -> Self {
        Self {
            filter,
            only_new: false,
            policy: MainStudioPolicy::ExtraTag,
            jobs: 1,
        }
    }
}

/// Ranked candidates and their weight-class view.
#[derive(Debug, Clone, Default)]
pub struct Recommendations {
    pub ranked: Vec<ScoredCandidate>,
    pub classes: WeightClasses,
}

/// Scores already hydrated candidates against `model`.
///
/// Candidates are ranked by descending score, ties keep input order.
#[must_use]
pub fn recommend(
    model: &PreferenceModel,
    candidates: &[(CandidateStub, CatalogRecord)],
    policy: MainStudioPolicy,
) -> Recommendations {
    let weights = WeightTable::from_model(model);
    if weights.is_empty() {
        warn!("Preference model is empty, no candidate can match it");
    } else {
        debug!(
            "Scoring {} candidates against {} weighted tags",
            candidates.len(),
            weights.len()
        );
    }

    let mut ranked: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|(stub, record)| {
            let score = score_record(record, &weights, policy);
            if score.is_unmatched() {
                debug!("{} shares no tags with the model", stub.display_title());
            }
            ScoredCandidate::new(stub, &score)
        })
        .collect();
    rank(&mut ranked);

    let unmatched = ranked.iter().filter(|c| c.total_weight == 0.0).count();
    if unmatched > 0 {
        warn!("{unmatched} candidates matched no modeled tag");
    }

    Recommendations {
        classes: WeightClasses::bucket(ranked.clone()),
        ranked,
    }
}

/// Runs the full pipeline against `source`.
///
/// # Arguments
///
/// * `model` - Preference model the candidates are scored against
/// * `source` - Catalog the candidate batch and full records come from
/// * `options` - Candidate filter, `only_new`, main studio policy and job count
/// * `progress` - Receives `(hydrated, total)` after every fetched record.
///   Called from worker threads when `options.jobs > 1`.
///
/// # Returns
///
/// * `Result<Recommendations>` - Candidates ranked by descending score,
///   unmatched ones last, together with their weight classes
///
/// # Errors
///
/// - The candidate batch cannot be fetched
/// - Any single record fails to hydrate; the run stops at the first failure
/// - The worker pool cannot be started
pub fn run(
    model: &PreferenceModel,
    source: &dyn CatalogSource,
    options: &RecommendOptions,
    progress: &(dyn Fn(usize, usize) + Sync),
) -> Result<Recommendations> {
    let stubs = source
        .fetch_candidate_batch(&options.filter)
        .with_context(|| format!("Failed to fetch candidates for {:?}", options.filter))?;
    let fetched = stubs.len();

    let mut stubs = dedup_by_id(stubs);
    if options.only_new {
        stubs.retain(|stub| !model.has_seen(stub.id));
    }
    info!(
        "Scoring {} of {} fetched candidates",
        stubs.len(),
        fetched
    );

    let records = hydrate(source, &stubs, options.jobs, progress)?;
    let candidates: Vec<(CandidateStub, CatalogRecord)> = stubs.into_iter().zip(records).collect();

    Ok(recommend(model, &candidates, options.policy))
}

/// Keeps the first stub for every id.
fn dedup_by_id(stubs: Vec<CandidateStub>) -> Vec<CandidateStub> {
    let mut ids = HashSet::new();
    stubs.into_iter().filter(|stub| ids.insert(stub.id)).collect()
}

/// Fetches the full record of every stub, in stub order.
fn hydrate(
    source: &dyn CatalogSource,
    stubs: &[CandidateStub],
    jobs: usize,
    progress: &(dyn Fn(usize, usize) + Sync),
) -> Result<Vec<CatalogRecord>> {
    let total = stubs.len();
    let done = AtomicUsize::new(0);
    let fetch = |stub: &CandidateStub| -> Result<CatalogRecord> {
        let record = source
            .fetch_candidate(stub.id)
            .with_context(|| format!("Failed to fetch {} ({})", stub.display_title(), stub.id))?;
        progress(done.fetch_add(1, Ordering::SeqCst) + 1, total);
        Ok(record)
    };

    if jobs <= 1 {
        return stubs.iter().map(fetch).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to start fetch worker pool")?;
    debug!("Hydrating {total} candidates on {jobs} workers");
    pool.install(|| stubs.par_iter().map(fetch).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogError, RatedRecord, RecordId};
    use crate::model::build_model;
    use std::sync::Mutex;

    /// Candidates 1..=n with genre "Action" for odd ids and "Drama" for even ones.
    struct FakeSource {
        batch: Vec<RecordId>,
        broken: Option<RecordId>,
        fetched: Mutex<Vec<RecordId>>,
    }

    impl FakeSource {
        fn new(batch: Vec<RecordId>) -> Self {
            Self {
                batch,
                broken: None,
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn record(id: RecordId) -> CatalogRecord {
            let genre = if id % 2 == 1 { "Action" } else { "Drama" };
            CatalogRecord {
                id,
                title: format!("Title {id}"),
                genres: vec![genre.to_string()],
                ..Default::default()
            }
        }
    }

    impl CatalogSource for FakeSource {
        fn fetch_rating_history(&self, _user: &str) -> Result<Vec<RatedRecord>, CatalogError> {
            Ok(Vec::new())
        }

        fn fetch_candidate(&self, id: RecordId) -> Result<CatalogRecord, CatalogError> {
            if self.broken == Some(id) {
                return Err(CatalogError::UnknownRecord(id));
            }
            self.fetched.lock().unwrap().push(id);
            Ok(Self::record(id))
        }

        fn fetch_candidate_batch(
            &self,
            _filter: &CandidateFilter,
        ) -> Result<Vec<CandidateStub>, CatalogError> {
            Ok(self
                .batch
                .iter()
                .map(|&id| CandidateStub::from(&Self::record(id)))
                .collect())
        }
    }

    fn model() -> PreferenceModel {
        let history = vec![
            RatedRecord {
                record: FakeSource::record(101),
                score: 9.0,
            },
            RatedRecord {
                record: FakeSource::record(102),
                score: 4.0,
            },
        ];
        build_model(&history, |_, _| {})
    }

    fn ids(candidates: &[ScoredCandidate]) -> Vec<RecordId> {
        candidates.iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_pipeline_dedups_and_ranks() -> Result<()> {
        let source = FakeSource::new(vec![2, 1, 2, 3]);
        let options = RecommendOptions::new(CandidateFilter::Top { pages: 1 });

        let recs = run(&model(), &source, &options, &|_, _| {})?;
        assert_eq!(ids(&recs.ranked), vec![1, 3, 2]);
        assert_eq!(*source.fetched.lock().unwrap(), vec![2, 1, 3]);
        Ok(())
    }

    #[test]
    fn test_only_new_skips_seen_titles() -> Result<()> {
        let source = FakeSource::new(vec![101, 1, 102]);
        let mut options = RecommendOptions::new(CandidateFilter::Top { pages: 1 });
        options.only_new = true;

        let recs = run(&model(), &source, &options, &|_, _| {})?;
        assert_eq!(ids(&recs.ranked), vec![1]);
        Ok(())
    }

    #[test]
    fn test_failed_fetch_aborts_run() {
        let mut source = FakeSource::new(vec![1, 2, 3]);
        source.broken = Some(2);
        let options = RecommendOptions::new(CandidateFilter::Top { pages: 1 });

        let err = run(&model(), &source, &options, &|_, _| {}).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::UnknownRecord(2))
        ));
        assert_eq!(*source.fetched.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_parallel_hydration_matches_sequential() -> Result<()> {
        let batch: Vec<RecordId> = (1..=50).collect();
        let sequential = run(
            &model(),
            &FakeSource::new(batch.clone()),
            &RecommendOptions::new(CandidateFilter::Top { pages: 2 }),
            &|_, _| {},
        )?;

        let mut options = RecommendOptions::new(CandidateFilter::Top { pages: 2 });
        options.jobs = 4;
        let progress_calls = AtomicUsize::new(0);
        let parallel = run(&model(), &FakeSource::new(batch), &options, &|_, total| {
            assert_eq!(total, 50);
            progress_calls.fetch_add(1, Ordering::SeqCst);
        })?;

        assert_eq!(ids(&parallel.ranked), ids(&sequential.ranked));
        assert_eq!(progress_calls.load(Ordering::SeqCst), 50);
        Ok(())
    }

    #[test]
    fn test_empty_model_leaves_every_candidate_unmatched() {
        let record = FakeSource::record(1);
        let candidates = vec![(CandidateStub::from(&record), record)];

        let recs = recommend(
            &PreferenceModel::default(),
            &candidates,
            MainStudioPolicy::ExtraTag,
        );
        assert_eq!(recs.ranked.len(), 1);
        assert_eq!(recs.ranked[0].calc_score, f64::NEG_INFINITY);
        assert_eq!(recs.ranked[0].explanation, None);
        assert_eq!(recs.classes.class(0).len(), 1);
    }

    #[test]
    fn test_unmatched_candidates_rank_last_in_class_zero() {
        let history = vec![RatedRecord {
            record: CatalogRecord {
                id: 9,
                genres: vec!["Action".to_string()],
                classification: "PG".to_string(),
                ..Default::default()
            },
            score: 7.0,
        }];
        let model = build_model(&history, |_, _| {});
        let matched = CatalogRecord {
            id: 1,
            genres: vec!["Action".to_string()],
            ..Default::default()
        };
        let unmatched = CatalogRecord {
            id: 2,
            genres: vec!["Romance".to_string()],
            classification: "G".to_string(),
            ..Default::default()
        };
        let candidates = vec![
            (CandidateStub::from(&unmatched), unmatched),
            (CandidateStub::from(&matched), matched),
        ];

        let recs = recommend(&model, &candidates, MainStudioPolicy::ExtraTag);
        assert_eq!(ids(&recs.ranked), vec![1, 2]);
        assert_eq!(recs.ranked[1].calc_score, f64::NEG_INFINITY);
        assert_eq!(ids(recs.classes.class(0)), vec![1, 2]);
    }
}
