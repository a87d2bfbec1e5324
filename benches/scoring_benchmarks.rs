//! # Animuse Performance Benchmarks
//!
//! ## Benchmark Categories
//!
//! - **Tag Extraction**: Role normalization and per-record tag extraction
//! - **Model Building**: Per-tag statistics over rating histories of varying size
//! - **Scoring**: Weight table construction and candidate ranking
//! - **Snapshot**: Saving and loading the model through SQLite
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench scoring
//! ```

use animuse::algorithm::{self, WeightTable};
use animuse::catalog::{CandidateStub, CatalogRecord, RatedRecord, StaffCredit, StudioCredit};
use animuse::db::{Snapshot, Store};
use animuse::model::build_model;
use animuse::recommend::recommend;
use animuse::role::normalize_role;
use animuse::tags::{extract_tags, MainStudioPolicy};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::hint::black_box;

const GENRES: [&str; 8] = [
    "Action", "Comedy", "Drama", "Mystery", "Romance", "Sci-Fi", "Slice of Life", "Sports",
];
const ROLES: [&str; 5] = [
    "Director",
    "Script (eps 1-12)",
    "Music",
    "Storyboard (OP, ED (ep 3))",
    "Key Animation",
];

/// Helper function to create catalog records with overlapping tags
fn create_test_records(count: usize) -> Vec<CatalogRecord> {
    (1..=count)
        .map(|i| CatalogRecord {
            id: i as u32,
            title: format!("Title {i:04}"),
            average_score: Some(50.0 + (i % 50) as f64),
            episodes: Some(12 + (i % 3) as u32 * 12),
            genres: (0..3)
                .map(|g| GENRES[(i + g * 3) % GENRES.len()].to_string())
                .collect(),
            studios: vec![
                StudioCredit {
                    name: format!("Studio {}", i % 15),
                    main: true,
                },
                StudioCredit {
                    name: format!("Studio {}", (i + 7) % 15),
                    main: false,
                },
            ],
            staff: (0..4)
                .map(|s| StaffCredit {
                    last_name: format!("Staff{}", (i * 3 + s) % 60),
                    first_name: "Test".to_string(),
                    role: Some(ROLES[(i + s) % ROLES.len()].to_string()),
                })
                .collect(),
            classification: (if i % 4 == 0 { "R - 17+" } else { "PG-13" }).to_string(),
            ..Default::default()
        })
        .collect()
}

fn create_test_history(count: usize) -> Vec<RatedRecord> {
    create_test_records(count)
        .into_iter()
        .enumerate()
        .map(|(i, record)| RatedRecord {
            record,
            score: (3 + i % 8) as f64,
        })
        .collect()
}

fn benchmark_tag_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("tag_extraction");

    group.bench_function("normalize_nested_role", |b| {
        b.iter(|| normalize_role(black_box("Storyboard (OP, ED (ep 3)), Director (eps 1-2)")))
    });

    let record = create_test_records(1).remove(0);
    for policy in [
        MainStudioPolicy::Plain,
        MainStudioPolicy::Duplicate,
        MainStudioPolicy::ExtraTag,
    ] {
        group.bench_with_input(
            BenchmarkId::new("extract_tags", format!("{policy:?}")),
            &record,
            |b, record| b.iter(|| extract_tags(black_box(record), policy)),
        );
    }

    group.finish();
}

fn benchmark_model_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_building");

    for size in [10, 100, 500, 1000].iter() {
        let history = create_test_history(*size);
        group.bench_with_input(BenchmarkId::new("build_model", size), &history, |b, history| {
            b.iter(|| build_model(black_box(history), |_, _| {}))
        });
    }

    group.finish();
}

fn benchmark_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let model = build_model(&create_test_history(500), |_, _| {});

    group.bench_function("weight_table", |b| {
        b.iter(|| WeightTable::from_model(black_box(&model)))
    });

    let weights = WeightTable::from_model(&model);
    let record = create_test_records(1).remove(0);
    group.bench_function("score_record", |b| {
        b.iter(|| {
            algorithm::score_record(
                black_box(&record),
                black_box(&weights),
                MainStudioPolicy::ExtraTag,
            )
        })
    });

    for size in [40, 120, 400].iter() {
        let candidates: Vec<(CandidateStub, CatalogRecord)> = create_test_records(*size)
            .into_iter()
            .map(|record| (CandidateStub::from(&record), record))
            .collect();
        group.bench_with_input(
            BenchmarkId::new("recommend", size),
            &candidates,
            |b, candidates| {
                b.iter(|| recommend(black_box(&model), candidates, MainStudioPolicy::ExtraTag))
            },
        );
    }

    group.finish();
}

fn benchmark_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    let snapshot = Snapshot {
        user: Some("bench".to_string()),
        model: Some(build_model(&create_test_history(500), |_, _| {})),
    };

    group.bench_function("save_and_load", |b| {
        b.iter_batched(
            || Store::open_in_memory().expect("Failed to open store"),
            |mut store| {
                store.save(&snapshot).expect("Failed to save snapshot");
                store.load().expect("Failed to load snapshot")
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_tag_extraction,
    benchmark_model_building,
    benchmark_scoring,
    benchmark_snapshot
);
criterion_main!(benches);
