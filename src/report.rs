//! Plain-text rendering of the model listing and the tiered recommendations.

use crate::algorithm::ScoredCandidate;
use crate::model::TagStatistic;
use crate::tiers::WeightClasses;
use std::fmt::Write;

/// One line per tag: `"Genre: Drama (12): 8.25 ±0.90"`.
#[must_use]
pub fn render_listing(listing: &[TagStatistic]) -> String {
    listing
        .iter()
        .map(|stat| {
            format!(
                "{} ({}): {:.2} \u{b1}{:.2}",
                stat.tag, stat.samples, stat.mean, stat.stdev
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Weight classes from the heaviest down, each candidate with its calculation.
#[must_use]
pub fn render_tiers(classes: &WeightClasses) -> String {
    let mut out = String::new();
    for (index, members) in classes.display_order() {
        let _ = write!(out, "\n=== weight class {index}+ ===\n\n");
        for candidate in members {
            out.push_str(&render_candidate(candidate));
            out.push('\n');
        }
    }
    out
}

fn render_candidate(candidate: &ScoredCandidate) -> String {
    let average = candidate
        .avg_score
        .map_or_else(|| "n/a".to_string(), |score| format!("{score:.2}"));
    let episodes = candidate
        .episodes
        .map_or_else(|| "?".to_string(), |episodes| episodes.to_string());

    format!(
        "- C {:.2} (w {:.1}), A {average}: {} ({}, {episodes} episodes)\n  {}",
        candidate.calc_score,
        candidate.total_weight,
        candidate.title,
        candidate.id,
        candidate.explanation.as_deref().unwrap_or("")
    )
}
