//! Weight classes: ranked recommendations grouped by how much evidence backs them.
//!
//! Class `n` holds the candidates whose total matched weight lies in
//! `[n, n + 1)`. Classes are filled by repeatedly peeling off, at ascending
//! thresholds, everything still below the threshold, so ranking order inside a
//! class is the order the candidates came in.

use crate::algorithm::ScoredCandidate;
use log::warn;

/// Ranked candidates partitioned into weight classes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightClasses {
    classes: Vec<Vec<ScoredCandidate>>,
}

impl WeightClasses {
    /// Buckets `ranked`, which should already be sorted by descending score.
    #[must_use]
    pub fn bucket(ranked: Vec<ScoredCandidate>) -> Self {
        Self {
            classes: partition_by_weight(ranked, |candidate| candidate.total_weight),
        }
    }

    /// Members of class `index`.
    #[must_use]
    pub fn class(&self, index: usize) -> &[ScoredCandidate] {
        self.classes.get(index).map_or(&[], Vec::as_slice)
    }

    /// Number of classes, i.e. one past the highest class index in use.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Populated classes, heaviest first.
    pub fn display_order(&self) -> impl Iterator<Item = (usize, &[ScoredCandidate])> {
        self.classes
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, members)| !members.is_empty())
            .map(|(index, members)| (index, members.as_slice()))
    }
}

/// Splits `items` into classes by `weight`, preserving input order within each.
///
/// Items whose weight is NaN or `+inf` never fall below a ceiling; they are
/// collected into one extra class after the heaviest finite one.
pub fn partition_by_weight<T, F>(items: Vec<T>, weight: F) -> Vec<Vec<T>>
where
    F: Fn(&T) -> f64,
{
    let (mut remaining, unbounded): (Vec<T>, Vec<T>) = items
        .into_iter()
        .partition(|item| weight(item) < f64::INFINITY);
    let mut classes = Vec::new();
    let mut ceiling = 1.0;

    while !remaining.is_empty() {
        let (class, rest): (Vec<T>, Vec<T>) =
            remaining.into_iter().partition(|item| weight(item) < ceiling);
        classes.push(class);
        remaining = rest;
        ceiling += 1.0;
    }

    if !unbounded.is_empty() {
        warn!(
            "{} candidates have a non-finite weight, placing them in class {}",
            unbounded.len(),
            classes.len()
        );
        classes.push(unbounded);
    }

    classes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u32, calc_score: f64, total_weight: f64) -> ScoredCandidate {
        ScoredCandidate {
            id,
            title: format!("Title {id}"),
            avg_score: None,
            episodes: None,
            calc_score,
            total_weight,
            explanation: None,
        }
    }

    #[test]
    fn test_bucketing_by_weight() {
        let ranked = vec![
            candidate(1, 9.0, 2.4),
            candidate(2, 8.5, 0.3),
            candidate(3, 8.0, 2.0),
            candidate(4, 7.0, 0.99),
            candidate(5, f64::NEG_INFINITY, 0.0),
        ];
        let classes = WeightClasses::bucket(ranked);

        let ids = |index| -> Vec<u32> { classes.class(index).iter().map(|c| c.id).collect() };
        assert_eq!(classes.len(), 3);
        assert_eq!(ids(0), vec![2, 4, 5]);
        assert!(ids(1).is_empty());
        assert_eq!(ids(2), vec![1, 3]);
    }

    #[test]
    fn test_display_order_skips_empty_classes() {
        let classes = WeightClasses::bucket(vec![candidate(1, 5.0, 2.5), candidate(2, 4.0, 0.5)]);
        let order: Vec<usize> = classes.display_order().map(|(index, _)| index).collect();
        assert_eq!(order, vec![2, 0]);
    }

    #[test]
    fn test_non_finite_weights_get_a_final_class() {
        let items = vec![
            (1, f64::NAN),
            (2, 1.5),
            (3, f64::INFINITY),
            (4, 0.5),
            (5, f64::NEG_INFINITY),
        ];
        let classes = partition_by_weight(items, |&(_, w)| w);

        let ids: Vec<Vec<u32>> = classes
            .iter()
            .map(|class| class.iter().map(|&(id, _)| id).collect())
            .collect();
        assert_eq!(ids, vec![vec![4, 5], vec![2], vec![1, 3]]);
    }

    #[test]
    fn test_empty_input() {
        let classes = WeightClasses::bucket(Vec::new());
        assert!(classes.is_empty());
        assert_eq!(classes.display_order().count(), 0);
        assert!(classes.class(3).is_empty());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn class_index_is_floor_of_weight(
                weights in proptest::collection::vec(0.0f64..12.0, 0..60)
            ) {
                let items: Vec<(usize, f64)> = weights.iter().copied().enumerate().collect();
                let classes = partition_by_weight(items, |&(_, w)| w);

                let mut seen = Vec::new();
                for (index, class) in classes.iter().enumerate() {
                    for &(position, w) in class {
                        prop_assert_eq!(index, w.floor() as usize);
                        seen.push(position);
                    }
                    // Input order is kept inside a class.
                    prop_assert!(class.windows(2).all(|pair| pair[0].0 < pair[1].0));
                }

                seen.sort_unstable();
                prop_assert_eq!(seen, (0..weights.len()).collect::<Vec<_>>());
            }
        }
    }
}
