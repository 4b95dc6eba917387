//! Diversity, coverage and distance metrics over score vectors.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Clamps to `[0, inf)`, mapping `-0.0` and rounding noise to a positive zero.
fn non_negative(value: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Shannon entropy in bits of a count distribution.
///
/// Zero counts contribute nothing; an empty or all-zero distribution has entropy 0.
pub fn shannon_entropy(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let entropy: f64 = counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();
    non_negative(entropy)
}

/// Counts occurrences of each distinct label.
pub fn label_counts<T, I>(labels: I) -> BTreeMap<T, u64>
where
    T: Ord,
    I: IntoIterator<Item = T>,
{
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Shannon entropy of the empirical distribution of `labels`.
pub fn label_entropy<T, I>(labels: I) -> f64
where
    T: Ord,
    I: IntoIterator<Item = T>,
{
    let counts: Vec<u64> = label_counts(labels).into_values().collect();
    shannon_entropy(&counts)
}

/// Rule deciding whether a task score counts as covered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "threshold")]
pub enum CoverageRule {
    /// Covered when the score reaches the threshold.
    AtLeast(f64),
    /// Covered when the score is strictly positive.
    Positive,
}

impl CoverageRule {
    /// Returns true when `score` counts as covered.
    pub fn covers(self, score: f64) -> bool {
        match self {
            CoverageRule::AtLeast(threshold) => score >= threshold,
            CoverageRule::Positive => score > 0.0,
        }
    }
}

/// Per-task coverage flags of one score vector.
pub fn coverage_flags(scores: &[f64], rule: CoverageRule) -> Vec<bool> {
    scores.iter().map(|&score| rule.covers(score)).collect()
}

/// Number of covered tasks in one score vector.
pub fn coverage_count(scores: &[f64], rule: CoverageRule) -> usize {
    scores.iter().filter(|&&score| rule.covers(score)).count()
}

/// Coverage pattern of a score vector as a `0`/`1` string.
pub fn trait_profile(scores: &[f64], rule: CoverageRule) -> String {
    scores
        .iter()
        .map(|&score| if rule.covers(score) { '1' } else { '0' })
        .collect()
}

/// Coverage statistics across a set of population score vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageSummary {
    /// Tasks covered by at least one population.
    pub total_coverage: usize,
    /// Largest number of tasks covered by a single population.
    pub max_coverage: usize,
    /// Distinct coverage profiles.
    pub num_profiles: usize,
    /// Entropy of the coverage profile distribution.
    pub profile_entropy: f64,
}

/// Summarizes coverage over `vectors`; `None` when there are no vectors.
pub fn coverage_summary(vectors: &[Vec<f64>], rule: CoverageRule) -> Option<CoverageSummary> {
    if vectors.is_empty() {
        return None;
    }
    let covered: BTreeSet<usize> = vectors
        .iter()
        .flat_map(|scores| {
            scores
                .iter()
                .enumerate()
                .filter(move |(_, &score)| rule.covers(score))
                .map(|(task, _)| task)
        })
        .collect();
    let max_coverage = vectors
        .iter()
        .map(|scores| coverage_count(scores, rule))
        .max()
        .unwrap_or(0);
    let profiles: Vec<String> = vectors
        .iter()
        .map(|scores| trait_profile(scores, rule))
        .collect();
    let counts = label_counts(profiles.iter());
    Some(CoverageSummary {
        total_coverage: covered.len(),
        max_coverage,
        num_profiles: counts.len(),
        profile_entropy: shannon_entropy(&counts.into_values().collect::<Vec<_>>()),
    })
}

/// Largest finite element; `None` for an empty slice.
pub fn max_value(values: &[f64]) -> Option<f64> {
    values.iter().copied().fold(None, |best, value| match best {
        Some(current) if current >= value => Some(current),
        _ => Some(value),
    })
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Scales a vector to unit L1 sum; `None` when the sum is zero.
pub fn l1_normalize(vector: &[f64]) -> Option<Vec<f64>> {
    let sum: f64 = vector.iter().sum();
    if sum == 0.0 {
        return None;
    }
    Some(vector.iter().map(|value| value / sum).collect())
}

fn raw_cosine_distance(a: &[f64], b: &[f64]) -> Option<f64> {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(non_negative(1.0 - dot / (norm_a * norm_b)))
}

/// Cosine distance between the L1-normalized forms of `a` and `b`.
///
/// Undefined when either vector sums to zero.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> Option<f64> {
    let a = l1_normalize(a)?;
    let b = l1_normalize(b)?;
    raw_cosine_distance(&a, &b)
}

/// Cosine distance of every vector from the normalized centroid.
///
/// Vectors summing to zero have no distance and do not move the centroid.
pub fn centroid_distances(vectors: &[Vec<f64>]) -> Vec<Option<f64>> {
    let normalized: Vec<Option<Vec<f64>>> =
        vectors.iter().map(|vector| l1_normalize(vector)).collect();
    let width = vectors.first().map(Vec::len).unwrap_or(0);
    let mut centroid = vec![0.0; width];
    for vector in normalized.iter().flatten() {
        for (slot, value) in centroid.iter_mut().zip(vector) {
            *slot += value;
        }
    }
    let centroid = match l1_normalize(&centroid) {
        Some(centroid) => centroid,
        None => return vec![None; vectors.len()],
    };
    normalized
        .iter()
        .map(|vector| {
            vector
                .as_ref()
                .and_then(|vector| raw_cosine_distance(vector, &centroid))
        })
        .collect()
}

/// Mean of the defined values; `None` when none are defined.
pub fn mean_defined(values: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = values.iter().flatten().copied().collect();
    mean(&defined)
}

/// Average cosine distance from the centroid over the defined populations.
pub fn avg_centroid_distance(vectors: &[Vec<f64>]) -> Option<f64> {
    mean_defined(&centroid_distances(vectors))
}

/// Fraction of tasks whose coverage flags disagree; `None` for zero tasks.
pub fn coverage_hamming(a: &[f64], b: &[f64], rule: CoverageRule) -> Option<f64> {
    let len = a.len().min(b.len());
    if len == 0 {
        return None;
    }
    let differing = a
        .iter()
        .zip(b)
        .filter(|(&x, &y)| rule.covers(x) != rule.covers(y))
        .count();
    Some(differing as f64 / len as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_of_degenerate_distributions() {
        assert_eq!(shannon_entropy(&[]), 0.0);
        assert_eq!(shannon_entropy(&[0, 0]), 0.0);
        assert_eq!(shannon_entropy(&[0, 7, 0]), 0.0);
        assert!((shannon_entropy(&[2, 2]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_category_entropy_is_positive_zero() {
        let entropy = shannon_entropy(&[0, 3, 0]);
        assert!(entropy.is_sign_positive());
        assert_eq!(format!("{entropy:?}"), "0.0");
        assert!(label_entropy([4u64, 4, 4]).is_sign_positive());
    }

    #[test]
    fn profile_summary_counts_union_and_max() {
        let vectors = vec![vec![100.0, 0.0, 150.0], vec![0.0, 120.0, 0.0], vec![100.0, 0.0, 101.0]];
        let summary = coverage_summary(&vectors, CoverageRule::AtLeast(100.0)).unwrap();
        assert_eq!(summary.total_coverage, 3);
        assert_eq!(summary.max_coverage, 2);
        assert_eq!(summary.num_profiles, 2);
        assert!(summary.profile_entropy > 0.9 && summary.profile_entropy < 0.92);
        assert!(coverage_summary(&[], CoverageRule::Positive).is_none());
    }

    #[test]
    fn zero_vectors_have_no_distance() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), None);
        let distances = centroid_distances(&[vec![0.0, 0.0], vec![2.0, 2.0]]);
        assert_eq!(distances[0], None);
        assert!(distances[1].unwrap().abs() < 1e-12);
        assert_eq!(avg_centroid_distance(&[vec![0.0], vec![0.0]]), None);
    }

    #[test]
    fn hamming_over_coverage_flags() {
        let rule = CoverageRule::AtLeast(10.0);
        assert_eq!(coverage_hamming(&[10.0, 0.0], &[0.0, 10.0], rule), Some(1.0));
        assert_eq!(coverage_hamming(&[10.0, 0.0], &[11.0, 3.0], rule), Some(0.0));
        assert_eq!(coverage_hamming(&[], &[], rule), None);
    }
}
