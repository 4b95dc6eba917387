//! Pairwise population similarity and greedy visiting order.

use std::cmp::Ordering;

use dde_core::errors::{DdeError, ErrorInfo};
use serde::{Deserialize, Serialize};

use crate::fields::TaskScores;
use crate::metrics::{cosine_distance, coverage_hamming, CoverageRule};

/// Task scores reported by one sub-population.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskProfile {
    /// Population index within the run.
    pub pop_id: usize,
    /// Scores keyed by `<task>_<pathway>`.
    pub scores: TaskScores,
}

impl TaskProfile {
    /// Creates a profile.
    pub fn new(pop_id: usize, scores: TaskScores) -> Self {
        Self { pop_id, scores }
    }

    /// Scores of `tasks`, in the order given.
    pub fn vector(&self, tasks: &[String]) -> Result<Vec<f64>, DdeError> {
        tasks
            .iter()
            .map(|task| {
                self.scores.get(task).copied().ok_or_else(|| {
                    DdeError::Field(
                        ErrorInfo::new("task_missing", "population did not report a task")
                            .with_context("pop_id", self.pop_id.to_string())
                            .with_context("task", task.as_str()),
                    )
                })
            })
            .collect()
    }

    /// Sum of the scores of `tasks`.
    pub fn aggregate_score(&self, tasks: &[String]) -> Result<f64, DdeError> {
        Ok(self.vector(tasks)?.iter().sum())
    }

    /// Task names in sorted order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }
}

/// Distances between one unordered pair of populations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    /// Lower population index.
    pub pop_a: usize,
    /// Higher population index.
    pub pop_b: usize,
    /// Cosine distance of the normalized vectors, if both are nonzero.
    pub cosine_distance: Option<f64>,
    /// Fraction of tasks with disagreeing coverage.
    pub coverage_hamming_distance: Option<f64>,
}

impl PairwiseComparison {
    fn between(a: usize, b: usize, vectors: &[Vec<f64>], rule: CoverageRule) -> Self {
        let (pop_a, pop_b) = if a <= b { (a, b) } else { (b, a) };
        Self {
            pop_a,
            pop_b,
            cosine_distance: cosine_distance(&vectors[pop_a], &vectors[pop_b]),
            coverage_hamming_distance: coverage_hamming(&vectors[pop_a], &vectors[pop_b], rule),
        }
    }
}

/// Symmetric distance matrix over a run's populations.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    size: usize,
    cells: Vec<PairwiseComparison>,
}

impl SimilarityMatrix {
    /// Computes every pairwise comparison of `vectors`.
    pub fn compute(vectors: &[Vec<f64>], rule: CoverageRule) -> Self {
        let size = vectors.len();
        let mut cells = Vec::with_capacity(size * size);
        for a in 0..size {
            for b in 0..size {
                cells.push(PairwiseComparison::between(a, b, vectors, rule));
            }
        }
        Self { size, cells }
    }

    /// Number of populations.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true for a run without populations.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Comparison of populations `a` and `b`.
    pub fn get(&self, a: usize, b: usize) -> &PairwiseComparison {
        &self.cells[a * self.size + b]
    }

    /// Every unordered pair `a < b` in lexicographic order.
    pub fn pairs(&self) -> Vec<PairwiseComparison> {
        let mut pairs = Vec::new();
        for a in 0..self.size {
            for b in (a + 1)..self.size {
                pairs.push(*self.get(a, b));
            }
        }
        pairs
    }

    fn neighbour_cmp(&self, from: usize, x: usize, y: usize) -> Ordering {
        let cx = self.get(from, x);
        let cy = self.get(from, y);
        undefined_last(cx.cosine_distance, cy.cosine_distance)
            .then_with(|| {
                undefined_last(cx.coverage_hamming_distance, cy.coverage_hamming_distance)
            })
            .then_with(|| x.cmp(&y))
    }

    /// Greedy nearest-neighbour visiting order starting at `start`.
    pub fn greedy_order(&self, start: usize) -> Vec<usize> {
        if self.size == 0 {
            return Vec::new();
        }
        let mut visited = vec![false; self.size];
        let mut order = Vec::with_capacity(self.size);
        let mut current = start.min(self.size - 1);
        loop {
            visited[current] = true;
            order.push(current);
            let next = (0..self.size)
                .filter(|&candidate| !visited[candidate])
                .min_by(|&x, &y| self.neighbour_cmp(current, x, y));
            match next {
                Some(next) => current = next,
                None => break,
            }
        }
        order
    }
}

fn undefined_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Index of the highest aggregate score, lowest index on ties.
pub fn highest_scoring(aggregate_scores: &[f64]) -> Option<usize> {
    aggregate_scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (idx, &score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((idx, score)),
        })
        .map(|(idx, _)| idx)
}

/// Result of ordering a run's populations.
#[derive(Debug, Clone)]
pub struct PopulationOrdering {
    /// Populations in visiting order.
    pub order: Vec<usize>,
    /// Every unordered pair `a < b`.
    pub pairs: Vec<PairwiseComparison>,
    /// Aggregate score of each population over the compared tasks.
    pub aggregate_scores: Vec<f64>,
    /// Score vector of each population over the compared tasks.
    pub vectors: Vec<Vec<f64>>,
}

/// Orders `profiles` by similarity over `tasks` and tabulates their pairwise distances.
pub fn order_populations(
    profiles: &[TaskProfile],
    tasks: &[String],
    rule: CoverageRule,
) -> Result<PopulationOrdering, DdeError> {
    let vectors = profiles
        .iter()
        .map(|profile| profile.vector(tasks))
        .collect::<Result<Vec<_>, _>>()?;
    let aggregate_scores: Vec<f64> = vectors.iter().map(|v| v.iter().sum()).collect();
    let matrix = SimilarityMatrix::compute(&vectors, rule);
    let order = match highest_scoring(&aggregate_scores) {
        Some(start) => matrix.greedy_order(start),
        None => Vec::new(),
    };
    Ok(PopulationOrdering {
        order,
        pairs: matrix.pairs(),
        aggregate_scores,
        vectors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_score_prefers_lowest_index_on_ties() {
        assert_eq!(highest_scoring(&[1.0, 3.0, 3.0]), Some(1));
        assert_eq!(highest_scoring(&[]), None);
    }

    #[test]
    fn greedy_order_visits_nearest_first() {
        let vectors = vec![
            vec![10.0, 0.0],
            vec![0.0, 10.0],
            vec![9.0, 1.0],
            vec![0.0, 0.0],
        ];
        let matrix = SimilarityMatrix::compute(&vectors, CoverageRule::AtLeast(5.0));
        assert_eq!(matrix.greedy_order(0), vec![0, 2, 1, 3]);
    }

    #[test]
    fn pairs_cover_each_unordered_pair_once() {
        let vectors = vec![vec![1.0], vec![2.0], vec![3.0]];
        let matrix = SimilarityMatrix::compute(&vectors, CoverageRule::Positive);
        let pairs: Vec<(usize, usize)> = matrix.pairs().iter().map(|p| (p.pop_a, p.pop_b)).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
    }
}
