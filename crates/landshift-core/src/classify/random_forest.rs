//! Random forest classifier.
//!
//! Each tree is a CART tree grown on a bootstrap sample of the training set,
//! splitting on Gini impurity over a random subset of features at every node.
//! Prediction is a majority vote across trees, ties going to the lowest code.
//!
//! Training is deterministic when `seed` is set. Without a seed the forest is
//! seeded from the OS and results vary from run to run.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DEFAULT_BAG_FRACTION, DEFAULT_TREE_COUNT};
use crate::error::{LandshiftError, Result};
use crate::sampling::TrainingSet;

use super::Classifier;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestParams {
    pub trees: usize,
    /// RNG seed. `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Maximum tree depth. `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Nodes with fewer samples become leaves.
    pub min_samples_split: usize,
    /// Features tried per split. `None` uses floor(sqrt(feature count)).
    pub features_per_split: Option<usize>,
    /// Bootstrap sample size as a fraction of the training set.
    pub bag_fraction: f32,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            trees: DEFAULT_TREE_COUNT,
            seed: None,
            max_depth: None,
            min_samples_split: 2,
            features_per_split: None,
            bag_fraction: DEFAULT_BAG_FRACTION,
        }
    }
}

#[derive(Clone, Debug)]
enum Node {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Clone, Debug)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn predict(&self, features: &[f32]) -> usize {
        let mut i = 0;
        loop {
            match self.nodes[i] {
                Node::Leaf { class } => return class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if features[feature] <= threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Trained random forest.
#[derive(Clone, Debug)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    /// Dense class index -> class code.
    codes: Vec<u8>,
    seed: u64,
}

impl RandomForest {
    pub fn fit(set: &TrainingSet, params: &RandomForestParams) -> Result<Self> {
        if set.is_empty() {
            return Err(LandshiftError::EmptyTrainingSet);
        }
        if params.trees == 0 {
            return Err(LandshiftError::InvalidConfig(
                "random forest needs at least one tree".into(),
            ));
        }
        if !(params.bag_fraction > 0.0 && params.bag_fraction <= 1.0) {
            return Err(LandshiftError::InvalidConfig(format!(
                "bag fraction {} is outside (0, 1]",
                params.bag_fraction
            )));
        }

        let mut codes: Vec<u8> = set.samples.iter().map(|s| s.class).collect();
        codes.sort_unstable();
        codes.dedup();

        let rows: Vec<&[f32]> = set.samples.iter().map(|s| s.features.as_slice()).collect();
        let labels: Vec<usize> = set
            .samples
            .iter()
            .map(|s| codes.binary_search(&s.class).unwrap_or(0))
            .collect();

        let n_features = set.feature_names.len();
        let per_split = params
            .features_per_split
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .clamp(1, n_features.max(1));
        let bag_size = ((rows.len() as f32 * params.bag_fraction).round() as usize).max(1);

        let seed = params.seed.unwrap_or_else(|| rand::rng().random());
        let builder = TreeBuilder {
            rows: &rows,
            labels: &labels,
            n_classes: codes.len(),
            per_split,
            min_samples_split: params.min_samples_split.max(2),
            max_depth: params.max_depth.unwrap_or(usize::MAX),
        };

        let trees: Vec<DecisionTree> = (0..params.trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(seed, t));
                let bag: Vec<usize> = (0..bag_size)
                    .map(|_| rng.random_range(0..rows.len()))
                    .collect();
                builder.build(bag, &mut rng)
            })
            .collect();

        debug!(
            trees = trees.len(),
            nodes = trees.iter().map(|t| t.nodes.len()).sum::<usize>(),
            seed,
            "Random forest grown"
        );
        Ok(Self { trees, codes, seed })
    }

    /// Seed actually used for training.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        "Random Forest"
    }

    fn predict(&self, features: &[f32]) -> u8 {
        let mut votes = vec![0usize; self.codes.len()];
        for tree in &self.trees {
            votes[tree.predict(features)] += 1;
        }
        // Ascending codes: max_by_key keeps the last max, so scan in reverse.
        let best = votes
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|&(_, v)| *v)
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.codes[best]
    }
}

/// Independent per-tree seed, so trees can be grown in any order.
fn tree_seed(seed: u64, tree: usize) -> u64 {
    seed ^ (tree as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

struct TreeBuilder<'a> {
    rows: &'a [&'a [f32]],
    labels: &'a [usize],
    n_classes: usize,
    per_split: usize,
    min_samples_split: usize,
    max_depth: usize,
}

struct Split {
    feature: usize,
    threshold: f32,
}

impl TreeBuilder<'_> {
    fn build(&self, bag: Vec<usize>, rng: &mut StdRng) -> DecisionTree {
        let mut nodes = Vec::new();
        self.grow(&mut nodes, bag, 0, rng);
        DecisionTree { nodes }
    }

    fn grow(&self, nodes: &mut Vec<Node>, idx: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let counts = self.class_counts(&idx);
        let majority = majority_class(&counts);
        let node = nodes.len();
        nodes.push(Node::Leaf { class: majority });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if pure || idx.len() < self.min_samples_split || depth >= self.max_depth {
            return node;
        }
        let Some(split) = self.best_split(&idx, &counts, rng) else {
            return node;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
            .into_iter()
            .partition(|&i| self.rows[i][split.feature] <= split.threshold);
        if left_idx.is_empty() || right_idx.is_empty() {
            return node;
        }
        let left = self.grow(nodes, left_idx, depth + 1, rng);
        let right = self.grow(nodes, right_idx, depth + 1, rng);
        nodes[node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node
    }

    fn class_counts(&self, idx: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in idx {
            counts[self.labels[i]] += 1;
        }
        counts
    }

    /// Lowest weighted Gini split over a random feature subset, if any
    /// improves on the parent.
    fn best_split(&self, idx: &[usize], parent: &[usize], rng: &mut StdRng) -> Option<Split> {
        let n_features = self.rows[idx[0]].len();
        let n = idx.len() as f64;
        let mut best_score = gini(parent, idx.len()) - 1e-12;
        let mut best: Option<Split> = None;

        let mut order: Vec<usize> = idx.to_vec();
        for feature in sample(rng, n_features, self.per_split.min(n_features)) {
            order.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let mut left = vec![0usize; self.n_classes];
            let mut right = parent.to_vec();
            for k in 0..order.len() - 1 {
                let label = self.labels[order[k]];
                left[label] += 1;
                right[label] -= 1;

                let here = self.rows[order[k]][feature];
                let next = self.rows[order[k + 1]][feature];
                if here == next {
                    continue;
                }
                let n_left = k + 1;
                let n_right = order.len() - n_left;
                let score = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n;
                if score < best_score {
                    let mid = here + (next - here) / 2.0;
                    best_score = score;
                    best = Some(Split {
                        feature,
                        threshold: if mid < next { mid } else { here },
                    });
                }
            }
        }
        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn majority_class(counts: &[usize]) -> usize {
    counts
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|&(_, c)| *c)
        .map(|(i, _)| i)
        .unwrap_or(0)
}
