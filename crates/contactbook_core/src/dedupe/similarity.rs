//! String similarity measures for duplicate detection.
//!
//! # Invariants
//! - Every measure returns a score in `[0, 1]`; identical strings score 1.0.
//! - More shared substring structure never lowers the score.

use serde::{Deserialize, Serialize};

/// Pluggable `[0, 1]` similarity between two strings.
pub trait Similarity: Send + Sync {
    fn score(&self, left: &str, right: &str) -> f64;
}

/// Ratcliff/Obershelp "gestalt" ratio: `2 * M / T`, where `M` is the number
/// of characters in recursively found longest common blocks and `T` the
/// combined length.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceRatio;

impl Similarity for SequenceRatio {
    fn score(&self, left: &str, right: &str) -> f64 {
        sequence_ratio(left, right)
    }
}

/// Levenshtein distance normalized by the longer length.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLevenshtein;

impl Similarity for NormalizedLevenshtein {
    fn score(&self, left: &str, right: &str) -> f64 {
        strsim::normalized_levenshtein(left, right)
    }
}

/// Config-level selector for the similarity measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    #[default]
    SequenceRatio,
    NormalizedLevenshtein,
}

impl SimilarityKind {
    pub fn build(self) -> Box<dyn Similarity> {
        match self {
            Self::SequenceRatio => Box::new(SequenceRatio),
            Self::NormalizedLevenshtein => Box::new(NormalizedLevenshtein),
        }
    }
}

/// Computes the Ratcliff/Obershelp ratio of two strings.
///
/// Two empty strings are identical and score 1.0.
pub fn sequence_ratio(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    let total = left.len() + right.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&left, &right) as f64 / total as f64
}

fn matching_characters(left: &[char], right: &[char]) -> usize {
    let mut pending = vec![(0, left.len(), 0, right.len())];
    let mut matched = 0;

    while let Some((left_lo, left_hi, right_lo, right_hi)) = pending.pop() {
        let block = longest_block(left, right, left_lo..left_hi, right_lo..right_hi);
        if block.len == 0 {
            continue;
        }
        matched += block.len;
        if left_lo < block.left && right_lo < block.right {
            pending.push((left_lo, block.left, right_lo, block.right));
        }
        let left_end = block.left + block.len;
        let right_end = block.right + block.len;
        if left_end < left_hi && right_end < right_hi {
            pending.push((left_end, left_hi, right_end, right_hi));
        }
    }

    matched
}

struct Block {
    left: usize,
    right: usize,
    len: usize,
}

/// Longest common run inside the given windows; earliest start wins ties.
fn longest_block(
    left: &[char],
    right: &[char],
    left_range: std::ops::Range<usize>,
    right_range: std::ops::Range<usize>,
) -> Block {
    let mut best = Block {
        left: left_range.start,
        right: right_range.start,
        len: 0,
    };
    let width = right_range.len();
    // run_lengths[k + 1] is the common-suffix length ending at right[start + k].
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];

    for i in left_range {
        for (k, j) in right_range.clone().enumerate() {
            current[k + 1] = if left[i] == right[j] {
                previous[k] + 1
            } else {
                0
            };
            if current[k + 1] > best.len {
                best = Block {
                    left: i + 1 - current[k + 1],
                    right: j + 1 - current[k + 1],
                    len: current[k + 1],
                };
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::{sequence_ratio, NormalizedLevenshtein, Similarity, SimilarityKind};

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn identical_and_disjoint_bounds() {
        assert!(approx(sequence_ratio("anna", "anna"), 1.0));
        assert!(approx(sequence_ratio("", ""), 1.0));
        assert!(approx(sequence_ratio("abc", "xyz"), 0.0));
        assert!(approx(sequence_ratio("abc", ""), 0.0));
    }

    #[test]
    fn matches_classic_ratio_values() {
        // 2 * 3 / 8
        assert!(approx(sequence_ratio("abcd", "bcde"), 0.75));
        // "n smith" + "jo" = 9 matches over 19 chars
        assert!(approx(sequence_ratio("jon smith", "john smith"), 18.0 / 19.0));
    }

    #[test]
    fn ratio_is_symmetric_for_names() {
        let forward = sequence_ratio("catherine", "katherine");
        let backward = sequence_ratio("katherine", "catherine");
        assert!(approx(forward, backward));
    }

    #[test]
    fn levenshtein_variant_is_selectable() {
        let measure = SimilarityKind::NormalizedLevenshtein.build();
        assert!(approx(
            measure.score("kitten", "sitting"),
            NormalizedLevenshtein.score("kitten", "sitting")
        ));
    }
}
