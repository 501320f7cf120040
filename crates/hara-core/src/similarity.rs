//! Edit-distance similarity scores on a 0–100 integer scale.
//!
//! All four measures are built on the indel-normalized ratio
//! `2·LCS(a, b) / (|a| + |b|)`, computed over Unicode scalar values and
//! rounded half-to-even, so threshold comparisons are reproducible.
//!
//! ```text
//!  Ratio           whole string vs whole string
//!  PartialRatio    shorter string vs block-anchored windows of the longer
//!  TokenSortRatio  Ratio over alphabetically sorted tokens
//!  TokenSetRatio   best Ratio over intersection / remainder combinations
//! ```

use crate::normalize::{NormalizeOptions, normalize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Window ratios above this count as a perfect partial match.
const PARTIAL_PERFECT: f64 = 0.995;

/// Selectable similarity measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Algorithm {
    #[default]
    Ratio,
    PartialRatio,
    TokenSortRatio,
    TokenSetRatio,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Ratio,
        Algorithm::PartialRatio,
        Algorithm::TokenSortRatio,
        Algorithm::TokenSetRatio,
    ];

    /// Short name used in `Fuzzy-<name> (NN%)` match labels.
    pub fn short_name(&self) -> &'static str {
        match self {
            Algorithm::Ratio => "Ratio",
            Algorithm::PartialRatio => "Partial",
            Algorithm::TokenSortRatio => "TokenSort",
            Algorithm::TokenSetRatio => "TokenSet",
        }
    }

    /// Raw score between two already-normalized strings.
    pub fn apply(&self, a: &str, b: &str) -> u8 {
        match self {
            Algorithm::Ratio => ratio(a, b),
            Algorithm::PartialRatio => partial_ratio(a, b),
            Algorithm::TokenSortRatio => token_sort_ratio(a, b),
            Algorithm::TokenSetRatio => token_set_ratio(a, b),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Ratio => write!(f, "Ratio (Default)"),
            Algorithm::PartialRatio => write!(f, "Partial Ratio"),
            Algorithm::TokenSortRatio => write!(f, "Token Sort Ratio"),
            Algorithm::TokenSetRatio => write!(f, "Token Set Ratio"),
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "ratio" | "ratiodefault" | "default" => Ok(Algorithm::Ratio),
            "partial" | "partialratio" => Ok(Algorithm::PartialRatio),
            "tokensort" | "tokensortratio" => Ok(Algorithm::TokenSortRatio),
            "tokenset" | "tokensetratio" => Ok(Algorithm::TokenSetRatio),
            _ => Err(format!(
                "unknown fuzzy algorithm '{s}' (expected ratio, partial_ratio, token_sort_ratio or token_set_ratio)"
            )),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Scores raw text pairs: normalizes both sides, then applies an algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    pub algorithm: Algorithm,
    pub options: NormalizeOptions,
}

impl Scorer {
    pub fn new(algorithm: Algorithm, options: NormalizeOptions) -> Self {
        Self { algorithm, options }
    }

    /// Similarity of `a` and `b` in `0..=100`.
    ///
    /// An empty side (after normalization) scores 0, even against another
    /// empty side: absent data never matches.
    pub fn score(&self, a: &str, b: &str) -> u8 {
        let a = normalize(a, self.options);
        let b = normalize(b, self.options);
        if a.is_empty() || b.is_empty() {
            return 0;
        }
        self.algorithm.apply(&a, &b)
    }
}

fn to_score(r: f64) -> u8 {
    (100.0 * r).round_ties_even() as u8
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// A run of equal characters: `a[a_start..a_start + len] == b[b_start..b_start + len]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MatchingBlock {
    a_start: usize,
    b_start: usize,
    len: usize,
}

/// Matching blocks of one LCS alignment of `a` and `b`, in order, followed by
/// the zero-length sentinel `(|a|, |b|, 0)`.
fn matching_blocks(a: &[char], b: &[char]) -> Vec<MatchingBlock> {
    let (n, m) = (a.len(), b.len());
    // table[i][j] = LCS of a[i..] and b[j..]
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if a[i] == b[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut blocks: Vec<MatchingBlock> = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] && table[i][j] == table[i + 1][j + 1] + 1 {
            match blocks.last_mut() {
                Some(last) if last.a_start + last.len == i && last.b_start + last.len == j => {
                    last.len += 1;
                }
                _ => blocks.push(MatchingBlock {
                    a_start: i,
                    b_start: j,
                    len: 1,
                }),
            }
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    blocks.push(MatchingBlock {
        a_start: n,
        b_start: m,
        len: 0,
    });
    blocks
}

fn char_ratio(a: &[char], b: &[char]) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let total = (a.len() + b.len()) as f64;
    (2 * lcs_len(a, b)) as f64 / total
}

/// Whole-string similarity.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    to_score(char_ratio(&a, &b))
}

/// Best similarity of the shorter string against windows of the longer one.
///
/// Only windows anchored at a matching block are scored: each block places
/// the shorter string so its matched run lines up, starting at
/// `max(0, b_start - a_start)`. A window running past the end of the longer
/// string is truncated, not shifted back.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a == b {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let mut best = 0.0f64;
    for block in matching_blocks(shorter, longer) {
        let start = block.b_start.saturating_sub(block.a_start);
        let end = (start + shorter.len()).min(longer.len());
        let r = char_ratio(shorter, &longer[start..end]);
        if r > PARTIAL_PERFECT {
            return 100;
        }
        best = best.max(r);
    }
    to_score(best)
}

/// Token preprocessing: ASCII only, non-word characters become spaces,
/// lowercased and trimmed.
fn full_process(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii())
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Order-insensitive similarity: tokens sorted before comparing.
///
/// Two inputs that both process to nothing are equal and score 100; unlike
/// [`token_set_ratio`] there is no empty-input guard.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(&full_process(a)), &sorted_tokens(&full_process(b)))
}

/// Set-based similarity: shared tokens compared against each side's extras.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let a = full_process(a);
    let b = full_process(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let join = |set: Vec<&str>| set.join(" ");
    let sect = join(tokens_a.intersection(&tokens_b).copied().collect());
    let only_a = join(tokens_a.difference(&tokens_b).copied().collect());
    let only_b = join(tokens_b.difference(&tokens_a).copied().collect());

    let combined_a = format!("{sect} {only_a}").trim().to_string();
    let combined_b = format!("{sect} {only_b}").trim().to_string();

    [
        ratio(&sect, &combined_a),
        ratio(&sect, &combined_b),
        ratio(&combined_a, &combined_b),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ratio_is_symmetric_and_bounded(a in "[a-e ]{0,12}", b in "[a-e ]{0,12}") {
            let ab = ratio(&a, &b);
            prop_assert_eq!(ab, ratio(&b, &a));
            prop_assert!(ab <= 100);
        }

        #[test]
        fn identical_non_empty_text_scores_full(a in "[a-z]{1,20}") {
            for algorithm in Algorithm::ALL {
                prop_assert_eq!(Scorer::new(algorithm, NormalizeOptions::default()).score(&a, &a), 100);
            }
        }

        /// Every algorithm is deterministic.
        #[test]
        fn scores_are_deterministic(a in "[a-z ]{0,15}", b in "[a-z ]{0,15}") {
            for algorithm in Algorithm::ALL {
                prop_assert_eq!(algorithm.apply(&a, &b), algorithm.apply(&a, &b));
            }
        }
    }
}
