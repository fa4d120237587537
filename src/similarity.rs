// 🎯 Similarity Scorer - Match confidence between normalized address strings
// Five complementary signals combined by logical OR

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strsim::normalized_levenshtein;

// ============================================================================
// MATCH CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Threshold for the whole-string edit-distance ratio (default: 0.6)
    pub char_ratio_threshold: f64,

    /// Threshold for the token-overlap ratio (default: 0.6)
    pub token_overlap_threshold: f64,

    /// Threshold for per-component edit-distance ratio (default: 0.7)
    pub component_ratio_threshold: f64,

    /// Minimum length of both strings before the containment signal is
    /// evaluated, to avoid trivial substring hits on short tokens (default: 5)
    pub min_containment_len: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            char_ratio_threshold: 0.6,
            token_overlap_threshold: 0.6,
            component_ratio_threshold: 0.7,
            min_containment_len: 5,
        }
    }
}

// ============================================================================
// SIMILARITY SCORER
// ============================================================================

/// Scores pairs of already-normalized address strings.
///
/// Source address data is inconsistently segmented (line-1/line-2 boundaries
/// differ between the submission form and the system of record), so a single
/// strict metric misses real matches. Five independent signals are combined
/// by OR; a missed real match is worse than a spurious one for this workflow.
pub struct SimilarityScorer {
    pub config: MatchConfig,
}

impl SimilarityScorer {
    pub fn new() -> Self {
        SimilarityScorer {
            config: MatchConfig::default(),
        }
    }

    pub fn with_config(config: MatchConfig) -> Self {
        SimilarityScorer { config }
    }

    /// Convenience constructor tuning the two ratio thresholds together.
    pub fn with_threshold(threshold: f64) -> Self {
        SimilarityScorer {
            config: MatchConfig {
                char_ratio_threshold: threshold,
                token_overlap_threshold: threshold,
                ..MatchConfig::default()
            },
        }
    }

    /// Match confidence in [0, 1]: the strongest of the five signals.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }

        let flat_a = flatten_commas(a);
        let flat_b = flatten_commas(b);
        if flat_a == flat_b {
            return 1.0;
        }

        let mut best = normalized_levenshtein(&flat_a, &flat_b);

        if self.containment_holds(&flat_a, &flat_b) {
            // Containment strength: how much of the longer string is covered
            let (short, long) = if flat_a.len() <= flat_b.len() {
                (&flat_a, &flat_b)
            } else {
                (&flat_b, &flat_a)
            };
            best = best.max(short.len() as f64 / long.len() as f64);
        }

        best = best.max(token_overlap_ratio(&flat_a, &flat_b));
        best = best.max(self.component_score(a, b));

        best.clamp(0.0, 1.0)
    }

    /// True if any signal fires at the configured char-ratio threshold.
    pub fn is_match(&self, a: &str, b: &str) -> bool {
        self.is_match_at(a, b, self.config.char_ratio_threshold)
    }

    /// True if any signal fires, with the edit-distance ratio compared
    /// against an explicit threshold. Monotone in `threshold`: lowering it
    /// never turns a match into a non-match.
    pub fn is_match_at(&self, a: &str, b: &str, threshold: f64) -> bool {
        // Signal 1: exact match after normalization
        if a == b {
            return true;
        }

        let flat_a = flatten_commas(a);
        let flat_b = flatten_commas(b);
        if flat_a == flat_b {
            return true;
        }

        // Signal 2: containment (comma-insensitive)
        if self.containment_holds(&flat_a, &flat_b) {
            return true;
        }

        // Signal 3: whole-string edit-distance ratio
        if normalized_levenshtein(&flat_a, &flat_b) >= threshold {
            return true;
        }

        // Signal 4: token-set subset or overlap ratio
        if self.token_sets_match(&flat_a, &flat_b) {
            return true;
        }

        // Signal 5: component-wise match across comma-delimited components
        self.components_match(a, b)
    }

    fn containment_holds(&self, a: &str, b: &str) -> bool {
        a.len() >= self.config.min_containment_len
            && b.len() >= self.config.min_containment_len
            && (a.contains(b) || b.contains(a))
    }

    fn token_sets_match(&self, a: &str, b: &str) -> bool {
        let set_a: BTreeSet<&str> = a.split_whitespace().collect();
        let set_b: BTreeSet<&str> = b.split_whitespace().collect();
        if set_a.is_empty() || set_b.is_empty() {
            return false;
        }

        if set_a.is_subset(&set_b) || set_b.is_subset(&set_a) {
            return true;
        }

        token_overlap_ratio(a, b) >= self.config.token_overlap_threshold
    }

    /// Every component of the side with fewer components must clear the
    /// per-component ratio against some component of the other side.
    fn components_match(&self, a: &str, b: &str) -> bool {
        let comps_a = split_components(a);
        let comps_b = split_components(b);
        if comps_a.is_empty() || comps_b.is_empty() {
            return false;
        }

        let (shorter, longer) = if comps_a.len() <= comps_b.len() {
            (&comps_a, &comps_b)
        } else {
            (&comps_b, &comps_a)
        };

        shorter.iter().all(|s| {
            longer
                .iter()
                .any(|l| normalized_levenshtein(s, l) >= self.config.component_ratio_threshold)
        })
    }

    /// Component signal as a score: the weakest best-component ratio.
    fn component_score(&self, a: &str, b: &str) -> f64 {
        let comps_a = split_components(a);
        let comps_b = split_components(b);
        if comps_a.is_empty() || comps_b.is_empty() {
            return 0.0;
        }

        let (shorter, longer) = if comps_a.len() <= comps_b.len() {
            (&comps_a, &comps_b)
        } else {
            (&comps_b, &comps_a)
        };

        let weakest = shorter
            .iter()
            .map(|s| {
                longer
                    .iter()
                    .map(|l| normalized_levenshtein(s, l))
                    .fold(0.0_f64, f64::max)
            })
            .fold(1.0_f64, f64::min);

        if weakest >= self.config.component_ratio_threshold {
            weakest
        } else {
            0.0
        }
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Commas mark component boundaries but should not defeat the substring and
/// token signals; replace them with spaces and re-collapse.
fn flatten_commas(s: &str) -> String {
    s.replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn token_overlap_ratio(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();
    let min_len = set_a.len().min(set_b.len());
    if min_len == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / min_len as f64
}

fn split_components(s: &str) -> Vec<String> {
    s.split(',')
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
