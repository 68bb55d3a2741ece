//! Batch deduplication.
//!
//! Runs over a batch already sorted best-first, so when two entries collide
//! the one that survives is always the higher-scoring one.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::item::truncate_chars;
use crate::domain::{Rejection, RejectionReason, ScoredEntry};

/// Near-duplicate detection settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupConfig {
    /// Similarity ratio above which two bodies are duplicates
    pub threshold: f64,
    /// Number of leading body characters compared
    pub prefix_chars: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            prefix_chars: 500,
        }
    }
}

/// Output of a dedup pass
#[derive(Debug, Default)]
pub struct Deduplicated {
    pub kept: Vec<ScoredEntry>,
    pub rejected: Vec<Rejection>,
}

/// Similarity ratio of two texts in [0, 1], by normalized edit distance
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Trigram length used by the pre-filter
const GRAM: usize = 3;

/// Body prefix with the data the pre-filter needs
struct Fingerprint<'a> {
    text: &'a str,
    chars: usize,
    /// Sorted packed trigrams, one entry per occurrence
    grams: Vec<u64>,
}

impl<'a> Fingerprint<'a> {
    fn new(text: &'a str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut grams: Vec<u64> = chars
            .windows(GRAM)
            .map(|w| ((w[0] as u64) << 42) | ((w[1] as u64) << 21) | w[2] as u64)
            .collect();
        grams.sort_unstable();
        Self {
            text,
            chars: chars.len(),
            grams,
        }
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Whether the pair can possibly reach a ratio above `threshold`.
    ///
    /// Never returns `false` for a pair whose true ratio is above it: the
    /// length gap and the trigram count lemma are both lower bounds on the
    /// edit distance.
    fn could_match(&self, other: &Fingerprint<'_>, threshold: f64) -> bool {
        let longest = self.chars.max(other.chars);
        if longest == 0 {
            return true;
        }
        // Largest edit distance that still leaves the ratio above threshold
        let budget = ((1.0 - threshold) * longest as f64 + 1e-9).floor().max(0.0) as usize;

        if self.chars.abs_diff(other.chars) > budget {
            return false;
        }

        let required = (longest + 1)
            .saturating_sub(GRAM)
            .saturating_sub(budget * GRAM);
        required == 0 || shared_grams(&self.grams, &other.grams) >= required
    }

    fn is_near_duplicate(&self, other: &Fingerprint<'_>, threshold: f64) -> bool {
        !self.is_blank()
            && !other.is_blank()
            && self.could_match(other, threshold)
            && similarity(self.text, other.text) > threshold
    }
}

/// Size of the multiset intersection of two sorted gram lists
fn shared_grams(a: &[u64], b: &[u64]) -> usize {
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    shared
}

/// Drop exact-URL collisions, then near-duplicate bodies.
///
/// Order is preserved for the kept entries. Pairs that cannot reach the
/// threshold are ruled out by a length and trigram bound before the full
/// edit distance is computed.
pub fn deduplicate(batch: Vec<ScoredEntry>, config: DedupConfig) -> Deduplicated {
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut kept: Vec<(ScoredEntry, usize)> = Vec::new();
    let mut rejected = Vec::new();

    // Prefixes are copied out so fingerprints outlive the moves below
    let prefixes: Vec<String> = batch
        .iter()
        .map(|s| truncate_chars(&s.entry.item.body, config.prefix_chars).to_string())
        .collect();
    let fingerprints: Vec<Fingerprint<'_>> = prefixes.iter().map(|p| Fingerprint::new(p)).collect();

    for (idx, scored) in batch.into_iter().enumerate() {
        if !seen_urls.insert(scored.url().to_string()) {
            rejected.push(Rejection {
                scored,
                reason: RejectionReason::DuplicateUrl,
            });
            continue;
        }

        let current = &fingerprints[idx];
        let original = kept
            .iter()
            .map(|(entry, fp)| (entry, &fingerprints[*fp]))
            .find(|(_, other)| current.is_near_duplicate(other, config.threshold))
            .map(|(entry, _)| entry.url().to_string());

        match original {
            Some(of_url) => {
                debug!(url = %scored.url(), of = %of_url, "Near-duplicate dropped");
                let reason = RejectionReason::NearDuplicate { of_url };
                rejected.push(Rejection { scored, reason });
            }
            None => kept.push((scored, idx)),
        }
    }

    Deduplicated {
        kept: kept.into_iter().map(|(entry, _)| entry).collect(),
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Item, PoolEntry, ScoreBreakdown};
    use chrono::Utc;

    fn scored(id: i64, url: &str, body: &str) -> ScoredEntry {
        ScoredEntry {
            entry: PoolEntry {
                item: Item {
                    id,
                    source_id: 1,
                    url: url.to_string(),
                    title: format!("Item {}", id),
                    body: body.to_string(),
                    author: None,
                    published_at: None,
                    scanned_at: Utc::now(),
                },
                source_name: "Fintech Daily".to_string(),
                source_priority: 5,
            },
            score: ScoreBreakdown::default(),
        }
    }

    #[test]
    fn test_duplicate_url_keeps_first() {
        let batch = vec![
            scored(1, "https://a.example/1", "alpha"),
            scored(2, "https://a.example/1", "something else entirely"),
        ];
        let result = deduplicate(batch, DedupConfig::default());

        assert_eq!(result.kept.len(), 1);
        assert_eq!(result.kept[0].item_id(), 1);
        assert_eq!(result.rejected[0].reason, RejectionReason::DuplicateUrl);
    }

    #[test]
    fn test_near_duplicate_body_is_rejected() {
        let body = "The central bank confirmed a pilot for a retail digital currency next year.";
        let rewrite = "The central bank confirmed a pilot for a retail digital currency next month.";
        let batch = vec![
            scored(1, "https://a.example/1", body),
            scored(2, "https://b.example/2", rewrite),
        ];
        let result = deduplicate(batch, DedupConfig::default());

        assert_eq!(result.kept.len(), 1);
        assert_eq!(
            result.rejected[0].reason,
            RejectionReason::NearDuplicate {
                of_url: "https://a.example/1".to_string()
            }
        );
    }

    #[test]
    fn test_distinct_bodies_survive() {
        let batch = vec![
            scored(1, "https://a.example/1", "Regulators fined a lender for reporting gaps."),
            scored(2, "https://b.example/2", "A payments startup raised a seed round in Lagos."),
        ];
        assert_eq!(deduplicate(batch, DedupConfig::default()).kept.len(), 2);
    }

    #[test]
    fn test_empty_bodies_are_never_duplicates() {
        let batch = vec![
            scored(1, "https://a.example/1", ""),
            scored(2, "https://b.example/2", "  "),
        ];
        assert_eq!(deduplicate(batch, DedupConfig::default()).kept.len(), 2);
    }

    #[test]
    fn test_only_prefix_is_compared() {
        let shared = "x".repeat(20);
        let config = DedupConfig {
            threshold: 0.8,
            prefix_chars: 20,
        };
        let batch = vec![
            scored(1, "https://a.example/1", &format!("{}tail one", shared)),
            scored(2, "https://b.example/2", &format!("{}completely different tail", shared)),
        ];
        assert_eq!(deduplicate(batch, config).kept.len(), 1);
    }

    /// Deterministic letter soup, distinct per seed
    fn noise(seed: u64, len: usize) -> String {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let n = (state >> 33) % 27;
                if n == 26 {
                    ' '
                } else {
                    (b'a' + n as u8) as char
                }
            })
            .collect()
    }

    #[test]
    fn test_large_distinct_pool_is_fast() {
        let batch: Vec<ScoredEntry> = (0..300)
            .map(|i| scored(i, &format!("https://a.example/{}", i), &noise(i as u64, 600)))
            .collect();

        let started = std::time::Instant::now();
        let result = deduplicate(batch, DedupConfig::default());

        assert_eq!(result.kept.len(), 300);
        assert!(
            started.elapsed() < std::time::Duration::from_secs(5),
            "took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn test_near_duplicate_found_in_large_pool() {
        let mut batch: Vec<ScoredEntry> = (0..200)
            .map(|i| scored(i, &format!("https://a.example/{}", i), &noise(i as u64, 600)))
            .collect();
        // Same text as entry 17 with a handful of edits
        let mut copy: Vec<char> = noise(17, 600).chars().collect();
        for pos in [10, 90, 200, 333, 480] {
            copy[pos] = '#';
        }
        let copy: String = copy.into_iter().collect();
        batch.push(scored(999, "https://b.example/copy", &copy));

        let result = deduplicate(batch, DedupConfig::default());

        assert_eq!(result.kept.len(), 200);
        assert_eq!(
            result.rejected[0].reason,
            RejectionReason::NearDuplicate {
                of_url: "https://a.example/17".to_string()
            }
        );
    }

    #[test]
    fn test_prefilter_never_rules_out_a_match() {
        let base = noise(3, 500);
        let pairs = [
            (base.clone(), base.replacen('a', "b", 40)),
            (base.clone(), format!("{}{}", &base[..450], "z".repeat(40))),
            (base.clone(), base[20..].to_string()),
            ("short".to_string(), "shirt".to_string()),
        ];
        for (a, b) in &pairs {
            let (fa, fb) = (Fingerprint::new(a), Fingerprint::new(b));
            if similarity(a, b) > 0.8 {
                assert!(fa.could_match(&fb, 0.8), "{} vs {}", a, b);
            }
        }
        let unrelated = noise(4, 500);
        assert!(!Fingerprint::new(&base).could_match(&Fingerprint::new(&unrelated), 0.8));
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("same", "same"), 1.0);
        assert!(similarity("abcd", "wxyz") < 0.01);
    }
}
