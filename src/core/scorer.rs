//! Four-part item scoring.
//!
//! | Component  | Range | Signal |
//! |------------|-------|--------|
//! | recency    | 0-30  | exponential decay on publish age |
//! | substance  | 0-25  | length, data points, quotations |
//! | authority  | 0-20  | source priority |
//! | engagement | 0-25  | event and topic vocabulary, outbound links |
//!
//! Scoring is a pure function of the entry, the configuration and `now`.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::config::ScoringConfig;
use crate::domain::{PoolEntry, ScoreBreakdown};

pub const RECENCY_MAX: f64 = 30.0;
pub const RECENCY_DECAY: f64 = 0.02;
pub const SUBSTANCE_MAX: f64 = 25.0;
pub const AUTHORITY_MAX: f64 = 20.0;
pub const ENGAGEMENT_MAX: f64 = 25.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

const WORD_THRESHOLDS: [usize; 3] = [50, 150, 300];
const WORD_THRESHOLD_POINTS: f64 = 5.0;
const DATA_POINT_POINTS: f64 = 2.0;
const DATA_POINT_CAP: f64 = 5.0;
const QUOTE_POINTS: f64 = 5.0;

const HIGH_SIGNAL_POINTS: f64 = 3.0;
const TOPIC_POINTS: f64 = 2.0;
const VOCABULARY_CAP: f64 = 10.0;
const LINK_POINTS: f64 = 5.0;

/// Dollar amounts, percentages, and numbers of four or more digits
const DATA_POINT_PATTERN: &str = r"\$[\d,.]+[BMK]?|\d+%|\d{4,}";

/// Non-empty text between straight or curly double quotes
const QUOTE_PATTERN: &str = "[\"\u{201C}\u{201D}][^\"\u{201C}\u{201D}]+[\"\u{201C}\u{201D}]";

const LINK_PATTERN: &str = r"https?://";

/// Scores pool entries
#[derive(Debug, Clone)]
pub struct Scorer {
    high_signal_terms: Vec<String>,
    topic_terms: Vec<String>,
    max_age_days: f64,
    data_points: Regex,
    quotes: Regex,
    links: Regex,
}

impl Scorer {
    /// Build a scorer; vocabulary terms are matched case-insensitively
    pub fn new(config: &ScoringConfig, max_age_days: u32) -> Result<Self, regex::Error> {
        let lower = |terms: &[String]| -> Vec<String> {
            terms
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect()
        };

        Ok(Self {
            high_signal_terms: lower(&config.high_signal_terms),
            topic_terms: lower(&config.topic_terms),
            max_age_days: f64::from(max_age_days),
            data_points: Regex::new(DATA_POINT_PATTERN)?,
            quotes: Regex::new(QUOTE_PATTERN)?,
            links: Regex::new(LINK_PATTERN)?,
        })
    }

    /// Score one entry as of `now`
    pub fn score(&self, entry: &PoolEntry, now: DateTime<Utc>) -> ScoreBreakdown {
        let item = &entry.item;
        let text = format!("{} {}", item.title, item.body);

        ScoreBreakdown {
            recency: self.recency(item.published_at, now),
            substance: self.substance(&text),
            authority: authority(entry.source_priority),
            engagement: self.engagement(&text, &item.body),
        }
    }

    /// Undated items and items older than the maximum age score zero
    pub fn recency(&self, published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(published_at) = published_at else {
            return 0.0;
        };

        let age_seconds = (now - published_at).num_seconds().max(0) as f64;
        let age_days = age_seconds / SECONDS_PER_DAY;
        if age_days > self.max_age_days {
            return 0.0;
        }

        RECENCY_MAX * (-RECENCY_DECAY * age_days).exp()
    }

    fn substance(&self, text: &str) -> f64 {
        let words = text.split_whitespace().count();
        let length: f64 = WORD_THRESHOLDS
            .iter()
            .filter(|&&threshold| words > threshold)
            .map(|_| WORD_THRESHOLD_POINTS)
            .sum();

        let data_points = self.data_points.find_iter(text).count() as f64;
        let data = (data_points * DATA_POINT_POINTS).min(DATA_POINT_CAP);

        let quotes = if self.quotes.is_match(text) {
            QUOTE_POINTS
        } else {
            0.0
        };

        (length + data + quotes).min(SUBSTANCE_MAX)
    }

    fn engagement(&self, text: &str, body: &str) -> f64 {
        let lowered = text.to_lowercase();
        let count = |terms: &[String]| terms.iter().filter(|t| lowered.contains(t.as_str())).count();

        let high_signal =
            (count(&self.high_signal_terms) as f64 * HIGH_SIGNAL_POINTS).min(VOCABULARY_CAP);
        let topic = (count(&self.topic_terms) as f64 * TOPIC_POINTS).min(VOCABULARY_CAP);
        let link = if self.links.is_match(body) {
            LINK_POINTS
        } else {
            0.0
        };

        (high_signal + topic + link).min(ENGAGEMENT_MAX)
    }
}

fn authority(priority: u8) -> f64 {
    (f64::from(priority) * 2.0).min(AUTHORITY_MAX)
}
