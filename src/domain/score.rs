//! Score breakdown produced by the scorer.

use serde::{Deserialize, Serialize};

/// The four score components of an item.
///
/// Always recomputed from the item; stored copies on candidates and
/// rejection records are an audit trail of the run that produced them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 0..=30
    pub recency: f64,

    /// 0..=25
    pub substance: f64,

    /// 0..=20
    pub authority: f64,

    /// 0..=25
    pub engagement: f64,
}

impl ScoreBreakdown {
    /// Unweighted sum of the components
    pub fn total(&self) -> f64 {
        self.recency + self.substance + self.authority + self.engagement
    }
}

impl std::fmt::Display for ScoreBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.2} (rec {:.2}, sub {:.0}, auth {:.0}, eng {:.0})",
            self.total(),
            self.recency,
            self.substance,
            self.authority,
            self.engagement
        )
    }
}
