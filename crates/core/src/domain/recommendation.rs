use serde::{Deserialize, Serialize};

/// Default output record: only the resolved ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAsset {
    pub ticker: String,
}

/// Alternate output record for callers that asked for scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAsset {
    pub ticker: String,
    pub similarity: f64,
}

impl From<ScoredAsset> for RecommendedAsset {
    fn from(s: ScoredAsset) -> Self {
        Self { ticker: s.ticker }
    }
}
