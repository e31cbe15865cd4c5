//! Read-only reference data: the asset catalog and the identifier decoder.
//!
//! Both are loaded once at startup and shared immutably for the process
//! lifetime.

mod loader;
pub mod decoder;

pub use decoder::IdentifierDecoder;

use crate::domain::schema::{feature_columns, FEATURE_COUNT};
use crate::engine::similarity::l2_norm;
use crate::error::EngineError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub identifier_code: i64,
    pub features: Vec<f64>,
    /// Precomputed Euclidean norm of `features`.
    pub norm: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogSummary {
    pub rows: usize,
    pub distinct_codes: usize,
    pub features: Vec<&'static str>,
}

impl Catalog {
    /// Build a catalog from `(identifier_code, features)` rows in catalog order.
    ///
    /// Every row must have exactly one value per schema field.
    pub fn from_rows<I>(rows: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (i64, Vec<f64>)>,
    {
        let mut entries = Vec::new();
        for (idx, (identifier_code, features)) in rows.into_iter().enumerate() {
            if features.len() != FEATURE_COUNT {
                return Err(EngineError::schema_mismatch(format!(
                    "row {idx} (code {identifier_code}) has {} features, expected {FEATURE_COUNT}",
                    features.len()
                )));
            }
            if let Some(bad) = features.iter().find(|v| !v.is_finite()) {
                return Err(EngineError::schema_mismatch(format!(
                    "row {idx} (code {identifier_code}) has non-finite feature value {bad}"
                )));
            }
            let norm = l2_norm(&features);
            entries.push(CatalogEntry {
                identifier_code,
                features,
                norm,
            });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> CatalogSummary {
        let mut codes: Vec<i64> = self.entries.iter().map(|e| e.identifier_code).collect();
        codes.sort_unstable();
        codes.dedup();
        CatalogSummary {
            rows: self.entries.len(),
            distinct_codes: codes.len(),
            features: feature_columns().collect(),
        }
    }
}
