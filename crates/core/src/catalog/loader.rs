use super::Catalog;
use crate::domain::schema::{FeatureField, FEATURE_SCHEMA, IDENTIFIER_COLUMN};
use crate::error::EngineError;
use anyhow::Context;
use std::io::Read;
use std::path::Path;

/// Positions of the identifier and of each schema field within a CSV header.
#[derive(Debug)]
struct ColumnMap {
    identifier: usize,
    features: Vec<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, EngineError> {
        let position = |name: &str| -> Result<usize, EngineError> {
            let mut hits = headers.iter().enumerate().filter(|(_, h)| h.trim() == name);
            match (hits.next(), hits.next()) {
                (Some((i, _)), None) => Ok(i),
                (None, _) => Err(EngineError::schema_mismatch(format!(
                    "catalog is missing column {name:?}"
                ))),
                (Some(_), Some(_)) => Err(EngineError::schema_mismatch(format!(
                    "catalog has duplicate column {name:?}"
                ))),
            }
        };

        let identifier = position(IDENTIFIER_COLUMN)?;
        let features = FEATURE_SCHEMA
            .iter()
            .map(|f: &FeatureField| position(f.column()))
            .collect::<Result<Vec<_>, _>>()?;

        // Extra feature columns would have been part of the vector space the
        // catalog was built in; silently dropping them would skew every score.
        if headers.len() != features.len() + 1 {
            let known: Vec<&str> = std::iter::once(IDENTIFIER_COLUMN)
                .chain(FEATURE_SCHEMA.iter().map(|f| f.column()))
                .collect();
            let extra: Vec<&str> = headers
                .iter()
                .map(str::trim)
                .filter(|h| !known.contains(h))
                .collect();
            return Err(EngineError::schema_mismatch(format!(
                "catalog has unexpected columns {extra:?}"
            )));
        }

        Ok(Self {
            identifier,
            features,
        })
    }
}

impl Catalog {
    pub fn from_csv_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open catalog {}", path.display()))?;
        let catalog = Self::from_csv_reader(file)
            .with_context(|| format!("failed to load catalog {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            rows = catalog.len(),
            "asset catalog loaded"
        );
        Ok(catalog)
    }

    /// Read a processed asset catalog: a header row, then one row per asset.
    /// Columns are matched by name, so their order in the file does not matter.
    pub fn from_csv_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers().context("failed to read catalog header")?.clone();
        let columns = ColumnMap::from_headers(&headers)?;

        let mut rows = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            // Header is line 1.
            let line = idx + 2;
            let record = record.with_context(|| format!("malformed catalog row at line {line}"))?;

            let raw_code = &record[columns.identifier];
            let code = parse_code(raw_code).with_context(|| {
                format!("invalid {IDENTIFIER_COLUMN} {raw_code:?} at line {line}")
            })?;

            let mut features = Vec::with_capacity(columns.features.len());
            for (&col, field) in columns.features.iter().zip(FEATURE_SCHEMA) {
                let raw = &record[col];
                let v: f64 = raw.parse().with_context(|| {
                    format!("invalid {} value {raw:?} at line {line}", field.column())
                })?;
                features.push(v);
            }
            rows.push((code, features));
        }

        let catalog = Catalog::from_rows(rows)?;
        if catalog.is_empty() {
            tracing::warn!("asset catalog has no rows; every recommendation will be empty");
        }
        Ok(catalog)
    }
}

// Tabular exports sometimes write integer keys as floats ("3.0").
fn parse_code(raw: &str) -> anyhow::Result<i64> {
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    let f: f64 = raw.parse()?;
    anyhow::ensure!(
        f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15,
        "not an integer"
    );
    Ok(f as i64)
}
