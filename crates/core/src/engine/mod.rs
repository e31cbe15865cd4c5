//! Profile encoding and nearest-neighbour ranking over the asset catalog.
//!
//! ```text
//! RawProfile -> ProfileEncoder -> FeatureVector -> rank (cosine) -> select_top -> tickers
//! ```
//!
//! An [`Engine`] holds only read-only data, so it can be shared behind an `Arc`
//! and called from any number of threads without locking.

pub mod encoder;
pub mod ranker;
pub mod similarity;

use crate::catalog::{Catalog, IdentifierDecoder};
use crate::config::Settings;
use crate::domain::profile::RawProfile;
use crate::domain::recommendation::{RecommendedAsset, ScoredAsset};
use crate::domain::schema::FEATURE_COUNT;
use crate::error::EngineError;
use anyhow::Context;
use encoder::{Calibration, ProfileEncoder};

pub const DEFAULT_TOP_K: usize = 2;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Number of assets returned per request.
    pub top_k: usize,

    pub calibration: Calibration,

    /// Keep only the best-ranked row per ticker. Off by default: several rows
    /// can resolve to the same ticker and all of them are returned.
    pub dedupe_tickers: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            calibration: Calibration::default(),
            dedupe_tickers: false,
        }
    }
}

impl EngineOptions {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build options from a key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = Self::default();

        if let Some(n) = parse_var::<usize>(&lookup, "RECOMMEND_TOP_K")? {
            out.top_k = n;
        }
        if let Some(v) = parse_var::<f64>(&lookup, "INCOME_CEILING")? {
            out.calibration.income_ceiling = v;
        }
        if let Some(v) = parse_var::<f64>(&lookup, "EXPENSES_CEILING")? {
            out.calibration.expenses_ceiling = v;
        }
        if let Some(b) = parse_var::<bool>(&lookup, "RECOMMEND_DEDUPE_TICKERS")? {
            out.dedupe_tickers = b;
        }

        out.validate()?;
        Ok(out)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.top_k >= 1, "top_k must be >= 1 (got {})", self.top_k);
        self.calibration.validate()
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} has an invalid value: {s:?}")),
        _ => Ok(None),
    }
}

#[derive(Debug)]
pub struct Engine {
    catalog: Catalog,
    decoder: IdentifierDecoder,
    encoder: ProfileEncoder,
    options: EngineOptions,
}

impl Engine {
    /// Assemble an engine from loaded reference data.
    ///
    /// Fails with `SchemaMismatch` if the catalog's vectors are not the width
    /// the encoder produces; such an engine must never serve a request.
    pub fn new(
        catalog: Catalog,
        decoder: IdentifierDecoder,
        options: EngineOptions,
    ) -> anyhow::Result<Self> {
        options.validate()?;

        if let Some(row) = catalog
            .entries()
            .iter()
            .position(|e| e.features.len() != FEATURE_COUNT)
        {
            return Err(EngineError::schema_mismatch(format!(
                "catalog row {row} has {} features, encoder produces {FEATURE_COUNT}",
                catalog.entries()[row].features.len()
            ))
            .into());
        }

        tracing::info!(
            catalog_rows = catalog.len(),
            decoder_entries = decoder.len(),
            top_k = options.top_k,
            dedupe_tickers = options.dedupe_tickers,
            "recommendation engine ready"
        );

        Ok(Self {
            catalog,
            decoder,
            encoder: ProfileEncoder::new(options.calibration),
            options,
        })
    }

    /// Load the catalog and decoder named in `settings` and build an engine.
    pub fn from_settings(settings: &Settings, options: EngineOptions) -> anyhow::Result<Self> {
        let catalog = Catalog::from_csv_path(settings.require_catalog_path()?)?;
        let decoder = IdentifierDecoder::from_json_path(settings.require_decoder_path()?)?;
        Self::new(catalog, decoder, options)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Top-K tickers for a profile, best match first.
    pub fn recommend(&self, profile: &RawProfile) -> Result<Vec<RecommendedAsset>, EngineError> {
        Ok(self
            .recommend_scored(profile)?
            .into_iter()
            .map(RecommendedAsset::from)
            .collect())
    }

    /// Like [`Engine::recommend`] but keeps the similarity of each match.
    pub fn recommend_scored(&self, profile: &RawProfile) -> Result<Vec<ScoredAsset>, EngineError> {
        let query = self.encoder.encode(profile)?;
        let ranked = ranker::rank(query.as_slice(), &self.catalog);
        let top = ranker::select_top(
            &ranked,
            &self.decoder,
            self.options.top_k,
            self.options.dedupe_tickers,
        )?;

        tracing::debug!(
            catalog_rows = self.catalog.len(),
            returned = top.len(),
            best_similarity = top.first().map(|a| a.similarity),
            "ranked catalog"
        );
        Ok(top)
    }

    /// Codes present in the catalog that the decoder cannot resolve.
    ///
    /// Requests only fail on these when such a row lands in the top K, so this
    /// is the way to catch desynchronised reference data up front.
    pub fn undecodable_codes(&self) -> Vec<i64> {
        let mut out: Vec<i64> = self
            .catalog
            .entries()
            .iter()
            .map(|e| e.identifier_code)
            .filter(|c| self.decoder.decode(*c).is_err())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}
