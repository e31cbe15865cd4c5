use crate::error::EngineError;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Bijective lookup from catalog identifier codes to ticker strings.
#[derive(Debug, Clone, Default)]
pub struct IdentifierDecoder {
    tickers: HashMap<i64, String>,
}

/// On-disk shapes accepted for a persisted decoder.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DecoderFile {
    /// Label-encoder classes: the code of a ticker is its position.
    Classes(Vec<String>),
    /// Explicit `{"<code>": "<ticker>"}` table.
    Table(BTreeMap<String, String>),
}

impl IdentifierDecoder {
    /// Build from label-encoder classes, where code `i` maps to `classes[i]`.
    pub fn from_classes<I, S>(classes: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_pairs(
            classes
                .into_iter()
                .enumerate()
                .map(|(i, t)| (i as i64, t.into())),
        )
    }

    pub fn from_pairs<I>(pairs: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (i64, String)>,
    {
        let mut tickers = HashMap::new();
        let mut seen: HashMap<String, i64> = HashMap::new();
        for (code, ticker) in pairs {
            let ticker = ticker.trim().to_string();
            anyhow::ensure!(!ticker.is_empty(), "decoder entry {code} has an empty ticker");
            if let Some(prev) = seen.insert(ticker.clone(), code) {
                bail!("ticker {ticker:?} is mapped by both code {prev} and code {code}");
            }
            if tickers.insert(code, ticker).is_some() {
                bail!("decoder code {code} appears more than once");
            }
        }
        Ok(Self { tickers })
    }

    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let file: DecoderFile =
            serde_json::from_str(s).context("decoder must be a JSON array or object of tickers")?;
        match file {
            DecoderFile::Classes(classes) => Self::from_classes(classes),
            DecoderFile::Table(table) => {
                let mut pairs = Vec::with_capacity(table.len());
                for (k, ticker) in table {
                    let code: i64 = k
                        .trim()
                        .parse()
                        .with_context(|| format!("decoder key {k:?} is not an integer code"))?;
                    pairs.push((code, ticker));
                }
                Self::from_pairs(pairs)
            }
        }
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read decoder {}", path.display()))?;
        let decoder = Self::from_json_str(&text)
            .with_context(|| format!("failed to load decoder {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            entries = decoder.len(),
            "identifier decoder loaded"
        );
        Ok(decoder)
    }

    pub fn decode(&self, code: i64) -> Result<&str, EngineError> {
        self.tickers
            .get(&code)
            .map(String::as_str)
            .ok_or(EngineError::UnknownIdentifier { code })
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}
