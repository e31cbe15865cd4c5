use anyhow::Context;
use assetmatch_core::domain::profile::RawProfile;
use assetmatch_core::domain::recommendation::{RecommendedAsset, ScoredAsset};
use assetmatch_core::Engine;
use serde::Serialize;
use std::io::{BufRead, Write};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: usize,
    pub rejected: usize,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Assets {
    Plain(Vec<RecommendedAsset>),
    Scored(Vec<ScoredAsset>),
}

impl Assets {
    pub fn new(scored: Vec<ScoredAsset>, with_scores: bool) -> Self {
        if with_scores {
            Self::Scored(scored)
        } else {
            Self::Plain(scored.into_iter().map(RecommendedAsset::from).collect())
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Record {
    Ok {
        line: usize,
        recommended_assets: Assets,
    },
    Rejected {
        line: usize,
        error: String,
    },
}

/// Recommend for one JSON profile per input line, writing one JSON record per
/// line. Bad profiles are reported inline and skipped; broken reference data
/// aborts the run.
pub fn run<R: BufRead, W: Write>(
    engine: &Engine,
    input: R,
    mut out: W,
    with_scores: bool,
) -> anyhow::Result<BatchStats> {
    let mut stats = BatchStats::default();

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read input line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let record = match serde_json::from_str::<RawProfile>(&line) {
            Err(e) => Record::Rejected {
                line: line_no,
                error: format!("invalid profile: {e}"),
            },
            Ok(profile) => match engine.recommend_scored(&profile) {
                Ok(scored) => Record::Ok {
                    line: line_no,
                    recommended_assets: Assets::new(scored, with_scores),
                },
                Err(e) if !e.is_reference_data_fault() => Record::Rejected {
                    line: line_no,
                    error: e.to_string(),
                },
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("batch aborted at input line {line_no}")))
                }
            },
        };

        if let Record::Rejected { error, .. } = &record {
            stats.rejected += 1;
            tracing::warn!(line = line_no, %error, "profile rejected");
        }
        stats.processed += 1;

        serde_json::to_writer(&mut out, &record).context("failed to write batch output")?;
        writeln!(out).context("failed to write batch output")?;
    }

    out.flush().context("failed to flush batch output")?;
    Ok(stats)
}
