use crate::catalog::{Catalog, CatalogEntry, IdentifierDecoder};
use crate::domain::recommendation::ScoredAsset;
use crate::engine::similarity::{cosine_with_norms, l2_norm};
use crate::error::EngineError;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
pub struct RankedRow<'a> {
    pub entry: &'a CatalogEntry,
    pub similarity: f64,
}

/// Score every catalog row against `query`, best first.
///
/// The sort is stable: rows with equal scores keep their catalog order.
pub fn rank<'a>(query: &[f64], catalog: &'a Catalog) -> Vec<RankedRow<'a>> {
    let query_norm = l2_norm(query);
    let mut ranked: Vec<RankedRow<'a>> = catalog
        .entries()
        .iter()
        .map(|entry| RankedRow {
            entry,
            similarity: cosine_with_norms(query, query_norm, &entry.features, entry.norm),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

/// Resolve the first `k` ranked rows to tickers.
///
/// Without `dedupe`, several rows resolving to the same ticker may all be
/// returned. With it, only the best-ranked row per ticker is kept.
pub fn select_top(
    ranked: &[RankedRow<'_>],
    decoder: &IdentifierDecoder,
    k: usize,
    dedupe: bool,
) -> Result<Vec<ScoredAsset>, EngineError> {
    let mut out = Vec::with_capacity(k.min(ranked.len()));
    let mut seen = HashSet::new();

    for row in ranked {
        if out.len() == k {
            break;
        }
        let ticker = decoder.decode(row.entry.identifier_code)?;
        if dedupe && !seen.insert(ticker) {
            continue;
        }
        out.push(ScoredAsset {
            ticker: ticker.to_string(),
            similarity: row.similarity,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::FEATURE_COUNT;

    fn unit(i: usize) -> Vec<f64> {
        let mut v = vec![0.0; FEATURE_COUNT];
        v[i] = 1.0;
        v
    }

    fn decoder() -> IdentifierDecoder {
        IdentifierDecoder::from_classes(["AAA", "BBB", "CCC", "DDD"]).unwrap()
    }

    #[test]
    fn identical_row_ranks_above_orthogonal_row() {
        let catalog = Catalog::from_rows(vec![(1, unit(1)), (0, unit(0))]).unwrap();
        let ranked = rank(&unit(0), &catalog);

        assert_eq!(ranked[0].entry.identifier_code, 0);
        assert!((ranked[0].similarity - 1.0).abs() < 1e-12);
        assert_eq!(ranked[1].entry.identifier_code, 1);
        assert_eq!(ranked[1].similarity, 0.0);
    }

    #[test]
    fn ties_keep_catalog_order() {
        let catalog = Catalog::from_rows(vec![
            (3, unit(1)),
            (2, unit(0)),
            (1, unit(2)),
            (0, unit(0)),
        ])
        .unwrap();
        let ranked = rank(&unit(0), &catalog);
        let codes: Vec<i64> = ranked.iter().map(|r| r.entry.identifier_code).collect();
        assert_eq!(codes, vec![2, 0, 3, 1]);
    }

    #[test]
    fn zero_query_scores_every_row_zero_in_catalog_order() {
        let catalog = Catalog::from_rows(vec![(2, unit(3)), (0, unit(1))]).unwrap();
        let ranked = rank(&vec![0.0; FEATURE_COUNT], &catalog);
        assert!(ranked.iter().all(|r| r.similarity == 0.0));
        assert_eq!(ranked[0].entry.identifier_code, 2);
    }

    #[test]
    fn output_length_is_min_of_k_and_catalog_size() {
        let catalog = Catalog::from_rows(vec![(0, unit(0)), (1, unit(1)), (2, unit(2))]).unwrap();
        let ranked = rank(&unit(0), &catalog);
        let d = decoder();

        assert_eq!(select_top(&ranked, &d, 2, false).unwrap().len(), 2);
        assert_eq!(select_top(&ranked, &d, 10, false).unwrap().len(), 3);
        assert!(select_top(&ranked, &d, 0, false).unwrap().is_empty());
    }

    #[test]
    fn duplicate_tickers_are_kept_by_default() {
        let catalog = Catalog::from_rows(vec![(0, unit(0)), (0, unit(0)), (1, unit(1))]).unwrap();
        let ranked = rank(&unit(0), &catalog);
        let top = select_top(&ranked, &decoder(), 2, false).unwrap();
        assert_eq!(top[0].ticker, "AAA");
        assert_eq!(top[1].ticker, "AAA");
    }

    #[test]
    fn dedupe_keeps_best_row_per_ticker() {
        let catalog = Catalog::from_rows(vec![(0, unit(0)), (0, unit(0)), (1, unit(1))]).unwrap();
        let ranked = rank(&unit(0), &catalog);
        let top = select_top(&ranked, &decoder(), 2, true).unwrap();
        let tickers: Vec<&str> = top.iter().map(|a| a.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAA", "BBB"]);
    }

    #[test]
    fn unknown_code_in_selection_is_an_error() {
        let catalog = Catalog::from_rows(vec![(99, unit(0)), (0, unit(1))]).unwrap();
        let ranked = rank(&unit(0), &catalog);
        assert_eq!(
            select_top(&ranked, &decoder(), 2, false).unwrap_err(),
            EngineError::UnknownIdentifier { code: 99 }
        );
    }

    #[test]
    fn unknown_code_outside_selection_is_not_resolved() {
        let catalog = Catalog::from_rows(vec![(0, unit(0)), (99, unit(1))]).unwrap();
        let ranked = rank(&unit(0), &catalog);
        let top = select_top(&ranked, &decoder(), 1, false).unwrap();
        assert_eq!(top[0].ticker, "AAA");
    }
}
