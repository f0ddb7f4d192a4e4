//! Positional join of match results back onto the caller's records.

use serde::Serialize;

use crate::error::{MatchError, Result};
use crate::models::MatchResult;

/// A query record paired with its closest candidate record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Joined<'a, Q, C> {
    pub query: &'a Q,
    pub candidate: &'a C,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

/// Zip `results` onto `queries` by position and look up each matched candidate.
///
/// `results[i]` must belong to `queries[i]`, and every candidate index must
/// point into `candidates` (as it does for results produced against the
/// same candidate set).
pub fn attach_nearest<'a, Q, C>(
    queries: &'a [Q],
    candidates: &'a [C],
    results: &[MatchResult],
) -> Result<Vec<Joined<'a, Q, C>>> {
    if queries.len() != results.len() {
        return Err(MatchError::LengthMismatch {
            results: results.len(),
            records: queries.len(),
        });
    }

    results
        .iter()
        .zip(queries)
        .map(|(r, query)| {
            let candidate =
                candidates
                    .get(r.candidate_index)
                    .ok_or(MatchError::LengthMismatch {
                        results: r.candidate_index + 1,
                        records: candidates.len(),
                    })?;
            Ok(Joined {
                query,
                candidate,
                distance_m: r.distance_m,
            })
        })
        .collect()
}
