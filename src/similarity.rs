//! Similarity computation and ranking.
//!
//! Weighted vectors are min-max scaled per column over the batch, compared
//! pairwise by cosine, and (for user-to-user matching) blended with a
//! location-affinity matrix. Ranked best-to-worst lists and the single
//! best/worst pair are derived from the combined matrix.

use crate::classify::tfidf::cosine;
use crate::model::{Connection, RankedUser, ScoredUser};

/// Behavioral share of the combined user-to-user score.
pub const BEHAVIORAL_WEIGHT: f64 = 0.8;
/// Location share of the combined user-to-user score.
pub const LOCATION_WEIGHT: f64 = 0.2;

/// Scale each column to `[0, 1]` by the batch's min-max range.
///
/// A column with zero range (including every column of a single-row batch)
/// scales to 1.0 — identical rows must stay identical and keep cosine 1.0
/// rather than collapsing to the zero vector.
pub fn min_max_scale(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(width) = rows.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut mins = vec![f64::INFINITY; width];
    let mut maxs = vec![f64::NEG_INFINITY; width];
    for row in rows {
        for (col, &value) in row.iter().enumerate() {
            mins[col] = mins[col].min(value);
            maxs[col] = maxs[col].max(value);
        }
    }
    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(col, &value)| {
                    let range = maxs[col] - mins[col];
                    if range > 0.0 {
                        (value - mins[col]) / range
                    } else {
                        1.0
                    }
                })
                .collect()
        })
        .collect()
}

/// Pairwise cosine similarity over a set of rows (square matrix).
pub fn cosine_matrix(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|a| rows.iter().map(|b| cosine(a, b)).collect())
        .collect()
}

/// Cosine similarity of every left row against every right row
/// (rectangular matrix).
pub fn cosine_between(left: &[Vec<f64>], right: &[Vec<f64>]) -> Vec<Vec<f64>> {
    left.iter()
        .map(|a| right.iter().map(|b| cosine(a, b)).collect())
        .collect()
}

/// Location affinity between every pair of users.
///
/// Self pairs are 1.0. Sharing a time zone scores 1.0 with the same country
/// and 0.8 otherwise; different time zones score 0.3 regardless of country.
pub fn location_matrix(users: &[ScoredUser]) -> Vec<Vec<f64>> {
    users
        .iter()
        .enumerate()
        .map(|(i, a)| {
            users
                .iter()
                .enumerate()
                .map(|(j, b)| {
                    if i == j {
                        1.0
                    } else if a.time_zone == b.time_zone {
                        if a.country == b.country { 1.0 } else { 0.8 }
                    } else {
                        0.3
                    }
                })
                .collect()
        })
        .collect()
}

/// Blend a behavioral and a location matrix elementwise.
pub fn blend(
    behavioral: &[Vec<f64>],
    location: &[Vec<f64>],
    behavioral_weight: f64,
    location_weight: f64,
) -> Vec<Vec<f64>> {
    behavioral
        .iter()
        .zip(location)
        .map(|(b_row, l_row)| {
            b_row
                .iter()
                .zip(l_row)
                .map(|(b, l)| behavioral_weight * b + location_weight * l)
                .collect()
        })
        .collect()
}

/// The best- and worst-scoring unordered pairs over a combined matrix.
///
/// Scans the upper triangle only, so self pairs are excluded and symmetric
/// pairs are not double-counted. `None` when the batch has fewer than two
/// users.
pub fn extreme_pairs(
    matrix: &[Vec<f64>],
    ids: &[String],
) -> (Option<Connection>, Option<Connection>) {
    let mut best: Option<Connection> = None;
    let mut worst: Option<Connection> = None;
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            let score = matrix[i][j];
            if best.as_ref().is_none_or(|c| score > c.similarity) {
                best = Some(Connection {
                    pair: (ids[i].clone(), ids[j].clone()),
                    similarity: score,
                });
            }
            if worst.as_ref().is_none_or(|c| score < c.similarity) {
                worst = Some(Connection {
                    pair: (ids[i].clone(), ids[j].clone()),
                    similarity: score,
                });
            }
        }
    }
    (best, worst)
}

/// Every other user ranked best-to-worst for one subject row.
///
/// The subject itself is excluded; the sort is stable descending, so equal
/// scores keep batch order.
pub fn rank_others(matrix: &[Vec<f64>], ids: &[String], subject: usize) -> Vec<RankedUser> {
    let mut ranked: Vec<RankedUser> = ids
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != subject)
        .map(|(j, other_id)| RankedUser {
            other_id: other_id.clone(),
            score: matrix[subject][j],
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}
