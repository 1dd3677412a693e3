//! User-to-group matching.
//!
//! A group's vector is the elementwise mean of the raw (pre-weighting)
//! feature vectors of the members resolved against the batch, or the zero
//! vector when none resolve. User and group vectors are min-max scaled
//! *jointly* — one scaler over the stacked matrix — so a group of one user
//! lands exactly on that user after scaling.

use std::collections::BTreeMap;

use crate::model::{GroupRecord, RankedGroup};
use crate::similarity::{cosine_between, min_max_scale};

/// Resolve every group to a vector in the batch's feature space.
///
/// Returns `(group id, vector)` pairs in group order.
pub fn group_vectors(
    groups: &[GroupRecord],
    user_ids: &[String],
    user_vectors: &[Vec<f64>],
) -> Vec<(String, Vec<f64>)> {
    let width = user_vectors.first().map(Vec::len).unwrap_or(0);
    groups
        .iter()
        .map(|group| {
            let members: Vec<&Vec<f64>> = user_ids
                .iter()
                .zip(user_vectors)
                .filter(|(id, _)| group.members.contains(id))
                .map(|(_, vector)| vector)
                .collect();
            let vector = if members.is_empty() {
                vec![0.0; width]
            } else {
                let mut mean = vec![0.0; width];
                for member in &members {
                    for (acc, &value) in mean.iter_mut().zip(member.iter()) {
                        *acc += value;
                    }
                }
                for acc in &mut mean {
                    *acc /= members.len() as f64;
                }
                mean
            };
            (group.id.clone(), vector)
        })
        .collect()
}

/// Scale users and groups together and compute the user×group cosine matrix.
pub fn similarity_matrix(
    user_vectors: &[Vec<f64>],
    group_vectors: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let mut stacked: Vec<Vec<f64>> = Vec::with_capacity(user_vectors.len() + group_vectors.len());
    stacked.extend(user_vectors.iter().cloned());
    stacked.extend(group_vectors.iter().cloned());
    let scaled = min_max_scale(&stacked);
    let (scaled_users, scaled_groups) = scaled.split_at(user_vectors.len());
    cosine_between(scaled_users, scaled_groups)
}

/// Every group ranked best-to-worst for every user.
pub fn rank_groups(
    matrix: &[Vec<f64>],
    user_ids: &[String],
    group_ids: &[String],
) -> BTreeMap<String, Vec<RankedGroup>> {
    user_ids
        .iter()
        .enumerate()
        .map(|(i, user_id)| {
            let mut ranked: Vec<RankedGroup> = group_ids
                .iter()
                .enumerate()
                .map(|(j, group_id)| RankedGroup {
                    group: group_id.clone(),
                    score: matrix[i][j],
                })
                .collect();
            ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
            (user_id.clone(), ranked)
        })
        .collect()
}
