//! Weighted feature-vector construction.
//!
//! Base weights are fixed configuration; the skill weight is additionally
//! multiplied by a per-category factor computed from the batch itself, so a
//! batch that finds a category hard boosts the skill signal of users whose
//! main activity is that category.

use std::collections::HashMap;

use crate::features::{BASE_FEATURES, FeatureSet};
use crate::model::ScoredUser;
use crate::tables::{FALLBACK_CATEGORY, MatchTables};

/// Base weights for the fixed-order feature vector.
#[derive(Debug, Clone, Copy)]
pub struct BaseWeights {
    pub skill: f64,
    pub success_rate: f64,
    pub completion_factor: f64,
    pub avg_task_time: f64,
    pub consistency: f64,
    pub pace: f64,
    pub openness: f64,
    /// Applied to every interest dimension.
    pub interests: f64,
}

impl Default for BaseWeights {
    fn default() -> Self {
        Self {
            skill: 0.20,
            success_rate: 0.10,
            completion_factor: 0.15,
            avg_task_time: 0.05,
            consistency: 0.15,
            pace: 0.10,
            openness: 0.05,
            interests: 0.20,
        }
    }
}

/// Mean difficulty-per-minute per table category over the whole batch.
///
/// Categories with no items in the batch keep a neutral factor of 1.0.
pub fn category_skill_weights(
    users: &[ScoredUser],
    tables: &MatchTables,
) -> HashMap<String, f64> {
    tables
        .category_names()
        .map(|category| {
            let scores: Vec<f64> = users
                .iter()
                .flat_map(|u| u.items.iter())
                .filter(|i| i.category == category)
                .map(|i| i.skill_score())
                .collect();
            let weight = if scores.is_empty() {
                1.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };
            (category.to_string(), weight)
        })
        .collect()
}

/// A user's most frequent item category.
///
/// Ties break on first occurrence in the user's item order; a user with no
/// items maps to the fallback category.
pub fn main_category(user: &ScoredUser) -> &str {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for item in &user.items {
        match counts.iter_mut().find(|(cat, _)| *cat == item.category) {
            Some((_, count)) => *count += 1,
            None => counts.push((&item.category, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (cat, count) in counts {
        // Strictly-greater keeps the earliest category on ties.
        if best.is_none_or(|(_, max)| count > max) {
            best = Some((cat, count));
        }
    }
    best.map(|(cat, _)| cat).unwrap_or(FALLBACK_CATEGORY)
}

/// Apply base weights plus the dynamic skill factor to every feature vector.
///
/// Returns weighted vectors parallel to the user order.
pub fn apply(
    features: &FeatureSet,
    users: &[ScoredUser],
    tables: &MatchTables,
    weights: &BaseWeights,
) -> Vec<Vec<f64>> {
    let skill_factors = category_skill_weights(users, tables);
    features
        .users
        .iter()
        .zip(users)
        .map(|(feat, user)| {
            let factor = skill_factors
                .get(main_category(user))
                .copied()
                .unwrap_or(1.0);
            let mut row = Vec::with_capacity(feat.vector.len());
            let base = [
                weights.skill * factor,
                weights.success_rate,
                weights.completion_factor,
                weights.avg_task_time,
                weights.consistency,
                weights.pace,
                weights.openness,
            ];
            for (i, &value) in feat.vector.iter().enumerate() {
                let w = if i < BASE_FEATURES {
                    base[i]
                } else {
                    weights.interests
                };
                row.push(value * w);
            }
            row
        })
        .collect()
}
