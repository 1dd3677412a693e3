//! Per-user feature aggregation.
//!
//! Collapses each user's scored items into the fixed-order behavioral vector
//!
//! ```text
//! [avg_skill, success_rate, completion_factor, avg_task_time,
//!  consistency, pace, openness] ⧺ interest_vector
//! ```
//!
//! The interest vector is a tf-idf distribution over the batch's category
//! vocabulary: one synthetic document per user (item categories joined), one
//! fit per batch, so interest dimensions are comparable across the batch.

use std::collections::BTreeMap;

use crate::classify::tfidf::TfidfModel;
use crate::model::ScoredUser;

/// Number of scalar features preceding the interest dimensions.
pub const BASE_FEATURES: usize = 7;

/// Feature vectors for one batch, parallel to the input user order.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    /// Distinct categories observed across the batch, in sorted order —
    /// the interest dimensions of every vector.
    pub interest_categories: Vec<String>,
    pub users: Vec<UserFeatures>,
}

/// One user's derived features.
#[derive(Debug, Clone)]
pub struct UserFeatures {
    /// Fixed-order feature vector: the 7 base metrics ⧺ interest weights.
    pub vector: Vec<f64>,
    /// Fraction of the user's items per category. Diagnostic only — reported
    /// on the trace channel, never part of the match output.
    pub category_distribution: BTreeMap<String, f64>,
}

impl FeatureSet {
    /// Length of every feature vector in this batch.
    pub fn width(&self) -> usize {
        BASE_FEATURES + self.interest_categories.len()
    }

    /// Raw (pre-weighting) feature vectors, parallel to the user order.
    pub fn vectors(&self) -> Vec<Vec<f64>> {
        self.users.iter().map(|u| u.vector.clone()).collect()
    }
}

/// Build the batch's feature set from pass-2 scored users.
pub fn build(users: &[ScoredUser]) -> FeatureSet {
    let category_docs: Vec<String> = users
        .iter()
        .map(|u| {
            u.items
                .iter()
                .map(|i| i.category.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    let interest_model = TfidfModel::fit(&category_docs);
    let interest_categories: Vec<String> =
        interest_model.terms().map(str::to_string).collect();
    let batch_category_count = interest_categories.len();

    let features = users
        .iter()
        .zip(&category_docs)
        .map(|(user, doc)| {
            let n = user.items.len();
            let total_time: f64 = user.items.iter().map(|i| i.time_taken).sum();

            let (avg_skill, avg_task_time) = if n == 0 {
                (0.0, 0.0)
            } else {
                (
                    user.items.iter().map(|i| i.skill_score()).sum::<f64>() / n as f64,
                    total_time / n as f64,
                )
            };

            let mut category_distribution = BTreeMap::new();
            for item in &user.items {
                *category_distribution
                    .entry(item.category.clone())
                    .or_insert(0.0) += 1.0 / n as f64;
            }

            let openness = if n == 0 || batch_category_count == 0 {
                0.0
            } else {
                category_distribution.len() as f64 / batch_category_count as f64
            };

            let consistency = user.streak_days as f64 / 7.0;
            let pace = n as f64 / total_time.max(1.0);

            let mut vector = vec![
                avg_skill,
                user.success_rate,
                user.completion_factor,
                avg_task_time,
                consistency,
                pace,
                openness,
            ];
            vector.extend(interest_model.transform(doc));

            UserFeatures {
                vector,
                category_distribution,
            }
        })
        .collect();

    FeatureSet {
        interest_categories,
        users: features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScoredItem;

    fn scored_user(id: &str, streak: u32, items: &[(&str, f64, f64, bool)]) -> ScoredUser {
        let items: Vec<ScoredItem> = items
            .iter()
            .map(|(cat, time, difficulty, done)| ScoredItem {
                title: format!("{cat} item"),
                time_taken: *time,
                completed: *done,
                category: cat.to_string(),
                difficulty: *difficulty,
            })
            .collect();
        let success_rate = if items.is_empty() {
            0.0
        } else {
            items.iter().filter(|i| i.completed).count() as f64 / items.len() as f64
        };
        ScoredUser {
            id: id.into(),
            items,
            streak_days: streak,
            country: String::new(),
            time_zone: String::new(),
            success_rate,
            completion_factor: 1.0,
        }
    }

    #[test]
    fn vector_has_base_plus_interest_width() {
        let users = vec![
            scored_user("u1", 7, &[("fitness", 30.0, 2.0, true)]),
            scored_user("u2", 0, &[("study", 60.0, 3.0, false)]),
        ];
        let set = build(&users);
        assert_eq!(set.interest_categories, vec!["fitness", "study"]);
        assert_eq!(set.width(), BASE_FEATURES + 2);
        for u in &set.users {
            assert_eq!(u.vector.len(), set.width());
        }
    }

    #[test]
    fn base_metrics_match_hand_computation() {
        let users = vec![scored_user(
            "u1",
            14,
            &[("fitness", 30.0, 2.0, true), ("fitness", 10.0, 4.0, false)],
        )];
        let set = build(&users);
        let v = &set.users[0].vector;
        // avg_skill = mean(2/30, 4/10)
        assert!((v[0] - (2.0 / 30.0 + 4.0 / 10.0) / 2.0).abs() < 1e-12);
        // success_rate
        assert!((v[1] - 0.5).abs() < 1e-12);
        // avg_task_time
        assert!((v[3] - 20.0).abs() < 1e-12);
        // consistency = 14/7
        assert!((v[4] - 2.0).abs() < 1e-12);
        // pace = 2 items / 40 minutes
        assert!((v[5] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn openness_is_share_of_batch_vocabulary() {
        let users = vec![
            scored_user(
                "wide",
                0,
                &[("fitness", 10.0, 1.0, true), ("study", 10.0, 1.0, true)],
            ),
            scored_user("narrow", 0, &[("household", 10.0, 1.0, true)]),
        ];
        let set = build(&users);
        // Batch vocabulary: fitness, household, study.
        assert!((set.users[0].vector[6] - 2.0 / 3.0).abs() < 1e-12);
        assert!((set.users[1].vector[6] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_item_user_gets_zeroed_metrics() {
        let users = vec![
            scored_user("empty", 21, &[]),
            scored_user("busy", 0, &[("fitness", 20.0, 2.0, true)]),
        ];
        let set = build(&users);
        let v = &set.users[0].vector;
        assert_eq!(v[0], 0.0); // avg_skill
        assert_eq!(v[1], 0.0); // success_rate
        assert_eq!(v[3], 0.0); // avg_task_time
        assert_eq!(v[6], 0.0); // openness
        assert!((v[4] - 3.0).abs() < 1e-12); // consistency still applies
        // Interest dimensions exist but are all zero.
        assert!(v[BASE_FEATURES..].iter().all(|&w| w == 0.0));
        assert!(set.users[0].category_distribution.is_empty());
    }

    #[test]
    fn category_distribution_sums_to_one() {
        let users = vec![scored_user(
            "u1",
            0,
            &[
                ("fitness", 10.0, 1.0, true),
                ("fitness", 10.0, 1.0, true),
                ("study", 10.0, 1.0, true),
            ],
        )];
        let set = build(&users);
        let dist = &set.users[0].category_distribution;
        let total: f64 = dist.values().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((dist["fitness"] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn identical_users_get_identical_vectors() {
        let items = &[("fitness", 25.0, 2.5, true), ("study", 45.0, 3.5, false)];
        let users = vec![scored_user("a", 3, items), scored_user("b", 3, items)];
        let set = build(&users);
        assert_eq!(set.users[0].vector, set.users[1].vector);
    }
}
