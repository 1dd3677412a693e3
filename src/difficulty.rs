//! Adaptive difficulty prediction.
//!
//! Difficulty is the ratio of observed to expected completion time, corrected
//! by the user's completion factor and dampened for long streaks and high
//! success rates, clamped to `[1, 5]`. It takes two passes:
//!
//! 1. **Pass 1** knows only the manual expected-time tables (history weight
//!    0) and a neutral completion factor of 1.0.
//! 2. The batch's pass-1 buckets rebuild the historical-time table (mean
//!    observed minutes per `(category, bucket)`), which is persisted.
//! 3. **Pass 2** blends historical and manual expected times (0.7 / 0.3),
//!    refines each user's completion factor from the blended expectations,
//!    and re-predicts every difficulty. Pass-2 output flows downstream.

use crate::model::{ClassifiedUser, ScoredUser};
use crate::store::{HistoryKey, HistoryTable};
use crate::tables::MatchTables;

/// Bucket hint for items that have no difficulty assigned yet.
pub const NEUTRAL_DIFFICULTY: f64 = 3.0;

/// Historical blend weight for the second pass.
pub const HISTORY_WEIGHT: f64 = 0.7;

/// Difficulty rounded to its nearest integer bucket in 1–5.
pub fn bucket(difficulty: f64) -> u8 {
    difficulty.clamp(1.0, 5.0).round() as u8
}

/// Expected-time and difficulty math for one pass.
#[derive(Debug)]
pub struct Estimator<'a> {
    tables: &'a MatchTables,
    history: &'a HistoryTable,
    history_weight: f64,
}

impl<'a> Estimator<'a> {
    pub fn new(tables: &'a MatchTables, history: &'a HistoryTable, history_weight: f64) -> Self {
        Self {
            tables,
            history,
            history_weight,
        }
    }

    /// Expected minutes for an item of `category` at the bucket implied by
    /// `difficulty_hint`, blending the historical table with the manual one
    /// at this estimator's weight. Missing history falls back to manual.
    pub fn expected_minutes(&self, category: &str, difficulty_hint: f64) -> f64 {
        let b = bucket(difficulty_hint);
        let manual = self.tables.expected_minutes(category, b);
        let historical = self
            .history
            .get(&HistoryKey::new(category, b))
            .copied()
            .unwrap_or(manual);
        self.history_weight * historical + (1.0 - self.history_weight) * manual
    }

    /// Predict a difficulty in `[1, 5]`.
    ///
    /// Streaks (capped at 30 days) and success rates (capped at 0.3) both
    /// dampen the raw time ratio: a user who reliably finishes things is
    /// assumed to have found the item easier than the raw ratio suggests.
    pub fn predict(
        &self,
        time_taken: f64,
        expected: f64,
        completion_factor: f64,
        streak_days: u32,
        success_rate: f64,
    ) -> f64 {
        let base = time_taken / expected.max(1.0) / completion_factor.max(0.1);
        let adjustment =
            (1.0 - (streak_days as f64 / 30.0).min(0.3)) * (1.0 - success_rate.min(0.3));
        (base * adjustment).clamp(1.0, 5.0)
    }
}

/// Pass 1: score every item using manual tables only.
pub fn score_pass1(users: &[ClassifiedUser], tables: &MatchTables) -> Vec<ScoredUser> {
    let no_history = HistoryTable::new();
    let estimator = Estimator::new(tables, &no_history, 0.0);
    users
        .iter()
        .map(|user| {
            let items = user
                .items
                .iter()
                .map(|item| {
                    let expected = estimator.expected_minutes(&item.category, NEUTRAL_DIFFICULTY);
                    let difficulty = estimator.predict(
                        item.time_taken,
                        expected,
                        1.0,
                        user.streak_days,
                        user.success_rate,
                    );
                    item.scored(difficulty)
                })
                .collect();
            ScoredUser {
                id: user.id.clone(),
                items,
                streak_days: user.streak_days,
                country: user.country.clone(),
                time_zone: user.time_zone.clone(),
                success_rate: user.success_rate,
                completion_factor: 1.0,
            }
        })
        .collect()
}

/// Rebuild the historical-time table from pass-1 difficulties.
///
/// For every category present in the batch, all five buckets are replaced:
/// the mean observed `time_taken` where the batch has observations, the
/// manual baseline where it does not. Entries for categories absent from
/// the batch are left untouched.
pub fn rebuild_history(users: &[ScoredUser], tables: &MatchTables, history: &mut HistoryTable) {
    let mut batch_categories: Vec<&str> = users
        .iter()
        .flat_map(|u| u.items.iter().map(|i| i.category.as_str()))
        .collect();
    batch_categories.sort_unstable();
    batch_categories.dedup();

    for category in batch_categories {
        for b in 1..=5u8 {
            let times: Vec<f64> = users
                .iter()
                .flat_map(|u| u.items.iter())
                .filter(|i| i.category == category && bucket(i.difficulty) == b)
                .map(|i| i.time_taken)
                .collect();
            let minutes = if times.is_empty() {
                tables.expected_minutes(category, b)
            } else {
                times.iter().sum::<f64>() / times.len() as f64
            };
            history.insert(HistoryKey::new(category, b), minutes);
        }
    }
}

/// Pass 2: blend history into expected times, refine completion factors,
/// and re-predict every difficulty.
pub fn score_pass2(
    users: &[ScoredUser],
    tables: &MatchTables,
    history: &HistoryTable,
    history_weight: f64,
) -> Vec<ScoredUser> {
    let estimator = Estimator::new(tables, history, history_weight);
    users
        .iter()
        .map(|user| {
            // Buckets come from the pass-1 difficulties.
            let expected: Vec<f64> = user
                .items
                .iter()
                .map(|i| estimator.expected_minutes(&i.category, i.difficulty))
                .collect();

            let completion_factor = if user.items.is_empty() {
                1.0
            } else {
                let ratios: f64 = expected
                    .iter()
                    .zip(&user.items)
                    .map(|(e, i)| e / i.time_taken.max(1.0))
                    .sum();
                ratios / user.items.len() as f64
            };

            let items = user
                .items
                .iter()
                .zip(&expected)
                .map(|(item, &e)| {
                    let difficulty = estimator.predict(
                        item.time_taken,
                        e,
                        completion_factor,
                        user.streak_days,
                        user.success_rate,
                    );
                    item.rescored(difficulty)
                })
                .collect();

            ScoredUser {
                id: user.id.clone(),
                items,
                streak_days: user.streak_days,
                country: user.country.clone(),
                time_zone: user.time_zone.clone(),
                success_rate: user.success_rate,
                completion_factor,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassifiedItem, UserRecord};

    fn tables() -> MatchTables {
        MatchTables::parse(
            r#"
            [[category]]
            name = "fitness"
            keywords = ["run"]
            expected_minutes = [15.0, 30.0, 45.0, 60.0, 90.0]

            [[category]]
            name = "other"
            keywords = ["misc"]
            expected_minutes = [10.0, 20.0, 30.0, 45.0, 60.0]
            "#,
        )
        .unwrap()
    }

    fn user(id: &str, streak: u32, items: &[(&str, f64, bool)]) -> ClassifiedUser {
        let items: Vec<ClassifiedItem> = items
            .iter()
            .map(|(cat, time, done)| ClassifiedItem {
                title: format!("{cat} item"),
                time_taken: *time,
                completed: *done,
                category: cat.to_string(),
            })
            .collect();
        let success_rate = if items.is_empty() {
            0.0
        } else {
            items.iter().filter(|i| i.completed).count() as f64 / items.len() as f64
        };
        ClassifiedUser {
            id: id.into(),
            items,
            streak_days: streak,
            country: String::new(),
            time_zone: String::new(),
            success_rate,
        }
    }

    #[test]
    fn bucket_rounds_and_clamps() {
        assert_eq!(bucket(0.2), 1);
        assert_eq!(bucket(3.4), 3);
        assert_eq!(bucket(3.6), 4);
        assert_eq!(bucket(9.0), 5);
    }

    #[test]
    fn difficulty_stays_in_range_after_both_passes() {
        let t = tables();
        let users = vec![
            user("u1", 0, &[("fitness", 1.0, false), ("fitness", 500.0, true)]),
            user("u2", 40, &[("other", 0.0, true)]),
        ];
        let pass1 = score_pass1(&users, &t);
        for u in &pass1 {
            for i in &u.items {
                assert!((1.0..=5.0).contains(&i.difficulty), "{}", i.difficulty);
            }
        }
        let mut history = HistoryTable::new();
        rebuild_history(&pass1, &t, &mut history);
        let pass2 = score_pass2(&pass1, &t, &history, HISTORY_WEIGHT);
        for u in &pass2 {
            for i in &u.items {
                assert!((1.0..=5.0).contains(&i.difficulty), "{}", i.difficulty);
            }
        }
    }

    #[test]
    fn streaks_dampen_difficulty() {
        let t = tables();
        let slow = &[("fitness", 120.0, false)];
        let pass_fresh = score_pass1(&[user("fresh", 0, slow)], &t);
        let pass_streaky = score_pass1(&[user("streaky", 30, slow)], &t);
        assert!(pass_streaky[0].items[0].difficulty < pass_fresh[0].items[0].difficulty);
    }

    #[test]
    fn streak_dampening_caps_at_thirty_days() {
        let t = tables();
        let slow = &[("fitness", 120.0, false)];
        let thirty = score_pass1(&[user("a", 30, slow)], &t);
        let ninety = score_pass1(&[user("b", 90, slow)], &t);
        assert_eq!(
            thirty[0].items[0].difficulty,
            ninety[0].items[0].difficulty
        );
    }

    #[test]
    fn zero_item_user_keeps_default_metrics() {
        let t = tables();
        let pass1 = score_pass1(&[user("empty", 5, &[])], &t);
        assert_eq!(pass1[0].completion_factor, 1.0);
        let mut history = HistoryTable::new();
        rebuild_history(&pass1, &t, &mut history);
        assert!(history.is_empty());
        let pass2 = score_pass2(&pass1, &t, &history, HISTORY_WEIGHT);
        assert_eq!(pass2[0].completion_factor, 1.0);
        assert!(pass2[0].items.is_empty());
    }

    #[test]
    fn rebuild_takes_mean_of_observed_times() {
        let t = tables();
        // Neutral bucket 3 expects 45 min; 45 min taken → ratio 1 → clamps to
        // difficulty 1 → observations land in bucket 1.
        let users = vec![
            user("u1", 0, &[("fitness", 45.0, false)]),
            user("u2", 0, &[("fitness", 15.0, false)]),
        ];
        let pass1 = score_pass1(&users, &t);
        let mut history = HistoryTable::new();
        rebuild_history(&pass1, &t, &mut history);
        assert_eq!(history[&HistoryKey::new("fitness", 1)], 30.0);
        // Buckets with no observations fall back to the manual table.
        assert_eq!(history[&HistoryKey::new("fitness", 5)], 90.0);
    }

    #[test]
    fn rebuild_keeps_categories_absent_from_the_batch() {
        let t = tables();
        let mut history = HistoryTable::new();
        history.insert(HistoryKey::new("study", 2), 42.0);
        let pass1 = score_pass1(&[user("u1", 0, &[("fitness", 20.0, false)])], &t);
        rebuild_history(&pass1, &t, &mut history);
        assert_eq!(history[&HistoryKey::new("study", 2)], 42.0);
    }

    #[test]
    fn pass2_blends_history_into_expected_times() {
        let t = tables();
        let mut history = HistoryTable::new();
        history.insert(HistoryKey::new("fitness", 3), 100.0);
        let estimator = Estimator::new(&t, &history, 0.7);
        // 0.7 * 100 + 0.3 * 45
        assert!((estimator.expected_minutes("fitness", 3.0) - 83.5).abs() < 1e-9);
        // Unrecorded buckets collapse to the manual value.
        assert_eq!(estimator.expected_minutes("fitness", 5.0), 90.0);
    }

    #[test]
    fn pass2_refines_completion_factor() {
        let t = tables();
        let users = vec![user("u1", 0, &[("fitness", 30.0, true)])];
        let pass1 = score_pass1(&users, &t);
        let mut history = HistoryTable::new();
        rebuild_history(&pass1, &t, &mut history);
        let pass2 = score_pass2(&pass1, &t, &history, HISTORY_WEIGHT);
        // expected/actual over the single item; no longer the 1.0 default.
        assert!(pass2[0].completion_factor > 0.0);
        assert_ne!(pass2[0].completion_factor, 1.0);
    }

    #[test]
    fn normalized_records_flow_through_pass1() {
        let record: UserRecord = serde_json::from_str(
            r#"{"id": "w", "tasks": [{"text": "long run", "timeTaken": 50, "checked": true}]}"#,
        )
        .unwrap();
        let classified = ClassifiedUser::from_record(&record, |_| "fitness".into());
        let scored = score_pass1(&[classified], &tables());
        assert_eq!(scored[0].items.len(), 1);
        assert_eq!(scored[0].items[0].category, "fitness");
    }
}
