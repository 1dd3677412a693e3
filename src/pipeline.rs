//! Batch pipeline: the top-level API for the kindred engine.
//!
//! A [`MatchPipeline`] owns the category tables and the history store and
//! runs one batch at a time through the staged dataflow:
//!
//! normalize → classify → load history → difficulty pass 1 → history
//! rebuild + save → difficulty pass 2 → features → weighting → location →
//! scale + cosine + blend → rank.
//!
//! Degenerate input (an empty user or group list) short-circuits to `None`
//! — the empty-result contract — before any computation or history write.
//!
//! Batches must run strictly sequentially: the history store write is
//! last-writer-wins (see [`crate::store`]).

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::classify::CategoryClassifier;
use crate::difficulty::{self, HISTORY_WEIGHT};
use crate::error::KindredResult;
use crate::features::{self, FeatureSet};
use crate::model::{
    ClassifiedUser, GroupMatchReport, GroupRecord, ScoredUser, UserMatchReport, UserRecord,
};
use crate::similarity::{self, BEHAVIORAL_WEIGHT, LOCATION_WEIGHT};
use crate::store::{HistoryStore, durable::DurableHistoryStore, mem::MemHistoryStore};
use crate::tables::MatchTables;
use crate::weighting::{self, BaseWeights};
use crate::{groups, store};

/// Configuration for a match pipeline.
#[derive(Debug)]
pub struct PipelineConfig {
    /// Category keyword + expected-time tables for this pipeline.
    pub tables: MatchTables,
    /// Directory for the durable history database. `None` keeps history in
    /// memory only (tests, one-shot runs).
    pub data_dir: Option<PathBuf>,
    /// Historical blend weight for difficulty pass 2.
    pub history_weight: f64,
    /// Behavioral share of the combined user-to-user score.
    pub behavioral_weight: f64,
    /// Location share of the combined user-to-user score.
    pub location_weight: f64,
    /// Base feature weights.
    pub weights: BaseWeights,
}

impl PipelineConfig {
    /// Default configuration over the given tables.
    pub fn new(tables: MatchTables) -> Self {
        Self {
            tables,
            data_dir: None,
            history_weight: HISTORY_WEIGHT,
            behavioral_weight: BEHAVIORAL_WEIGHT,
            location_weight: LOCATION_WEIGHT,
            weights: BaseWeights::default(),
        }
    }
}

/// The kindred match pipeline.
pub struct MatchPipeline {
    config: PipelineConfig,
    store: Box<dyn HistoryStore>,
}

/// Everything the shared stages produce for one batch.
struct BatchFeatures {
    users: Vec<ScoredUser>,
    features: FeatureSet,
}

impl MatchPipeline {
    /// Create a pipeline, opening the durable history store when a data
    /// directory is configured and an in-memory store otherwise.
    pub fn new(config: PipelineConfig) -> KindredResult<Self> {
        let store: Box<dyn HistoryStore> = match &config.data_dir {
            Some(dir) => Box::new(DurableHistoryStore::open(dir)?),
            None => Box::new(MemHistoryStore::new()),
        };
        tracing::info!(
            categories = config.tables.categories().len(),
            persistent = config.data_dir.is_some(),
            "initializing match pipeline"
        );
        Ok(Self { config, store })
    }

    /// Create a pipeline over an injected history store.
    pub fn with_store(config: PipelineConfig, store: Box<dyn HistoryStore>) -> Self {
        Self { config, store }
    }

    /// Rank every user in the batch against every other user.
    ///
    /// Returns `None` for an empty batch (the empty-result contract).
    pub fn match_users(&self, records: &[UserRecord]) -> KindredResult<Option<UserMatchReport>> {
        let Some(batch) = self.compute_features(records)? else {
            return Ok(None);
        };

        let weighted = weighting::apply(
            &batch.features,
            &batch.users,
            &self.config.tables,
            &self.config.weights,
        );
        let scaled = similarity::min_max_scale(&weighted);
        let behavioral = similarity::cosine_matrix(&scaled);
        let location = similarity::location_matrix(&batch.users);
        let combined = similarity::blend(
            &behavioral,
            &location,
            self.config.behavioral_weight,
            self.config.location_weight,
        );

        let user_ids: Vec<String> = batch.users.iter().map(|u| u.id.clone()).collect();
        let (best_connection, worst_connection) = similarity::extreme_pairs(&combined, &user_ids);
        let best_to_worst: BTreeMap<String, Vec<_>> = user_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), similarity::rank_others(&combined, &user_ids, i)))
            .collect();

        trace_user_diagnostics(&batch, &combined, &user_ids);
        if let Some(best) = &best_connection {
            tracing::debug!(
                pair = ?best.pair,
                similarity = format_args!("{:.3}", best.similarity),
                "best connection"
            );
        }
        if let Some(worst) = &worst_connection {
            tracing::debug!(
                pair = ?worst.pair,
                similarity = format_args!("{:.3}", worst.similarity),
                "worst connection"
            );
        }

        let categories = batch
            .users
            .iter()
            .map(|u| {
                (
                    u.id.clone(),
                    u.items.iter().map(|i| i.category.clone()).collect(),
                )
            })
            .collect();

        Ok(Some(UserMatchReport {
            user_ids,
            feature_vectors: batch.features.vectors(),
            similarity_matrix: combined,
            categories,
            best_connection,
            worst_connection,
            best_to_worst,
        }))
    }

    /// Rank every group against every user in the batch.
    ///
    /// Returns `None` when either list is empty (the empty-result contract).
    pub fn match_groups(
        &self,
        records: &[UserRecord],
        group_records: &[GroupRecord],
    ) -> KindredResult<Option<GroupMatchReport>> {
        if group_records.is_empty() {
            return Ok(None);
        }
        let Some(batch) = self.compute_features(records)? else {
            return Ok(None);
        };

        let user_ids: Vec<String> = batch.users.iter().map(|u| u.id.clone()).collect();
        let user_vectors = batch.features.vectors();
        let resolved = groups::group_vectors(group_records, &user_ids, &user_vectors);
        let group_ids: Vec<String> = resolved.iter().map(|(id, _)| id.clone()).collect();
        let group_vecs: Vec<Vec<f64>> = resolved.into_iter().map(|(_, v)| v).collect();

        let matrix = groups::similarity_matrix(&user_vectors, &group_vecs);
        let best_to_worst_groups = groups::rank_groups(&matrix, &user_ids, &group_ids);

        for (user_id, ranked) in &best_to_worst_groups {
            for entry in ranked.iter().take(5) {
                tracing::trace!(
                    user = %user_id,
                    group = %entry.group,
                    score = format_args!("{:.3}", entry.score),
                    "group suggestion"
                );
            }
        }

        Ok(Some(GroupMatchReport {
            best_to_worst_groups,
            similarity_matrix: matrix,
            group_ids,
        }))
    }

    /// The stages shared by both match modes: classification, both
    /// difficulty passes with the history rebuild between them, and feature
    /// aggregation.
    fn compute_features(&self, records: &[UserRecord]) -> KindredResult<Option<BatchFeatures>> {
        if records.is_empty() {
            return Ok(None);
        }

        let classifier = CategoryClassifier::fit(&self.config.tables);
        let classified: Vec<ClassifiedUser> = records
            .iter()
            .map(|record| {
                ClassifiedUser::from_record(record, |title| {
                    classifier.classify(title).to_string()
                })
            })
            .collect();

        let mut history = self.store.load()?;
        tracing::debug!(entries = history.len(), "loaded history table");

        let pass1 = difficulty::score_pass1(&classified, &self.config.tables);
        difficulty::rebuild_history(&pass1, &self.config.tables, &mut history);
        self.store.save(&history)?;
        tracing::debug!(entries = history.len(), "rebuilt and saved history table");

        let pass2 = difficulty::score_pass2(
            &pass1,
            &self.config.tables,
            &history,
            self.config.history_weight,
        );
        let features = features::build(&pass2);

        Ok(Some(BatchFeatures {
            users: pass2,
            features,
        }))
    }

    /// The history table as currently persisted.
    pub fn history(&self) -> KindredResult<store::HistoryTable> {
        Ok(self.store.load()?)
    }

    /// The tables this pipeline runs against.
    pub fn tables(&self) -> &MatchTables {
        &self.config.tables
    }
}

impl std::fmt::Debug for MatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchPipeline")
            .field("config", &self.config)
            .finish()
    }
}

fn trace_user_diagnostics(batch: &BatchFeatures, combined: &[Vec<f64>], user_ids: &[String]) {
    for (user, feat) in batch.users.iter().zip(&batch.features.users) {
        for item in &user.items {
            tracing::trace!(
                user = %user.id,
                title = %item.title,
                category = %item.category,
                difficulty = format_args!("{:.2}", item.difficulty),
                "scored item"
            );
        }
        tracing::trace!(
            user = %user.id,
            distribution = ?feat.category_distribution,
            "category distribution"
        );
    }
    for (i, row) in combined.iter().enumerate() {
        tracing::trace!(user = %user_ids[i], row = ?row, "combined similarity row");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HistoryKey;

    fn pipeline() -> MatchPipeline {
        MatchPipeline::new(PipelineConfig::new(MatchTables::bundled().unwrap())).unwrap()
    }

    fn user(id: &str, tz: &str, country: &str, tasks: &[(&str, f64, bool)]) -> UserRecord {
        let tasks_json: Vec<serde_json::Value> = tasks
            .iter()
            .map(|(text, time, checked)| {
                serde_json::json!({"text": text, "timeTaken": time, "checked": checked})
            })
            .collect();
        serde_json::from_value(serde_json::json!({
            "id": id,
            "tasks": tasks_json,
            "goals": [],
            "streak_days": 3,
            "Country": country,
            "time_zone": tz,
        }))
        .unwrap()
    }

    #[test]
    fn empty_batch_returns_none() {
        let result = pipeline().match_users(&[]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn empty_groups_return_none() {
        let users = vec![user("u1", "Europe/Amsterdam", "NL", &[("run", 30.0, true)])];
        let result = pipeline().match_groups(&users, &[]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn report_covers_every_user() {
        let users = vec![
            user("u1", "Europe/Amsterdam", "NL", &[("morning run", 30.0, true)]),
            user("u2", "Europe/Amsterdam", "NL", &[("study chapter", 60.0, false)]),
            user("u3", "Asia/Tokyo", "JP", &[("clean kitchen", 20.0, true)]),
        ];
        let report = pipeline().match_users(&users).unwrap().unwrap();

        assert_eq!(report.user_ids.len(), 3);
        assert_eq!(report.feature_vectors.len(), 3);
        assert_eq!(report.similarity_matrix.len(), 3);
        assert_eq!(report.best_to_worst.len(), 3);
        for (id, ranked) in &report.best_to_worst {
            assert_eq!(ranked.len(), 2);
            assert!(ranked.iter().all(|r| &r.other_id != id));
            assert!(ranked[0].score >= ranked[1].score);
        }
        for row in &report.similarity_matrix {
            for &v in row {
                assert!((-1.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn identical_twins_score_near_one() {
        let tasks: &[(&str, f64, bool)] = &[("morning run", 30.0, true), ("read chapter", 45.0, false)];
        let users = vec![
            user("twin1", "Europe/Amsterdam", "NL", tasks),
            user("twin2", "Europe/Amsterdam", "NL", tasks),
        ];
        let report = pipeline().match_users(&users).unwrap().unwrap();
        let score = report.similarity_matrix[0][1];
        assert!((score - 1.0).abs() < 1e-9, "combined similarity was {score}");
    }

    #[test]
    fn history_survives_the_batch() {
        let p = pipeline();
        let users = vec![user(
            "u1",
            "Europe/Amsterdam",
            "NL",
            &[("morning run", 30.0, true)],
        )];
        p.match_users(&users).unwrap().unwrap();
        let history = p.history().unwrap();
        // Every bucket of the observed category is present after a run.
        for b in 1..=5 {
            assert!(history.contains_key(&HistoryKey::new("fitness", b)));
        }
    }

    #[test]
    fn singleton_group_of_its_only_user_scores_one() {
        let users = vec![user("solo", "Europe/Amsterdam", "NL", &[("run", 30.0, true)])];
        let groups = vec![GroupRecord {
            id: "g1".into(),
            members: vec!["solo".into()],
        }];
        let report = pipeline().match_groups(&users, &groups).unwrap().unwrap();
        assert!((report.similarity_matrix[0][0] - 1.0).abs() < 1e-9);
    }
}
