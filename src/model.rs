//! Data model: wire-level records, staged item types, and match reports.
//!
//! Items move through the pipeline as immutable stages rather than in-place
//! mutation: [`Item`] (normalized) → [`ClassifiedItem`] (category assigned) →
//! [`ScoredItem`] (difficulty assigned). Each difficulty pass produces a fresh
//! set of [`ScoredItem`]s, which makes the pass ordering explicit and lets the
//! stages be tested in isolation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Wire-level input ────────────────────────────────────────────────────

/// A task as it arrives in a match request.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskInput {
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "timeTaken")]
    pub time_taken: f64,
    #[serde(default)]
    pub checked: bool,
}

/// A goal as it arrives in a match request.
#[derive(Debug, Clone, Deserialize)]
pub struct GoalInput {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "timeTaken")]
    pub time_taken: f64,
    #[serde(default, rename = "workoutCompleted")]
    pub completed: bool,
}

/// A user as it arrives in a match request.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub tasks: Vec<TaskInput>,
    #[serde(default)]
    pub goals: Vec<GoalInput>,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default, rename = "Country")]
    pub country: String,
    #[serde(default)]
    pub time_zone: String,
}

/// A group as it arrives in a group-match request: an id plus member user ids.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Envelope for the group-match mode.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupMatchRequest {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}

// ── Staged item types ───────────────────────────────────────────────────

/// A normalized activity item. Tasks and goals both collapse to this shape.
#[derive(Debug, Clone)]
pub struct Item {
    pub title: String,
    /// Observed completion time in minutes.
    pub time_taken: f64,
    pub completed: bool,
}

impl Item {
    pub fn from_task(task: &TaskInput) -> Self {
        Self {
            title: task.text.clone(),
            time_taken: task.time_taken,
            completed: task.checked,
        }
    }

    pub fn from_goal(goal: &GoalInput) -> Self {
        Self {
            title: goal.title.clone(),
            time_taken: goal.time_taken,
            completed: goal.completed,
        }
    }

    /// Attach a category, producing the next stage.
    pub fn classified(self, category: impl Into<String>) -> ClassifiedItem {
        ClassifiedItem {
            title: self.title,
            time_taken: self.time_taken,
            completed: self.completed,
            category: category.into(),
        }
    }
}

/// An item with its inferred category.
#[derive(Debug, Clone)]
pub struct ClassifiedItem {
    pub title: String,
    pub time_taken: f64,
    pub completed: bool,
    pub category: String,
}

impl ClassifiedItem {
    /// Attach a difficulty, producing the next stage.
    pub fn scored(&self, difficulty: f64) -> ScoredItem {
        ScoredItem {
            title: self.title.clone(),
            time_taken: self.time_taken,
            completed: self.completed,
            category: self.category.clone(),
            difficulty,
        }
    }
}

/// An item with category and predicted difficulty in `[1, 5]`.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub title: String,
    pub time_taken: f64,
    pub completed: bool,
    pub category: String,
    pub difficulty: f64,
}

impl ScoredItem {
    /// Difficulty-per-minute skill score for this item.
    pub fn skill_score(&self) -> f64 {
        self.difficulty / self.time_taken.max(1.0)
    }

    /// Re-score with a refined difficulty.
    pub fn rescored(&self, difficulty: f64) -> ScoredItem {
        ScoredItem {
            difficulty,
            ..self.clone()
        }
    }
}

// ── Staged user types ───────────────────────────────────────────────────

/// A user whose items have been normalized and categorized.
///
/// `success_rate` is the fraction of completed items (0 for a user with no
/// items); it is fixed at classification time and carried through both
/// difficulty passes.
#[derive(Debug, Clone)]
pub struct ClassifiedUser {
    pub id: String,
    pub items: Vec<ClassifiedItem>,
    pub streak_days: u32,
    pub country: String,
    pub time_zone: String,
    pub success_rate: f64,
}

impl ClassifiedUser {
    /// Normalize a wire-level record: tasks ∪ goals, categories assigned by
    /// the caller via `classify`.
    pub fn from_record(record: &UserRecord, mut classify: impl FnMut(&str) -> String) -> Self {
        let items: Vec<ClassifiedItem> = record
            .tasks
            .iter()
            .map(Item::from_task)
            .chain(record.goals.iter().map(Item::from_goal))
            .map(|item| {
                let category = classify(&item.title);
                item.classified(category)
            })
            .collect();
        let success_rate = if items.is_empty() {
            0.0
        } else {
            items.iter().filter(|i| i.completed).count() as f64 / items.len() as f64
        };
        Self {
            id: record.id.clone(),
            items,
            streak_days: record.streak_days,
            country: record.country.clone(),
            time_zone: record.time_zone.clone(),
            success_rate,
        }
    }
}

/// A user whose items carry predicted difficulties.
///
/// `completion_factor` is the mean ratio of expected to actual time across
/// the user's items; it starts at 1.0 (pass 1) and is refined in pass 2.
#[derive(Debug, Clone)]
pub struct ScoredUser {
    pub id: String,
    pub items: Vec<ScoredItem>,
    pub streak_days: u32,
    pub country: String,
    pub time_zone: String,
    pub success_rate: f64,
    pub completion_factor: f64,
}

// ── Match reports ───────────────────────────────────────────────────────

/// One entry in a user's ranked list of other users.
#[derive(Debug, Clone, Serialize)]
pub struct RankedUser {
    pub other_id: String,
    pub score: f64,
}

/// One entry in a user's ranked list of groups.
#[derive(Debug, Clone, Serialize)]
pub struct RankedGroup {
    pub group: String,
    pub score: f64,
}

/// The single best- or worst-scoring unordered user pair in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub pair: (String, String),
    pub similarity: f64,
}

/// Full result of a user-to-user match batch.
#[derive(Debug, Clone, Serialize)]
pub struct UserMatchReport {
    pub user_ids: Vec<String>,
    pub feature_vectors: Vec<Vec<f64>>,
    pub similarity_matrix: Vec<Vec<f64>>,
    /// Per-user assigned categories, in item order.
    pub categories: BTreeMap<String, Vec<String>>,
    pub best_connection: Option<Connection>,
    pub worst_connection: Option<Connection>,
    pub best_to_worst: BTreeMap<String, Vec<RankedUser>>,
}

/// Full result of a user-to-group match batch.
#[derive(Debug, Clone, Serialize)]
pub struct GroupMatchReport {
    pub best_to_worst_groups: BTreeMap<String, Vec<RankedGroup>>,
    pub similarity_matrix: Vec<Vec<f64>>,
    pub group_ids: Vec<String>,
}
