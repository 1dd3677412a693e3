//! # kindred
//!
//! A behavioral matchmaking engine: derives feature vectors from per-user
//! task/goal activity and ranks users against each other (and against
//! groups) by combined behavioral + location similarity.
//!
//! ## Architecture
//!
//! - **Classification** (`classify`): keyword-bag tf-idf category inference
//! - **Difficulty** (`difficulty`): two-pass 1–5 prediction with a persisted
//!   historical-time feedback loop
//! - **Durable history** (`store`): redb-backed `(category, bucket) → mean
//!   minutes` table, rebuilt every batch
//! - **Features** (`features`): fixed-order behavioral vectors + tf-idf
//!   interest distributions
//! - **Scoring** (`weighting`, `similarity`, `groups`): dynamic weighting,
//!   min-max scaling, cosine ranking
//!
//! ## Library usage
//!
//! ```no_run
//! use kindred::pipeline::{MatchPipeline, PipelineConfig};
//! use kindred::tables::MatchTables;
//!
//! let tables = MatchTables::bundled().unwrap();
//! let pipeline = MatchPipeline::new(PipelineConfig::new(tables)).unwrap();
//! let users: Vec<kindred::model::UserRecord> =
//!     serde_json::from_str(r#"[{"id": "u1"}, {"id": "u2"}]"#).unwrap();
//! let report = pipeline.match_users(&users).unwrap();
//! ```

pub mod classify;
pub mod difficulty;
pub mod error;
pub mod features;
pub mod groups;
pub mod model;
pub mod pipeline;
pub mod similarity;
pub mod store;
pub mod tables;
pub mod weighting;
