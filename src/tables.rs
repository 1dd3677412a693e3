//! Category reference tables: keyword bags and expected-time baselines.
//!
//! A [`MatchTables`] is the read-only configuration resource one batch runs
//! against: an *ordered* list of categories, each with the keyword document
//! the classifier matches against and baseline expected minutes per
//! difficulty bucket. A default table is bundled into the binary; an external
//! TOML file can replace it per invocation.

use std::path::Path;

use serde::Deserialize;

use crate::error::TableError;

/// Result type for table loading.
pub type TableResult<T> = std::result::Result<T, TableError>;

/// Category used when a title shares no vocabulary with any keyword document,
/// and as the expected-time fallback row for unknown categories.
pub const FALLBACK_CATEGORY: &str = "other";

/// Expected minutes when neither the category nor the fallback row has an
/// entry for a bucket.
pub const DEFAULT_EXPECTED_MINUTES: f64 = 30.0;

const DEFAULT_TABLES_TOML: &str = include_str!("../data/tables/default.toml");

/// One category row: name, keyword bag, and baseline minutes for buckets 1–5.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryTable {
    pub name: String,
    pub keywords: Vec<String>,
    pub expected_minutes: [f64; 5],
}

/// The full ordered category table for a batch.
///
/// Iteration order is the file order of the `[[category]]` entries; the
/// classifier's tie-breaking and the dynamic skill weighting both depend on
/// it being deterministic.
#[derive(Debug, Clone)]
pub struct MatchTables {
    categories: Vec<CategoryTable>,
}

#[derive(Debug, Deserialize)]
struct TablesToml {
    #[serde(rename = "category")]
    categories: Vec<CategoryTable>,
}

impl MatchTables {
    /// Parse tables from a TOML string.
    pub fn parse(toml_str: &str) -> TableResult<Self> {
        let parsed: TablesToml = toml::from_str(toml_str).map_err(|e| TableError::Parse {
            message: e.to_string(),
        })?;
        if parsed.categories.is_empty() {
            return Err(TableError::Empty);
        }
        Ok(Self {
            categories: parsed.categories,
        })
    }

    /// The table bundled into the binary.
    pub fn bundled() -> TableResult<Self> {
        Self::parse(DEFAULT_TABLES_TOML)
    }

    /// Load tables from an external TOML file.
    pub fn from_path(path: &Path) -> TableResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TableError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Category rows in table order.
    pub fn categories(&self) -> &[CategoryTable] {
        &self.categories
    }

    /// Category names in table order.
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// One synthetic keyword document per category, in table order.
    pub fn keyword_documents(&self) -> Vec<(String, String)> {
        self.categories
            .iter()
            .map(|c| (c.name.clone(), c.keywords.join(" ")))
            .collect()
    }

    /// Baseline expected minutes for a `(category, bucket)` pair.
    ///
    /// Unknown categories fall back to the `"other"` row, then to
    /// [`DEFAULT_EXPECTED_MINUTES`]. Buckets outside 1–5 clamp.
    pub fn expected_minutes(&self, category: &str, bucket: u8) -> f64 {
        let idx = (bucket.clamp(1, 5) - 1) as usize;
        self.categories
            .iter()
            .find(|c| c.name == category)
            .or_else(|| self.categories.iter().find(|c| c.name == FALLBACK_CATEGORY))
            .map(|c| c.expected_minutes[idx])
            .unwrap_or(DEFAULT_EXPECTED_MINUTES)
    }
}
