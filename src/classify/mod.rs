//! Category inference from free-text item titles.
//!
//! One synthetic document per category (its keywords joined), one tf-idf fit
//! over those documents per batch, then every title is scored against every
//! category document and takes the argmax. The same fitted classifier must
//! serve all items of a batch so scores stay comparable.

pub mod tfidf;

use crate::tables::{FALLBACK_CATEGORY, MatchTables};

use tfidf::TfidfModel;

/// A classifier fitted over one batch's category keyword documents.
#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    names: Vec<String>,
    vectors: Vec<Vec<f64>>,
    model: TfidfModel,
}

impl CategoryClassifier {
    /// Fit the classifier over the supplied keyword table.
    pub fn fit(tables: &MatchTables) -> Self {
        let documents = tables.keyword_documents();
        let docs: Vec<&str> = documents.iter().map(|(_, doc)| doc.as_str()).collect();
        let model = TfidfModel::fit(&docs);
        let vectors = docs.iter().map(|doc| model.transform(doc)).collect();
        let names = documents.into_iter().map(|(name, _)| name).collect();
        Self {
            names,
            vectors,
            model,
        }
    }

    /// Assign a category to a title.
    ///
    /// Ties resolve to the earliest category in table order. A title with no
    /// vocabulary overlap against any category (all similarities zero)
    /// resolves to [`FALLBACK_CATEGORY`].
    pub fn classify(&self, title: &str) -> &str {
        let title_vec = self.model.transform(title);
        let mut best_index = 0usize;
        let mut best_score = 0.0f64;
        for (index, cat_vec) in self.vectors.iter().enumerate() {
            let score = tfidf::cosine(&title_vec, cat_vec);
            if score > best_score {
                best_score = score;
                best_index = index;
            }
        }
        if best_score > 0.0 {
            &self.names[best_index]
        } else {
            FALLBACK_CATEGORY
        }
    }

    /// Category names in table order.
    pub fn category_names(&self) -> &[String] {
        &self.names
    }
}
