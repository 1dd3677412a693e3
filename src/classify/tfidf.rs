//! Batch-scoped tf-idf vectorization.
//!
//! A [`TfidfModel`] is fitted over one document set and then transforms
//! arbitrary text into L2-normalized term-weight vectors over that fitted
//! vocabulary. Models are cheap and local to a single batch invocation —
//! the vocabulary changes with every batch, so a fit is never shared or
//! cached across calls.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Word tokens: lowercased runs of word characters, minimum length 2.
static RE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Split text into lowercase word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    RE_TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A fitted tf-idf vectorizer: sorted vocabulary plus per-term inverse
/// document frequencies.
#[derive(Debug, Clone)]
pub struct TfidfModel {
    /// term → column index, iteration order = sorted term order.
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfModel {
    /// Fit a model over a document set.
    ///
    /// idf(t) = ln((1 + n_docs) / (1 + df(t))) + 1 — smoothed so that terms
    /// appearing in every document still carry weight and empty document
    /// sets cannot divide by zero.
    pub fn fit<S: AsRef<str>>(docs: &[S]) -> Self {
        let n_docs = docs.len() as f64;
        let mut df: BTreeMap<String, usize> = BTreeMap::new();
        for doc in docs {
            let mut seen: Vec<String> = tokenize(doc.as_ref());
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(df.len());
        for (index, (term, count)) in df.into_iter().enumerate() {
            idf.push(((1.0 + n_docs) / (1.0 + count as f64)).ln() + 1.0);
            vocabulary.insert(term, index);
        }
        Self { vocabulary, idf }
    }

    /// Transform text into an L2-normalized tf-idf vector over the fitted
    /// vocabulary. Text with no in-vocabulary tokens yields a zero vector.
    pub fn transform(&self, text: &str) -> Vec<f64> {
        let mut weights = vec![0.0; self.vocabulary.len()];
        for token in tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                weights[index] += self.idf[index];
            }
        }
        let norm = weights.iter().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for w in &mut weights {
                *w /= norm;
            }
        }
        weights
    }

    /// Vocabulary terms in sorted (column) order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.vocabulary.keys().map(String::as_str)
    }

    /// Number of vocabulary terms.
    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }
}

/// Cosine similarity between two equal-length vectors.
///
/// A zero-norm operand yields 0.0 rather than NaN. Rounding in the norm
/// product can push the quotient an ulp past ±1, so the result is clamped.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_drops_short_tokens() {
        let tokens = tokenize("Go for a 5k Run!");
        assert_eq!(tokens, vec!["5k", "run"]);
    }

    #[test]
    fn vocabulary_is_sorted() {
        let model = TfidfModel::fit(&["zebra apple", "apple mango"]);
        let terms: Vec<&str> = model.terms().collect();
        assert_eq!(terms, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn transform_is_l2_normalized() {
        let model = TfidfModel::fit(&["run gym swim", "read study"]);
        let vec = model.transform("run swim swim");
        let norm: f64 = vec.iter().map(|w| w * w).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_vocabulary_text_is_zero_vector() {
        let model = TfidfModel::fit(&["run gym", "read study"]);
        let vec = model.transform("quantum chromodynamics");
        assert!(vec.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn rare_terms_outweigh_common_terms() {
        // "run" appears in both docs, "zebra" in one — idf favors "zebra".
        let model = TfidfModel::fit(&["run zebra", "run walk"]);
        let vec = model.transform("run zebra");
        let terms: Vec<&str> = model.terms().collect();
        let run = terms.iter().position(|&t| t == "run").unwrap();
        let zebra = terms.iter().position(|&t| t == "zebra").unwrap();
        assert!(vec[zebra] > vec[run]);
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.3, 0.4, 0.5];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_stays_within_unit_range() {
        // √3·√3 rounds below 3, so the unclamped quotient would exceed 1.
        let v = vec![1.0; 3];
        assert_eq!(cosine(&v, &v), 1.0);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        let v = vec![0.3, 0.4];
        let z = vec![0.0, 0.0];
        assert_eq!(cosine(&v, &z), 0.0);
        assert_eq!(cosine(&z, &z), 0.0);
    }

    #[test]
    fn fit_over_empty_docs_is_empty_model() {
        let docs: Vec<&str> = vec![];
        let model = TfidfModel::fit(&docs);
        assert!(model.is_empty());
        assert!(model.transform("anything").is_empty());
    }
}
