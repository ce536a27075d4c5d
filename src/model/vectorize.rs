//! Bag-of-words vectoriser with sublinear term frequencies.

use linfa_preprocessing::CountVectorizer;
use ndarray::Array1;
use sprs::CsMat;
use tracing::debug;

use super::TrainingError;

/// Whitespace-tokenised term-frequency vectoriser.
///
/// Terms found in more than `max_df` of the documents are dropped, counts are
/// optionally damped to `1 + ln(tf)` and every row is L2 normalised. No inverse
/// document frequency weighting is applied.
#[derive(Debug, Clone)]
pub struct Vectorizer {
    max_df: f64,
    sublinear_tf: bool,
    vocabulary: Vec<String>,
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Vectorizer {
    pub fn new() -> Self {
        Self {
            max_df: 0.3,
            sublinear_tf: true,
            vocabulary: Vec::new(),
        }
    }

    /// Fraction of documents (0.0-1.0) above which a term is discarded.
    pub fn with_max_df(mut self, max_df: f64) -> Self {
        self.max_df = max_df.clamp(0.0, 1.0);
        self
    }

    pub fn with_sublinear_tf(mut self, sublinear_tf: bool) -> Self {
        self.sublinear_tf = sublinear_tf;
        self
    }

    /// Terms in column order.
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Learn the vocabulary from `documents` and return their CSR rows.
    pub fn fit_transform<S: AsRef<str>>(
        &mut self,
        documents: &[S],
    ) -> Result<CsMat<f64>, TrainingError> {
        if documents.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }

        // sentences arrive lowercased and space separated from the corpus layer
        let texts: Array1<String> = documents.iter().map(|d| d.as_ref().to_string()).collect();
        let counter = CountVectorizer::params()
            .convert_to_lowercase(false)
            .normalize(false)
            .split_regex(r"\S+")
            .document_frequency(0.0, self.max_df as f32)
            .fit(&texts)?;

        self.vocabulary = counter.vocabulary().clone();
        if self.vocabulary.is_empty() {
            return Err(TrainingError::EmptyVocabulary {
                documents: documents.len(),
                max_df: self.max_df,
            });
        }
        debug!(kept = self.vocabulary.len(), max_df = self.max_df, "vocabulary built");

        let counts = counter.transform(&texts);
        Ok(self.weigh(&counts))
    }

    fn weigh(&self, counts: &CsMat<usize>) -> CsMat<f64> {
        let sublinear = self.sublinear_tf;
        let mut rows = counts.map(|&count| {
            if sublinear {
                1.0 + (count as f64).ln()
            } else {
                count as f64
            }
        });
        for mut row in rows.outer_iterator_mut() {
            let norm = row.data().iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                row.map_inplace(|v| v / norm);
            }
        }
        rows
    }
}
