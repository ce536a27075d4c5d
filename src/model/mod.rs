//! Classifier training and ranked feature extraction.

pub mod svm;
pub mod vectorize;

use std::{collections::BTreeSet, fmt};

use linfa_preprocessing::PreprocessingError;

use ndarray::ArrayView1;
use thiserror::Error;
use tracing::{info, instrument};

use self::{svm::LinearSvc, vectorize::Vectorizer};

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("insufficient data: no sentences were retrieved")]
    EmptyDataset,
    #[error("insufficient data: need at least 2 classes with sentences, found {found}")]
    InsufficientClasses { found: usize },
    #[error("got {sentences} sentences but {labels} labels")]
    LengthMismatch { sentences: usize, labels: usize },
    #[error("sentence {index} is empty")]
    EmptySentence { index: usize },
    #[error(
        "no terms remain after dropping those present in more than {max_df} of {documents} sentences"
    )]
    EmptyVocabulary { documents: usize, max_df: f64 },
    #[error("invalid training parameter: {0}")]
    InvalidParameter(String),
    #[error("vectorising sentences failed: {0}")]
    Vectorize(#[from] PreprocessingError),
}

/// One ranked feature of a class.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub token: String,
    pub weight: f64,
}

impl Feature {
    /// Weight rounded to three significant digits.
    pub fn display_weight(&self) -> String {
        format_weight(self.weight)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.token, self.display_weight())
    }
}

/// Features of one class, strongest first.
pub type FeatureList = Vec<Feature>;

/// Knobs of the training stage.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub c: f64,
    pub max_df: f64,
    pub sublinear_tf: bool,
    pub top_features: usize,
    pub tolerance: f64,
    pub max_iter: usize,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            c: 0.1,
            max_df: 0.3,
            sublinear_tf: true,
            top_features: 50,
            tolerance: 1e-4,
            max_iter: 1000,
            seed: 0,
        }
    }
}

/// Fit a linear classifier on `sentences` and rank the features of each class.
///
/// The result holds one list per distinct label, ordered by label value. A
/// two-class fit only produces a hyperplane for the second class; the first
/// class receives the same weights read from the other end, negated.
#[instrument(skip_all, fields(sentences = sentences.len()))]
pub fn train<S: AsRef<str>>(
    sentences: &[S],
    labels: &[usize],
    config: &TrainerConfig,
) -> Result<Vec<FeatureList>, TrainingError> {
    if sentences.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    if sentences.len() != labels.len() {
        return Err(TrainingError::LengthMismatch {
            sentences: sentences.len(),
            labels: labels.len(),
        });
    }
    let found = labels.iter().collect::<BTreeSet<_>>().len();
    if found < 2 {
        return Err(TrainingError::InsufficientClasses { found });
    }
    if let Some(index) = sentences
        .iter()
        .position(|s| s.as_ref().split_whitespace().next().is_none())
    {
        return Err(TrainingError::EmptySentence { index });
    }

    let mut vectorizer = Vectorizer::new()
        .with_max_df(config.max_df)
        .with_sublinear_tf(config.sublinear_tf);
    let rows = vectorizer.fit_transform(sentences)?;
    let vocabulary = vectorizer.vocabulary();
    info!(terms = vocabulary.len(), nnz = rows.nnz(), "sentences vectorised");

    let model = LinearSvc::new()
        .with_c(config.c)
        .with_tolerance(config.tolerance)
        .with_max_iter(config.max_iter)
        .with_seed(config.seed)
        .fit(&rows, labels)?;

    let mut per_class: Vec<FeatureList> = model
        .coef
        .outer_iter()
        .map(|weights| top_features(weights, vocabulary, config.top_features, false))
        .collect();
    if model.coef.nrows() == 1 {
        let first = top_features(model.coef.row(0), vocabulary, config.top_features, true);
        per_class.insert(0, first);
    }
    info!(classes = per_class.len(), "features extracted");
    Ok(per_class)
}

/// The `n` strongest features of a weight vector.
///
/// With `negated` the vector is read from its most negative end and weights
/// are sign-flipped, giving the features of the implicit opposite class.
pub fn top_features(
    weights: ArrayView1<'_, f64>,
    vocabulary: &[String],
    n: usize,
    negated: bool,
) -> FeatureList {
    let sign = if negated { -1.0 } else { 1.0 };
    let mut ranked: Vec<(usize, f64)> = weights
        .iter()
        .enumerate()
        .map(|(j, &w)| (j, sign * w))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| vocabulary[a.0].cmp(&vocabulary[b.0]))
    });
    ranked
        .into_iter()
        .take(n)
        .map(|(j, weight)| Feature {
            token: vocabulary[j].clone(),
            weight,
        })
        .collect()
}

/// Render `value` with three significant digits.
pub fn format_weight(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    if value.abs() < f64::MIN_POSITIVE {
        return format!("{value:.2e}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10f64.powi(2 - magnitude);
    let rounded = (value * scale).round() / scale;
    // rounding may carry into the next power of ten (0.09996 -> 0.1)
    let magnitude = rounded.abs().log10().floor() as i32;
    let decimals = (2 - magnitude).max(0) as usize;
    format!("{rounded:.decimals$}")
}
