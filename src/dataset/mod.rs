//! Job requests and assembly of the labelled training sample.

use std::collections::BTreeSet;

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    corpus::{CorpusSelector, CorpusSource, RetrievalError, SearchFlags, TokenFilter},
    model::TrainingError,
};

/// Label of the synthetic class sampled from sentences without the keywords.
pub const CONTRASTIVE: &str = "Contrastive";

/// Keyword group as it may appear in a stored job descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawKeywords {
    Structured(Vec<String>),
    Literal(String),
}

/// Words standing for one class to discriminate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeywordGroup {
    words: Vec<String>,
}

impl KeywordGroup {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words
                .into_iter()
                .map(Into::into)
                .filter(|w: &String| !w.trim().is_empty())
                .collect(),
        }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Class label shown in reports: the comma-joined words.
    pub fn class_name(&self) -> String {
        self.words.join(",")
    }
}

impl From<RawKeywords> for KeywordGroup {
    fn from(raw: RawKeywords) -> Self {
        match raw {
            RawKeywords::Structured(words) => Self::new(words),
            RawKeywords::Literal(text) => Self::new(text.split_whitespace()),
        }
    }
}

impl From<&KeywordGroup> for RawKeywords {
    fn from(group: &KeywordGroup) -> Self {
        RawKeywords::Structured(group.words.clone())
    }
}

/// Everything the pipeline needs to know about one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub groups: Vec<KeywordGroup>,
    pub random: bool,
    pub flags: SearchFlags,
    pub corpus: CorpusSelector,
}

impl JobRequest {
    /// Lowercased union of all keywords, masked out of every retrieved sentence.
    pub fn stopwords(&self) -> BTreeSet<String> {
        self.groups
            .iter()
            .flat_map(|g| g.words())
            .map(|w| w.to_lowercase())
            .collect()
    }

    pub fn token_filter(&self) -> TokenFilter {
        TokenFilter::new(self.flags, self.stopwords())
    }
}

/// One registered class together with the query that produced its sentences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub query: String,
}

/// Sentences with parallel class indices, assigned in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    sentences: Vec<String>,
    labels: Vec<usize>,
    classes: Vec<ClassInfo>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class for `sample`; empty samples register nothing.
    pub fn add_class(&mut self, info: ClassInfo, sample: Vec<String>) -> Option<usize> {
        if sample.is_empty() {
            return None;
        }
        let label = self.classes.len();
        self.classes.push(info);
        self.labels.extend(std::iter::repeat(label).take(sample.len()));
        self.sentences.extend(sample);
        Some(label)
    }

    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn classes(&self) -> &[ClassInfo] {
        &self.classes
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

/// Failure that aborts a job after it was launched.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("retrieving sentences for {class} failed: {source}")]
    Retrieval {
        class: String,
        #[source]
        source: RetrievalError,
    },
    #[error(transparent)]
    Training(#[from] TrainingError),
}

/// Receives human-readable progress lines as the job advances.
pub trait ProgressSink {
    fn message(&mut self, line: String);
}

impl ProgressSink for Vec<String> {
    fn message(&mut self, line: String) {
        self.push(line);
    }
}

/// Shuffle `sentences` and keep at most `cap` of them.
pub fn sample<R: Rng + ?Sized>(mut sentences: Vec<String>, cap: usize, rng: &mut R) -> Vec<String> {
    sentences.shuffle(rng);
    sentences.truncate(cap);
    sentences
}

/// Retrieve one sample per keyword group, plus a contrastive sample when asked.
#[instrument(skip_all, fields(groups = request.groups.len(), random = request.random))]
pub async fn assemble<S, R, P>(
    source: &S,
    request: &JobRequest,
    sample_cap: usize,
    rng: &mut R,
    progress: &mut P,
) -> Result<Dataset, JobError>
where
    S: CorpusSource,
    R: Rng + ?Sized,
    P: ProgressSink + ?Sized,
{
    let backend = source.backend();
    let filter = request.token_filter();
    let mut dataset = Dataset::new();
    let mut registered: Vec<&KeywordGroup> = Vec::new();

    for group in &request.groups {
        let name = group.class_name();
        let retrieval = |source: RetrievalError| JobError::Retrieval {
            class: name.clone(),
            source,
        };
        let query = backend
            .formulate(group.words(), false, request.flags)
            .map_err(|e| retrieval(e.into()))?;
        let retrieved = source.search(&query, &filter).await.map_err(retrieval)?;
        let raw = retrieved.len();
        let picked = sample(retrieved, sample_cap, rng);
        progress.message(format!("{name} dataset size: {}/{raw}", picked.len()));
        info!(class = %name, raw, sampled = picked.len(), "class sample drawn");

        if dataset.add_class(ClassInfo { name, query }, picked).is_some() {
            registered.push(group);
        } else {
            warn!(class = %group.class_name(), "no sentences retrieved; class skipped");
        }
    }

    if let ([only], true) = (registered.as_slice(), request.random) {
        let retrieval = |source: RetrievalError| JobError::Retrieval {
            class: CONTRASTIVE.to_string(),
            source,
        };
        let query = backend
            .formulate(only.words(), true, request.flags)
            .map_err(|e| retrieval(e.into()))?;
        let retrieved = source.search(&query, &filter).await.map_err(retrieval)?;
        let raw = retrieved.len();
        let picked = sample(retrieved, sample_cap, rng);
        progress.message(format!("{CONTRASTIVE} dataset size: {}/{raw}", picked.len()));
        info!(raw, sampled = picked.len(), "contrastive sample drawn");

        let info = ClassInfo {
            name: CONTRASTIVE.to_string(),
            query,
        };
        if dataset.add_class(info, picked).is_none() {
            warn!("contrastive query returned no sentences");
        }
    }

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_keywords_resolve_to_words() {
        let group = KeywordGroup::from(RawKeywords::Literal(" kissa  koira ".into()));
        assert_eq!(group.words(), ["kissa", "koira"]);
        assert_eq!(group.class_name(), "kissa,koira");
    }

    #[test]
    fn raw_keywords_accept_both_shapes() {
        let parsed: Vec<RawKeywords> = serde_json::from_str(r#"[["a","b"],"c d"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                RawKeywords::Structured(vec!["a".into(), "b".into()]),
                RawKeywords::Literal("c d".into()),
            ]
        );
    }

    #[test]
    fn stopwords_are_lowercased_union() {
        let request = JobRequest {
            groups: vec![KeywordGroup::new(["Kissa"]), KeywordGroup::new(["koira", "KISSA"])],
            random: false,
            flags: SearchFlags::default(),
            corpus: CorpusSelector::DepSearch { db: "x".into() },
        };
        let stop: Vec<_> = request.stopwords().into_iter().collect();
        assert_eq!(stop, vec!["kissa", "koira"]);
    }

    #[test]
    fn empty_samples_do_not_register_classes() {
        let mut dataset = Dataset::new();
        let info = |name: &str| ClassInfo {
            name: name.into(),
            query: String::new(),
        };
        assert_eq!(dataset.add_class(info("a"), vec![]), None);
        assert_eq!(dataset.add_class(info("b"), vec!["x".into(), "y".into()]), Some(0));
        assert_eq!(dataset.add_class(info("c"), vec!["z".into()]), Some(1));
        assert_eq!(dataset.labels(), [0, 0, 1]);
        assert_eq!(dataset.class_names(), ["b", "c"]);
    }

    #[test]
    fn sampling_caps_without_duplicating() {
        use rand::{rngs::StdRng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(7);
        let input: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let mut picked = sample(input, 5, &mut rng);
        assert_eq!(picked.len(), 5);
        picked.sort();
        picked.dedup();
        assert_eq!(picked.len(), 5);
    }
}
