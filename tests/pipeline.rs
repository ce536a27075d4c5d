use std::{collections::HashMap, sync::Mutex};

use keyword_contrast::{
    corpus::{Backend, CorpusSelector, CorpusSource, RetrievalError, SearchFlags, TokenFilter},
    dataset::{self, JobRequest, KeywordGroup, CONTRASTIVE},
    job::{self, PipelineConfig},
    model::{self, TrainerConfig, TrainingError},
    report::{JobOutcome, Report, DONE},
};
use rand::{rngs::StdRng, SeedableRng};

/// Answers dep_search queries from a fixed table and records what was asked.
struct FakeCorpus {
    answers: HashMap<String, Vec<String>>,
    asked: Mutex<Vec<String>>,
}

impl FakeCorpus {
    fn new(answers: &[(&str, Vec<String>)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(q, s)| (q.to_string(), s.clone()))
                .collect(),
            asked: Mutex::new(Vec::new()),
        }
    }

    fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl CorpusSource for FakeCorpus {
    fn backend(&self) -> Backend {
        Backend::DepSearch
    }

    async fn search(&self, query: &str, _filter: &TokenFilter) -> Result<Vec<String>, RetrievalError> {
        self.asked.lock().unwrap().push(query.to_string());
        Ok(self.answers.get(query).cloned().unwrap_or_default())
    }

    fn browse_link(&self, query: &str) -> Option<String> {
        Some(format!("http://browse/?search={query}"))
    }
}

/// `n` sentences over a five word pool, each word in 40% of them.
fn sentences(prefix: &str, n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("{prefix}{} {prefix}{}", i % 5, (i + 1) % 5))
        .collect()
}

fn request(groups: &[&[&str]], random: bool) -> JobRequest {
    JobRequest {
        groups: groups.iter().map(|g| KeywordGroup::new(g.iter().copied())).collect(),
        random,
        flags: SearchFlags::default(),
        corpus: CorpusSelector::DepSearch {
            db: "test".into(),
        },
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        sample_cap: 5000,
        shuffle_seed: Some(3),
        trainer: TrainerConfig::default(),
    }
}

#[tokio::test]
async fn two_groups_give_two_classes() {
    let corpus = FakeCorpus::new(&[
        ("\"cat\"", sentences("miau", 10)),
        ("\"dog\"", sentences("hau", 10)),
    ]);
    let mut progress = Vec::new();
    let mut rng = StdRng::seed_from_u64(1);
    let dataset = dataset::assemble(&corpus, &request(&[&["cat"], &["dog"]], false), 5000, &mut rng, &mut progress)
        .await
        .unwrap();

    assert_eq!(dataset.class_names(), ["cat", "dog"]);
    assert_eq!(dataset.len(), 20);
    assert_eq!(progress, ["cat dataset size: 10/10", "dog dataset size: 10/10"]);
}

#[tokio::test]
async fn groups_without_sentences_are_skipped() {
    let corpus = FakeCorpus::new(&[
        ("\"cat\"", sentences("miau", 10)),
        ("\"dog\"", sentences("hau", 10)),
    ]);
    let mut progress = Vec::new();
    let mut rng = StdRng::seed_from_u64(1);
    let dataset = dataset::assemble(
        &corpus,
        &request(&[&["cat"], &["bird"], &["dog"]], false),
        5000,
        &mut rng,
        &mut progress,
    )
    .await
    .unwrap();

    assert_eq!(dataset.class_names(), ["cat", "dog"]);
    assert_eq!(dataset.labels().iter().filter(|&&l| l == 1).count(), 10);
    assert_eq!(progress[1], "bird dataset size: 0/0");
}

#[tokio::test]
async fn single_group_with_random_adds_contrastive_class() {
    let corpus = FakeCorpus::new(&[
        ("\"cat\"", sentences("miau", 10)),
        ("_ -> !(\"cat\")", sentences("muu", 12)),
    ]);
    let mut progress = Vec::new();
    let mut rng = StdRng::seed_from_u64(1);
    let dataset = dataset::assemble(&corpus, &request(&[&["cat"]], true), 8, &mut rng, &mut progress)
        .await
        .unwrap();

    assert_eq!(dataset.class_names(), ["cat", CONTRASTIVE]);
    assert_eq!(dataset.len(), 16);
    assert_eq!(progress[1], "Contrastive dataset size: 8/12");
    assert_eq!(corpus.asked(), ["\"cat\"", "_ -> !(\"cat\")"]);
}

#[tokio::test]
async fn random_is_not_used_with_two_registered_groups() {
    let corpus = FakeCorpus::new(&[
        ("\"cat\"", sentences("miau", 10)),
        ("\"dog\"", sentences("hau", 10)),
    ]);
    let mut rng = StdRng::seed_from_u64(1);
    let dataset = dataset::assemble(&corpus, &request(&[&["cat"], &["dog"]], true), 5000, &mut rng, &mut Vec::new())
        .await
        .unwrap();
    assert_eq!(dataset.classes().len(), 2);
    assert_eq!(corpus.asked().len(), 2);
}

#[tokio::test]
async fn sampling_is_reproducible_with_a_seed() {
    let corpus = FakeCorpus::new(&[
        ("\"cat\"", sentences("miau", 40)),
        ("\"dog\"", sentences("hau", 40)),
    ]);
    let req = request(&[&["cat"], &["dog"]], false);
    let mut first_rng = StdRng::seed_from_u64(9);
    let mut second_rng = StdRng::seed_from_u64(9);
    let first = dataset::assemble(&corpus, &req, 7, &mut first_rng, &mut Vec::new())
        .await
        .unwrap();
    let second = dataset::assemble(&corpus, &req, 7, &mut second_rng, &mut Vec::new())
        .await
        .unwrap();
    assert_eq!(first.sentences(), second.sentences());
    assert_eq!(first.len(), 14);
}

#[test]
fn binary_training_reports_both_sides() {
    let mut docs = sentences("miau", 10);
    docs.extend(sentences("hau", 10));
    let labels: Vec<usize> = (0..20).map(|i| i / 10).collect();

    let lists = model::train(&docs, &labels, &TrainerConfig::default()).unwrap();
    assert_eq!(lists.len(), 2);
    assert!(lists[0][0].token.starts_with("miau"));
    assert!(lists[1][0].token.starts_with("hau"));
    for list in &lists {
        assert!(list.len() <= 50);
        assert!(list.windows(2).all(|w| w[0].weight >= w[1].weight));
    }
    assert!(lists[0][0].weight > 0.0);
}

#[test]
fn multiclass_training_ranks_each_class() {
    let mut docs = sentences("miau", 10);
    docs.extend(sentences("hau", 10));
    docs.extend(sentences("muu", 10));
    let labels: Vec<usize> = (0..30).map(|i| i / 10).collect();

    let lists = model::train(&docs, &labels, &TrainerConfig::default()).unwrap();
    assert_eq!(lists.len(), 3);
    for (list, prefix) in lists.iter().zip(["miau", "hau", "muu"]) {
        assert!(list[0].token.starts_with(prefix), "{prefix}: {:?}", list[0]);
    }
}

#[test]
fn one_class_is_not_enough() {
    let docs = sentences("miau", 10);
    let err = model::train(&docs, &[0; 10], &TrainerConfig::default()).unwrap_err();
    assert!(matches!(err, TrainingError::InsufficientClasses { found: 1 }));
}

#[tokio::test]
async fn executed_job_writes_finished_report() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = FakeCorpus::new(&[
        ("\"cat\"", sentences("miau", 10)),
        ("\"dog\"", sentences("hau", 10)),
    ]);
    let mut report = Report::new(dir.path().join("out.html"), "/static/style.css");
    let outcome = job::execute(&corpus, &request(&[&["cat"], &["dog"]], false), &config(), &mut report).await;
    let JobOutcome::Completed(classes) = &outcome else {
        panic!("job failed: {outcome:?}");
    };
    assert_eq!(classes[0].name, "cat");
    assert_eq!(classes[1].link, "http://browse/?search=\"dog\"");

    report.finish(outcome).unwrap();
    let html = std::fs::read_to_string(dir.path().join("out.html")).unwrap();
    assert!(report.messages().iter().any(|m| m == "cat dataset size: 10/10"));
    assert!(html.contains(DONE));
    assert!(html.contains("miau0"));
    assert!(!html.contains("http-equiv=\"refresh\""));
}

#[tokio::test]
async fn single_group_job_contrasts_against_random_sample() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = FakeCorpus::new(&[
        ("\"cat\"", sentences("miau", 10)),
        ("_ -> !(\"cat\")", sentences("muu", 10)),
    ]);
    let mut report = Report::new(dir.path().join("out.html"), "");
    let outcome = job::execute(&corpus, &request(&[&["cat"]], true), &config(), &mut report).await;
    let JobOutcome::Completed(classes) = &outcome else {
        panic!("job failed: {outcome:?}");
    };

    let names: Vec<_> = classes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["cat", CONTRASTIVE]);
    assert!(classes[0].features[0].token.starts_with("miau"));
    assert!(classes[1].features[0].token.starts_with("muu"));
    for class in classes {
        assert!(!class.features.is_empty());
        assert!(class.features.windows(2).all(|w| w[0].weight >= w[1].weight));
    }
    assert_eq!(classes[1].link, "http://browse/?search=_ -> !(\"cat\")");
}

#[tokio::test]
async fn failed_job_reports_the_reason() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = FakeCorpus::new(&[("\"cat\"", sentences("miau", 10))]);
    let mut report = Report::new(dir.path().join("out.html"), "");
    let outcome = job::execute(&corpus, &request(&[&["cat"], &["dog"]], false), &config(), &mut report).await;
    assert!(matches!(outcome, JobOutcome::Failed(_)));

    report.finish(outcome).unwrap();
    let messages = report.messages();
    assert!(messages[messages.len() - 2].starts_with("Error: insufficient data"));
    assert_eq!(messages.last().map(String::as_str), Some(DONE));
}
