//! Job descriptors and the background job runner.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224};
use tracing::{error, info, instrument};

use crate::{
    config::Settings,
    corpus::{CorpusClient, CorpusSelector, CorpusSource, SearchFlags},
    dataset::{self, JobError, JobRequest, KeywordGroup, ProgressSink, RawKeywords},
    model::{self, TrainerConfig},
    report::{ClassFeatures, JobOutcome, Report},
};

/// On-disk job description; fields are declared in key order so the
/// serialised form is canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub adjective: bool,
    pub case_sensitive: bool,
    pub corpus: CorpusSelector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub keywords: Vec<RawKeywords>,
    pub lemma: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub random: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl JobDescriptor {
    pub fn from_request(request: &JobRequest) -> Self {
        Self {
            adjective: request.flags.adjective_only,
            case_sensitive: request.flags.case_sensitive,
            corpus: request.corpus.clone(),
            date: None,
            keywords: request.groups.iter().map(RawKeywords::from).collect(),
            lemma: request.flags.lemma,
            pid: None,
            random: request.random,
            time: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("read job {path:?}"))?;
        serde_json::from_str(&text).with_context(|| format!("parse job {path:?}"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Job processes may read the descriptor while the front end rewrites it.
        let staging = path.with_extension("json.tmp");
        let json = serde_json::to_string(self)?;
        std::fs::write(&staging, json).with_context(|| format!("write job {staging:?}"))?;
        std::fs::rename(&staging, path).with_context(|| format!("move job into {path:?}"))
    }

    /// Resolve the stored keyword shapes into the pipeline request.
    pub fn request(&self) -> JobRequest {
        JobRequest {
            groups: self
                .keywords
                .iter()
                .cloned()
                .map(KeywordGroup::from)
                .filter(|g| !g.is_empty())
                .collect(),
            random: self.random,
            flags: SearchFlags {
                case_sensitive: self.case_sensitive,
                lemma: self.lemma,
                adjective_only: self.adjective,
            },
            corpus: self.corpus.clone(),
        }
    }

    /// SHA-224 of the canonical request, ignoring launch bookkeeping.
    pub fn hash(&self) -> Result<String> {
        let canonical = Self {
            date: None,
            time: None,
            pid: None,
            ..self.clone()
        };
        let json = serde_json::to_string(&canonical)?;
        let digest = Sha224::digest(json.as_bytes());
        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn report_file_name(&self, hash: &str) -> String {
        format!(
            "{hash}{}{}.html",
            self.date.as_deref().unwrap_or_default(),
            self.time.as_deref().unwrap_or_default()
        )
    }

    /// Human-readable recap of the request, shared by the web answer and the report.
    pub fn summary(&self) -> [String; 2] {
        let request = self.request();
        let keywords = request
            .groups
            .iter()
            .map(KeywordGroup::class_name)
            .collect::<Vec<_>>()
            .join(" & ");
        [
            format!("Keywords: {keywords}"),
            format!(
                "Random:{} Case sensitive:{} Lemma:{} Only adjectives:{}",
                py_bool(self.random),
                py_bool(self.case_sensitive),
                py_bool(self.lemma),
                py_bool(self.adjective)
            ),
        ]
    }

    /// Launch time as shown to users, `dd-mm-yy HH:MM:SS`.
    pub fn launched_at(&self) -> String {
        format!(
            "{} {}",
            self.date.as_deref().unwrap_or_default(),
            self.time.as_deref().unwrap_or_default().replace('-', ":")
        )
    }
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Tunables of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sample_cap: usize,
    pub shuffle_seed: Option<u64>,
    pub trainer: TrainerConfig,
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            sample_cap: settings.sample_cap,
            shuffle_seed: settings.shuffle_seed,
            trainer: TrainerConfig {
                top_features: settings.top_features,
                seed: settings.shuffle_seed.unwrap_or_default(),
                ..TrainerConfig::default()
            },
        }
    }
}

/// Run the job stored under `hash` and return the path of its report.
#[instrument(skip(settings))]
pub async fn run(settings: &Settings, hash: &str, style_path: &str) -> Result<PathBuf> {
    let descriptor = JobDescriptor::load(&settings.job_path(hash))?;
    let path = settings.join_results(descriptor.report_file_name(hash));
    let mut report = Report::new(path, style_path);
    begin(&descriptor, &mut report)?;

    let config = PipelineConfig::from_settings(settings);
    let outcome = match CorpusClient::new(settings, descriptor.corpus.clone()) {
        Ok(client) => execute(&client, &descriptor.request(), &config, &mut report).await,
        Err(err) => {
            error!(error = %err, "could not build corpus client");
            JobOutcome::Failed(err.to_string())
        }
    };
    report.finish(outcome)?;
    Ok(report.path().to_path_buf())
}

/// Write the opening lines of a job's report.
pub fn begin(descriptor: &JobDescriptor, report: &mut Report) -> Result<()> {
    report.push("Running, update the page occasionally to see the results.");
    report.push(descriptor.launched_at());
    for line in descriptor.summary() {
        report.push(line);
    }
    report.write_progress()
}

/// Assemble, train and rank; every failure becomes a `Failed` outcome.
pub async fn execute<S, P>(
    source: &S,
    request: &JobRequest,
    config: &PipelineConfig,
    progress: &mut P,
) -> JobOutcome
where
    S: CorpusSource,
    P: ProgressSink + ?Sized,
{
    match pipeline(source, request, config, progress).await {
        Ok(classes) => JobOutcome::Completed(classes),
        Err(err) => {
            error!(error = %err, "job failed");
            JobOutcome::Failed(err.to_string())
        }
    }
}

async fn pipeline<S, P>(
    source: &S,
    request: &JobRequest,
    config: &PipelineConfig,
    progress: &mut P,
) -> Result<Vec<ClassFeatures>, JobError>
where
    S: CorpusSource,
    P: ProgressSink + ?Sized,
{
    let mut rng = match config.shuffle_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let dataset =
        dataset::assemble(source, request, config.sample_cap, &mut rng, progress).await?;
    if dataset.is_empty() {
        return Err(model::TrainingError::EmptyDataset.into());
    }
    info!(
        sentences = dataset.len(),
        classes = dataset.classes().len(),
        "dataset assembled"
    );

    let features = model::train(dataset.sentences(), dataset.labels(), &config.trainer)?;
    Ok(dataset
        .classes()
        .iter()
        .zip(features)
        .map(|(class, features)| ClassFeatures {
            name: class.name.clone(),
            link: source.browse_link(&class.query).unwrap_or_default(),
            features,
        })
        .collect())
}
