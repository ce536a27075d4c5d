//! Runtime configuration utilities for keyword-contrast.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::Context;

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Folder holding hashed job descriptors.
    pub jobs_dir: PathBuf,
    /// Folder receiving rendered result pages.
    pub results_dir: PathBuf,
    /// Root of the statically served assets, mounted at `/static`.
    pub static_dir: PathBuf,
    /// Stylesheet URL handed to job reports.
    pub style_url: String,
    /// dep_search web API endpoint.
    pub dep_search_url: String,
    /// dep_search browser UI, used for result links.
    pub dep_search_browse_url: String,
    /// Treebank queried when the web form does not name one.
    pub dep_search_db: String,
    /// Korp backend endpoint.
    pub korp_url: String,
    /// Korp browser UI, used for result links.
    pub korp_browse_url: String,
    /// Sentences kept per class after shuffling.
    pub sample_cap: usize,
    /// Upper bound on sentences requested from a backend per query.
    pub max_sentences: usize,
    /// Ranked features reported per class.
    pub top_features: usize,
    /// Fixed seed for sampling; entropy when absent.
    pub shuffle_seed: Option<u64>,
    /// Timeout applied to every corpus request.
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jobs_dir: PathBuf::from("./tmp_dir"),
            results_dir: PathBuf::from("./static/results"),
            static_dir: PathBuf::from("./static"),
            style_url: "/static/style.css".to_string(),
            dep_search_url: "http://epsilon-it.utu.fi/dep_search_webapi".to_string(),
            dep_search_browse_url: "http://epsilon-it.utu.fi/dep_search/".to_string(),
            dep_search_db: "Suomi24".to_string(),
            korp_url: "https://korp.csc.fi/cgi-bin/korp/korp.cgi".to_string(),
            korp_browse_url: "https://korp.csc.fi/".to_string(),
            sample_cap: 5000,
            max_sentences: 10_000,
            top_features: 50,
            shuffle_seed: None,
            http_timeout: Duration::from_secs(600),
        }
    }
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let settings = Self {
            jobs_dir: env_path("JOBS_DIR").unwrap_or(defaults.jobs_dir),
            results_dir: env_path("RESULTS_DIR").unwrap_or(defaults.results_dir),
            static_dir: env_path("STATIC_DIR").unwrap_or(defaults.static_dir),
            style_url: env::var("STYLE_URL").unwrap_or(defaults.style_url),
            dep_search_url: env::var("DEP_SEARCH_URL").unwrap_or(defaults.dep_search_url),
            dep_search_browse_url: env::var("DEP_SEARCH_BROWSE_URL")
                .unwrap_or(defaults.dep_search_browse_url),
            dep_search_db: env::var("DEP_SEARCH_DB").unwrap_or(defaults.dep_search_db),
            korp_url: env::var("KORP_URL").unwrap_or(defaults.korp_url),
            korp_browse_url: env::var("KORP_BROWSE_URL").unwrap_or(defaults.korp_browse_url),
            sample_cap: env_parse("SAMPLE_CAP").unwrap_or(defaults.sample_cap),
            max_sentences: env_parse("MAX_SENTENCES").unwrap_or(defaults.max_sentences),
            top_features: env_parse("TOP_FEATURES").unwrap_or(defaults.top_features),
            shuffle_seed: env_parse("SHUFFLE_SEED"),
            http_timeout: env_parse("HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
        };

        settings.ensure_dirs()?;
        Ok(settings)
    }

    /// Create the job and result folders if they are missing.
    pub fn ensure_dirs(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.jobs_dir).context("creating jobs dir")?;
        std::fs::create_dir_all(&self.results_dir).context("creating results dir")?;
        Ok(())
    }

    /// Location of the descriptor for a hashed job.
    pub fn job_path(&self, hash: &str) -> PathBuf {
        self.jobs_dir.join(format!("{hash}.json"))
    }

    /// Convenience helper for derived result path segments.
    pub fn join_results<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.results_dir.join(path)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().map(PathBuf::from)
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
