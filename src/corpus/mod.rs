//! Corpus retrieval layer: query formulation, backend clients, token masking.

pub mod dep_search;
pub mod korp;
pub mod query;
pub mod token;

use std::{fmt, future::Future};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::Settings;

pub use query::QueryError;
pub use token::{SearchFlags, Token, TokenFilter};

/// Failure while fetching or decoding corpus sentences.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("corpus request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("corpus backend answered with status {status}")]
    Status { status: reqwest::StatusCode },
    #[error("malformed corpus response: {0}")]
    Malformed(String),
    #[error("corpus backend reported an error: {0}")]
    Backend(String),
}

/// Search backend families; each speaks its own query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    DepSearch,
    Korp,
}

impl Backend {
    /// Formulate the backend query matching (or, with `negate`, avoiding) `words`.
    pub fn formulate(
        self,
        words: &[String],
        negate: bool,
        flags: SearchFlags,
    ) -> Result<String, QueryError> {
        match self {
            Self::DepSearch => query::dep_search(words, negate, flags.lemma),
            Self::Korp => query::cqp(words, negate, flags.lemma, flags.case_sensitive),
        }
    }

    pub fn adjective_tag(self) -> &'static str {
        match self {
            Self::DepSearch => dep_search::ADJECTIVE_TAG,
            Self::Korp => korp::ADJECTIVE_TAG,
        }
    }
}

/// Which backend and which corpus on it a job searches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum CorpusSelector {
    DepSearch { db: String },
    Korp { corpus: String },
}

impl CorpusSelector {
    pub fn backend(&self) -> Backend {
        match self {
            Self::DepSearch { .. } => Backend::DepSearch,
            Self::Korp { .. } => Backend::Korp,
        }
    }

    /// Parse the compact `backend:corpus` form used by the web form.
    pub fn parse(value: &str) -> Option<Self> {
        let (backend, name) = value.trim().split_once(':')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        match backend.trim() {
            "dep_search" => Some(Self::DepSearch { db: name.into() }),
            "korp" => Some(Self::Korp {
                corpus: name.into(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for CorpusSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepSearch { db } => write!(f, "dep_search:{db}"),
            Self::Korp { corpus } => write!(f, "korp:{corpus}"),
        }
    }
}

/// Anything able to answer a formulated query with normalised sentences.
pub trait CorpusSource {
    fn backend(&self) -> Backend;

    fn search(
        &self,
        query: &str,
        filter: &TokenFilter,
    ) -> impl Future<Output = Result<Vec<String>, RetrievalError>> + Send;

    /// Link to the backend's browser UI showing `query`, when one exists.
    fn browse_link(&self, _query: &str) -> Option<String> {
        None
    }
}

/// HTTP client bound to one configured corpus.
#[derive(Debug, Clone)]
pub struct CorpusClient {
    http: Client,
    selector: CorpusSelector,
    endpoint: String,
    browse_url: String,
    max_sentences: usize,
}

impl CorpusClient {
    pub fn new(settings: &Settings, selector: CorpusSelector) -> Result<Self, RetrievalError> {
        let http = Client::builder()
            .user_agent(concat!("keyword-contrast/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.http_timeout)
            .gzip(true)
            .brotli(true)
            .build()?;
        let (endpoint, browse_url) = match selector.backend() {
            Backend::DepSearch => (&settings.dep_search_url, &settings.dep_search_browse_url),
            Backend::Korp => (&settings.korp_url, &settings.korp_browse_url),
        };
        Ok(Self {
            http,
            endpoint: endpoint.clone(),
            browse_url: browse_url.clone(),
            selector,
            max_sentences: settings.max_sentences,
        })
    }
}

impl CorpusSource for CorpusClient {
    fn backend(&self) -> Backend {
        self.selector.backend()
    }

    #[instrument(skip(self, filter), fields(corpus = %self.selector))]
    async fn search(&self, query: &str, filter: &TokenFilter) -> Result<Vec<String>, RetrievalError> {
        match &self.selector {
            CorpusSelector::DepSearch { db } => {
                dep_search::search(&self.http, &self.endpoint, db, query, filter, self.max_sentences)
                    .await
            }
            CorpusSelector::Korp { corpus } => {
                korp::search(&self.http, &self.endpoint, corpus, query, filter, self.max_sentences)
                    .await
            }
        }
    }

    fn browse_link(&self, query: &str) -> Option<String> {
        let encoded = urlencoding::encode(query);
        let link = match &self.selector {
            CorpusSelector::DepSearch { db } => {
                format!("{}?db={}&search={encoded}", self.browse_url, urlencoding::encode(db))
            }
            CorpusSelector::Korp { corpus } => format!(
                "{}#?corpus={}&cqp={encoded}&search_tab=2",
                self.browse_url,
                urlencoding::encode(&corpus.to_lowercase())
            ),
        };
        Some(link)
    }
}
