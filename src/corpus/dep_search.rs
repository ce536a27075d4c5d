//! dep_search web API client and tab-separated result parser.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info};

use super::{
    token::{SentenceCollector, Token, TokenFilter},
    RetrievalError,
};

/// Universal part-of-speech tag for adjectives.
pub const ADJECTIVE_TAG: &str = "ADJ";

const ID: usize = 0;
const FORM: usize = 1;
const LEMMA: usize = 2;
const UPOS: usize = 3;

static SENTENCE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\s*(?:sent_id|db_tree_id)\s*[=:]\s*(\S+)").expect("valid regex")
});

/// Run `query` against treebank `db` and collect the filtered sentences.
pub async fn search(
    http: &Client,
    endpoint: &str,
    db: &str,
    query: &str,
    filter: &TokenFilter,
    max_sentences: usize,
) -> Result<Vec<String>, RetrievalError> {
    debug!(%db, %query, "querying dep_search");
    let retmax = max_sentences.to_string();
    let resp = http
        .get(endpoint)
        .query(&[
            ("db", db),
            ("search", query),
            ("case", py_bool(filter.flags().case_sensitive)),
            ("retmax", retmax.as_str()),
            ("shuffle", py_bool(true)),
        ])
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(RetrievalError::Status {
            status: resp.status(),
        });
    }
    let body = resp.text().await?;
    let sentences = parse_stream(&body, filter)?;
    info!(%db, count = sentences.len(), "dep_search sentences retrieved");
    Ok(sentences)
}

/// Parse a CoNLL-U style stream: blank lines end sentences, `#` lines carry metadata.
pub fn parse_stream(body: &str, filter: &TokenFilter) -> Result<Vec<String>, RetrievalError> {
    let mut collector = SentenceCollector::new();
    for (line_no, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            collector.finish_sentence();
            continue;
        }
        if line.starts_with('#') {
            if let Some(caps) = SENTENCE_ID.captures(line) {
                collector.set_id(&caps[1]);
            }
            continue;
        }

        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() <= UPOS {
            return Err(RetrievalError::Malformed(format!(
                "line {} has {} columns, expected at least {}",
                line_no + 1,
                cols.len(),
                UPOS + 1
            )));
        }
        // multiword ranges and empty nodes duplicate the surrounding words
        if cols[ID].contains(['-', '.']) {
            continue;
        }

        let token = Token {
            form: field(cols[FORM]),
            lemma: field(cols[LEMMA]),
            pos: field(cols[UPOS]),
        };
        if let Some(text) = filter.normalise(&token, ADJECTIVE_TAG) {
            collector.push(text);
        }
    }
    Ok(collector.into_sentences())
}

fn field(value: &str) -> Option<&str> {
    match value {
        "" | "_" => None,
        other => Some(other),
    }
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
