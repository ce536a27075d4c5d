//! Korp (CQP) backend client and KWIC response parser.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{
    token::{SentenceCollector, Token, TokenFilter},
    RetrievalError,
};

/// Korp part-of-speech value for adjectives.
pub const ADJECTIVE_TAG: &str = "A";

/// Run a CQP `query` against `corpus` and collect the filtered sentences.
pub async fn search(
    http: &Client,
    endpoint: &str,
    corpus: &str,
    query: &str,
    filter: &TokenFilter,
    max_sentences: usize,
) -> Result<Vec<String>, RetrievalError> {
    debug!(%corpus, %query, "querying korp");
    let end = max_sentences.saturating_sub(1).to_string();
    let resp = http
        .get(endpoint)
        .query(&[
            ("command", "query"),
            ("corpus", corpus),
            ("cqp", query),
            ("start", "0"),
            ("end", end.as_str()),
            ("show", "lemma,pos"),
            ("show_struct", "sentence_id"),
            ("defaultcontext", "1 sentence"),
            ("defaultwithin", "sentence"),
            ("sort", "random"),
        ])
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(RetrievalError::Status {
            status: resp.status(),
        });
    }
    let body = resp.text().await?;
    let sentences = parse_kwic(&body, filter)?;
    info!(%corpus, count = sentences.len(), "korp sentences retrieved");
    Ok(sentences)
}

#[derive(Debug, Deserialize)]
struct KwicResponse {
    kwic: Option<Vec<KwicHit>>,
    #[serde(rename = "ERROR")]
    error: Option<KorpError>,
}

#[derive(Debug, Deserialize)]
struct KorpError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct KwicHit {
    #[serde(default)]
    structs: HitStructs,
    #[serde(default)]
    tokens: Vec<KwicToken>,
}

#[derive(Debug, Default, Deserialize)]
struct HitStructs {
    sentence_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct KwicToken {
    word: Option<String>,
    lemma: Option<String>,
    pos: Option<String>,
}

/// Parse a Korp `query` response body into filtered sentences.
pub fn parse_kwic(body: &str, filter: &TokenFilter) -> Result<Vec<String>, RetrievalError> {
    let payload: KwicResponse =
        serde_json::from_str(body).map_err(|e| RetrievalError::Malformed(e.to_string()))?;
    if let Some(err) = payload.error {
        return Err(RetrievalError::Backend(format!("{}: {}", err.kind, err.value)));
    }
    let hits = payload
        .kwic
        .ok_or_else(|| RetrievalError::Malformed("response has no kwic array".into()))?;

    let mut collector = SentenceCollector::new();
    for hit in &hits {
        match &hit.structs.sentence_id {
            Some(Value::String(id)) => collector.set_id(id.as_str()),
            Some(Value::Null) | None => {}
            Some(other) => collector.set_id(other.to_string()),
        }
        for token in &hit.tokens {
            let token = Token {
                form: token.word.as_deref(),
                lemma: token.lemma.as_deref(),
                pos: token.pos.as_deref(),
            };
            if let Some(text) = filter.normalise(&token, ADJECTIVE_TAG) {
                collector.push(text);
            }
        }
        collector.finish_sentence();
    }
    Ok(collector.into_sentences())
}
