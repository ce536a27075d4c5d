//! Token normalisation shared by every corpus backend.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Retrieval switches chosen by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchFlags {
    pub case_sensitive: bool,
    pub lemma: bool,
    pub adjective_only: bool,
}

/// Borrowed view of one token as reported by a backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Token<'a> {
    pub form: Option<&'a str>,
    pub lemma: Option<&'a str>,
    pub pos: Option<&'a str>,
}

/// Decides which tokens survive into a sentence and in what form.
#[derive(Debug, Clone, Default)]
pub struct TokenFilter {
    flags: SearchFlags,
    stopwords: HashSet<String>,
}

impl TokenFilter {
    pub fn new<I, S>(flags: SearchFlags, stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            flags,
            stopwords: stopwords
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn flags(&self) -> SearchFlags {
        self.flags
    }

    /// Return the text to emit for `token`, or `None` when it is masked.
    ///
    /// `adjective_tag` is the backend's part-of-speech value for adjectives.
    pub fn normalise(&self, token: &Token<'_>, adjective_tag: &str) -> Option<String> {
        let text = if self.flags.lemma {
            token.lemma
        } else {
            token.form
        };
        let text = text.filter(|t| !t.is_empty())?;

        if self.flags.adjective_only && token.pos != Some(adjective_tag) {
            return None;
        }

        let lowered = text.to_lowercase();
        let masked = if self.flags.lemma {
            // compound boundaries and hyphens are ignored when masking lemmas
            let key = lowered.replace(['-', '#'], "");
            self.stopwords.contains(&key)
        } else {
            self.stopwords.contains(&lowered)
        };

        (!masked).then_some(lowered)
    }
}

/// Accumulates surviving tokens and drops duplicate sentence identifiers.
#[derive(Debug, Default)]
pub struct SentenceCollector {
    sentences: Vec<String>,
    seen_ids: HashSet<String>,
    current: Vec<String>,
    current_id: Option<String>,
}

impl SentenceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the backend identifier of the sentence being built.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.current_id = Some(id.into());
    }

    pub fn push(&mut self, text: String) {
        self.current.push(text);
    }

    /// Close the current sentence; empty or already seen sentences are dropped.
    pub fn finish_sentence(&mut self) {
        let tokens = std::mem::take(&mut self.current);
        let id = self.current_id.take();
        if tokens.is_empty() {
            return;
        }
        if let Some(id) = id {
            if !self.seen_ids.insert(id) {
                return;
            }
        }
        self.sentences.push(tokens.join(" "));
    }

    pub fn into_sentences(mut self) -> Vec<String> {
        self.finish_sentence();
        self.sentences
    }
}
