//! Validation of the submitted query form.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    corpus::{CorpusSelector, SearchFlags},
    dataset::{JobRequest, KeywordGroup},
};

/// Outcome of reading the form: a request, or the reasons there is none.
#[derive(Debug, Default)]
pub struct ParsedForm {
    pub request: Option<JobRequest>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub rerun: bool,
}

/// Read `keywords1..N`, the option checkboxes and the corpus selector.
///
/// Keyword fields are read in order until the first missing index; blank
/// fields are skipped. A word may belong to one group only.
pub fn parse(fields: &[(String, String)], default_corpus: &CorpusSelector) -> ParsedForm {
    let form: HashMap<&str, &str> = fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let checked = |name: &str| form.get(name).is_some_and(|v| !v.is_empty());

    let mut parsed = ParsedForm {
        rerun: checked("rerun"),
        ..ParsedForm::default()
    };

    let mut groups = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for index in 1.. {
        let Some(value) = form.get(format!("keywords{index}").as_str()) else {
            break;
        };
        let words: BTreeSet<&str> = value.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        if let Some(dup) = words.iter().find(|w| seen.contains(**w)) {
            parsed.errors.push(format!(
                "Word {dup} is in two different groups, keyword lists must have unique words."
            ));
            return parsed;
        }
        seen.extend(words.iter().map(|w| w.to_string()));
        groups.push(KeywordGroup::new(words));
    }

    if groups.is_empty() {
        parsed.errors.push("Error: No keywords defined.".into());
        return parsed;
    }

    let mut random = false;
    if groups.len() == 1 {
        if checked("random") {
            random = true;
        } else {
            parsed.errors.push(
                "Error: You must define either at least two groups of keywords, or click 'run against random text sample' option.".into(),
            );
            return parsed;
        }
    } else if checked("random") {
        parsed
            .warnings
            .push("Warning: Random text sample -option ignored.".into());
    }

    let corpus = match form.get("corpus").map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => default_corpus.clone(),
        Some(value) => match CorpusSelector::parse(value) {
            Some(selector) => selector,
            None => {
                parsed.errors.push(format!("Error: Unknown corpus {value}."));
                return parsed;
            }
        },
    };

    parsed.request = Some(JobRequest {
        groups,
        random,
        flags: SearchFlags {
            case_sensitive: checked("case"),
            lemma: checked("lemma"),
            adjective_only: checked("adjective"),
        },
        corpus,
    });
    parsed
}
