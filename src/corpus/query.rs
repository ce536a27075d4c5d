//! Query formulation for the two corpus search mini-languages.

use thiserror::Error;

/// Characters with a meaning inside a CQP attribute value.
const CQP_SPECIAL: &[char] = &[':', ')', '(', '|'];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// An empty disjunction would match every sentence in the corpus.
    #[error("cannot build a corpus query from an empty word list")]
    EmptyWordList,
}

/// Build a dep_search expression matching any of `words`.
///
/// With `negate` the expression instead matches sentences in which none of the
/// words occur: `_ -> !("a"&"b")`.
pub fn dep_search(words: &[String], negate: bool, lemma: bool) -> Result<String, QueryError> {
    let terms = non_empty(words)?
        .map(|word| {
            if lemma {
                format!("L=\"{word}\"")
            } else {
                format!("\"{word}\"")
            }
        })
        .collect::<Vec<_>>();

    if negate {
        Ok(format!("_ -> !({})", terms.join("&")))
    } else {
        Ok(terms.join("|"))
    }
}

/// Build a CQP expression with one bracketed token constraint per word.
///
/// Case-insensitive matching is requested per value with a `(?i)` prefix and
/// `negate` turns every constraint into its complement.
pub fn cqp(
    words: &[String],
    negate: bool,
    lemma: bool,
    case_sensitive: bool,
) -> Result<String, QueryError> {
    let attribute = if lemma { "lemma" } else { "word" };
    let case_prefix = if case_sensitive { "" } else { "(?i)" };
    let negation = if negate { "!" } else { "" };

    let constraints = non_empty(words)?
        .map(|word| {
            format!(
                "[{negation}({attribute} = \"{case_prefix}{}\")]",
                escape_cqp(word)
            )
        })
        .collect::<Vec<_>>();

    Ok(constraints.join(" | "))
}

/// Backslash-escape the CQP metacharacters of a literal word.
pub fn escape_cqp(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    for ch in word.chars() {
        if CQP_SPECIAL.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn non_empty(words: &[String]) -> Result<impl Iterator<Item = &str>, QueryError> {
    if words.iter().all(|w| w.trim().is_empty()) {
        return Err(QueryError::EmptyWordList);
    }
    Ok(words.iter().map(|w| w.trim()).filter(|w| !w.is_empty()))
}
