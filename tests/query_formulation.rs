use keyword_contrast::corpus::{
    query::{cqp, dep_search, escape_cqp},
    Backend, QueryError, SearchFlags,
};
use proptest::prelude::*;

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

#[test]
fn dep_search_expressions() {
    insta::assert_snapshot!(
        dep_search(&words(&["kissa", "koira"]), false, false).unwrap(),
        @r#""kissa"|"koira""#
    );
    insta::assert_snapshot!(
        dep_search(&words(&["kissa", "koira"]), true, true).unwrap(),
        @r#"_ -> !(L="kissa"&L="koira")"#
    );
}

#[test]
fn cqp_expressions() {
    insta::assert_snapshot!(
        cqp(&words(&["kissa", "a:b"]), false, false, false).unwrap(),
        @r#"[(word = "(?i)kissa")] | [(word = "(?i)a\:b")]"#
    );
    insta::assert_snapshot!(
        cqp(&words(&["kissa"]), true, true, true).unwrap(),
        @r#"[!(lemma = "kissa")]"#
    );
}

#[test]
fn backends_dispatch_to_their_language() {
    let flags = SearchFlags {
        lemma: true,
        ..SearchFlags::default()
    };
    let dep = Backend::DepSearch.formulate(&words(&["talo"]), false, flags).unwrap();
    assert_eq!(dep, "L=\"talo\"");
    let korp = Backend::Korp.formulate(&words(&["talo"]), false, flags).unwrap();
    assert_eq!(korp, "[(lemma = \"(?i)talo\")]");
}

#[test]
fn empty_word_lists_are_refused() {
    assert_eq!(dep_search(&[], false, false), Err(QueryError::EmptyWordList));
    assert_eq!(
        cqp(&words(&["  "]), false, false, false),
        Err(QueryError::EmptyWordList)
    );
}

proptest! {
    #[test]
    fn dep_search_has_one_term_per_word(list in prop::collection::vec("[a-zäö]{1,8}", 1..6)) {
        let query = dep_search(&list, false, false).unwrap();
        prop_assert_eq!(query.split('|').count(), list.len());
        let negated = dep_search(&list, true, false).unwrap();
        prop_assert!(negated.starts_with("_ -> !("));
        prop_assert_eq!(negated.matches('&').count(), list.len() - 1);
    }

    #[test]
    fn cqp_escaping_leaves_no_bare_metacharacter(word in "[a-z:()|]{1,12}") {
        let escaped = escape_cqp(&word);
        let mut chars = escaped.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                let next = chars.next();
                prop_assert!(matches!(next, Some(':' | '(' | ')' | '|')));
            } else {
                prop_assert!(!matches!(ch, ':' | '(' | ')' | '|'));
            }
        }
    }
}
