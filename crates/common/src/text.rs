//! Text normalization shared by indexing, topic extraction and scoring
//!
//! All matching in the system is case-insensitive and works on lower-cased
//! ASCII word tokens produced here.

use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Minimum length of a manuscript word to count as a query term
pub const MIN_QUERY_TERM_LEN: usize = 4;

/// Words carrying no topical signal in academic prose
pub const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her",
    "was", "one", "our", "out", "has", "have", "been", "from", "this", "that",
    "with", "they", "will", "each", "make", "like", "into", "over", "such",
    "than", "them", "then", "these", "some", "would", "other", "about", "which",
    "their", "there", "could", "more", "also", "most", "here", "both", "after",
    "those", "using", "used", "based", "show", "shown", "well", "however",
    "between", "through", "where", "while", "during", "before", "should",
    "results", "paper", "study", "method", "methods", "approach", "propose",
    "proposed", "present", "presented", "demonstrate", "existing", "recent",
    "first", "second", "new", "novel", "different", "important", "significant",
    "provide", "provides", "including", "across", "within", "without",
    "performance", "compared", "model", "models", "data", "analysis",
];

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\b[a-z]+\b").expect("static word pattern"))
}

fn stopword_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Check whether a lower-cased word is a stopword
pub fn is_stopword(word: &str) -> bool {
    stopword_set().contains(word)
}

/// Lower-cased alphabetic words in order of appearance
pub fn words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    word_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Words of at least `min_len` characters that are not stopwords, repeats kept
pub fn content_words(text: &str, min_len: usize) -> Vec<String> {
    words(text)
        .into_iter()
        .filter(|w| w.len() >= min_len && !is_stopword(w))
        .collect()
}

/// Distinct query terms of a manuscript's title and abstract, in first-seen order
pub fn query_terms(title: &str, abstract_text: &str) -> Vec<String> {
    let combined = format!("{} {}", title, abstract_text);
    let mut seen = HashSet::new();
    content_words(&combined, MIN_QUERY_TERM_LEN)
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Set of lower-cased words across several phrases
pub fn word_set<'a, I>(phrases: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    phrases.into_iter().flat_map(|p| words(p)).collect()
}

/// Prefix of at most `max_chars` characters, cut on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
