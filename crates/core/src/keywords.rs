//! Stopword-filtered keyword frequency extraction.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Common English words plus news filler that never make useful keywords.
pub const STOPWORDS: [&str; 95] = [
    "the", "and", "to", "of", "a", "in", "for", "is", "on", "that", "with", "as", "are", "was", "at", "by", "an", "be",
    "this", "it", "from", "or", "which", "but", "not", "have", "has", "they", "their", "you", "we", "can", "will",
    "your", "all", "more", "about", "up", "our", "us", "may", "ago", "hours", "just", "also", "said", "news", "time",
    "day", "how", "what", "when", "where", "why", "who", "whom", "while", "because", "been", "if", "into", "over",
    "after", "before", "during", "so", "than", "too", "very", "then", "there", "here", "such", "only", "each", "both",
    "any", "some", "few", "many", "every", "its", "like", "other", "out", "off", "again", "new", "old", "via",
    "according", "report", "reports", "online", "based",
];

/// Default number of keywords kept per page or feed.
pub const DEFAULT_MAX_KEYWORDS: usize = 10;

static KEYWORD_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-z]{3,}\b").expect("valid keyword regex"));
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid word regex"));

/// Returns the `max_keywords` most frequent non-stopword tokens of `text`.
///
/// Tokens are lowercase ASCII words of at least three letters. Ties keep the
/// order in which the words first appear.
///
/// ```rust
/// use storescope_core::keywords::extract_keywords;
///
/// let keywords = extract_keywords("Rings and more rings. Gold rings, gold chains.", 2);
/// assert_eq!(keywords, vec!["rings", "gold"]);
/// ```
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let lowered = text.to_lowercase();

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for token in KEYWORD_TOKEN.find_iter(&lowered).map(|m| m.as_str()) {
        if STOPWORDS.contains(&token) {
            continue;
        }
        let count = counts.entry(token).or_insert(0);
        if *count == 0 {
            order.push(token);
        }
        *count += 1;
    }

    // stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(max_keywords).map(str::to_string).collect()
}

/// Counts `\w+` words in `text`.
pub fn word_count(text: &str) -> usize {
    WORD.find_iter(text).count()
}

/// Counts case-insensitive whole-word occurrences of `term` in `text`.
///
/// `term` is matched literally, so phrases like `"gold ring"` work as expected.
pub fn count_occurrences(text: &str, term: &str) -> usize {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return 0;
    }

    let pattern = format!(r"\b{}\b", regex::escape(&term));
    match Regex::new(&pattern) {
        Ok(re) => re.find_iter(&text.to_lowercase()).count(),
        Err(_) => 0,
    }
}

/// Keywords present both on the page and in the trending list.
///
/// The result follows the page's keyword order and contains no duplicates.
pub fn compare_with_trends(my_keywords: &[String], trends: &[String]) -> Vec<String> {
    let mut overlap: Vec<String> = Vec::new();
    for keyword in my_keywords {
        if trends.contains(keyword) && !overlap.contains(keyword) {
            overlap.push(keyword.clone());
        }
    }
    overlap
}
