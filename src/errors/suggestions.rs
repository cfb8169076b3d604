//! "Did you mean?" suggestions using fuzzy string matching
//!
//! Uses Jaro-Winkler similarity to recover from typos in fuzzer names.

use strsim::jaro_winkler;

/// Default similarity threshold for suggestions (0.0 to 1.0)
const DEFAULT_THRESHOLD: f64 = 0.6;

/// Find the most similar string from a list of candidates
///
/// Returns the best match if it exceeds the threshold, or None otherwise.
pub fn find_similar<'a>(input: &str, candidates: &[&'a str], threshold: f64) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (jaro_winkler(input, c), *c))
        .filter(|(score, _)| *score > threshold)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, name)| name)
}

/// Find multiple similar strings sorted by similarity
pub fn find_similar_multiple<'a>(
    input: &str,
    candidates: &[&'a str],
    threshold: f64,
    max_results: usize,
) -> Vec<&'a str> {
    let mut matches: Vec<_> = candidates
        .iter()
        .map(|c| (jaro_winkler(input, c), *c))
        .filter(|(score, _)| *score > threshold)
        .collect();

    matches.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    matches
        .into_iter()
        .take(max_results)
        .map(|(_, name)| name)
        .collect()
}

/// Generate a suggestion for an unknown fuzzer name
pub fn suggest_fuzzer(unknown: &str, known: &[&str]) -> String {
    let close = find_similar_multiple(unknown, known, DEFAULT_THRESHOLD, 3);

    match close.as_slice() {
        [] => "List the built-in fuzzers with: contractfuzz list".to_string(),
        [only] => format!(
            "Did you mean '{}'?\n\nList the built-in fuzzers with: contractfuzz list",
            only
        ),
        several => format!(
            "Did you mean one of: {}?\n\nList the built-in fuzzers with: contractfuzz list",
            several.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_similar_exact_match() {
        let candidates = ["sql-injection", "xss-injection"];
        assert_eq!(
            find_similar("sql-injection", &candidates, DEFAULT_THRESHOLD),
            Some("sql-injection")
        );
    }

    #[test]
    fn find_similar_typo() {
        let candidates = ["boundary-values", "remove-headers"];
        assert_eq!(
            find_similar("boundry-values", &candidates, DEFAULT_THRESHOLD),
            Some("boundary-values")
        );
    }

    #[test]
    fn find_similar_no_match() {
        let candidates = ["happy-path"];
        assert_eq!(find_similar("zzzzzz", &candidates, 0.9), None);
    }

    #[test]
    fn find_similar_multiple_sorted() {
        let candidates = ["leading-spaces", "trailing-spaces", "happy-path"];
        let results = find_similar_multiple("leading-space", &candidates, 0.5, 2);
        assert_eq!(results.first(), Some(&"leading-spaces"));
        assert!(results.len() <= 2);
    }

    #[test]
    fn suggest_fuzzer_without_match_lists_command() {
        let suggestion = suggest_fuzzer("qqqq", &["happy-path"]);
        assert!(suggestion.contains("contractfuzz list"));
        assert!(!suggestion.contains("Did you mean"));
    }
}
