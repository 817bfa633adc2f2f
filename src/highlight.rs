use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// Build a case-insensitive matcher for the words of the current search
/// query, longest word first so overlapping terms highlight fully.
pub fn build_query_regex(query: &str) -> Option<Regex> {
    let mut unique = Vec::new();
    let mut seen = HashSet::new();
    for token in query.split_whitespace() {
        let lowered = token.to_lowercase();
        if seen.insert(lowered) {
            unique.push(token.to_string());
        }
    }
    if unique.is_empty() {
        return None;
    }
    unique.sort_by(|a, b| b.len().cmp(&a.len()));
    let pattern = unique
        .into_iter()
        .map(|token| regex::escape(&token))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_builds_nothing() {
        assert!(build_query_regex("").is_none());
        assert!(build_query_regex("   ").is_none());
    }

    #[test]
    fn prefers_longer_words_first() {
        let regex = build_query_regex("pie piece").expect("regex");
        let matches: Vec<_> = regex.find_iter("piecemeal").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["piece"]);
    }

    #[test]
    fn deduplicates_case_insensitive_words() {
        let regex = build_query_regex("Stew stew STEW").expect("regex");
        let matches: Vec<_> = regex.find_iter("beef stew").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["stew"]);
    }

    #[test]
    fn escapes_regex_metacharacters() {
        let regex = build_query_regex("mac+cheese").expect("regex");
        assert!(regex.is_match("Mac+Cheese bake"));
        assert!(!regex.is_match("maccheese"));
    }
}
