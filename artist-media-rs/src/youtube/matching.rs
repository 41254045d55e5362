//! Heuristics for deciding whether a video title is about a given artist.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Words that carry no identity when comparing artist names to titles
pub const STOP_WORDS: [&str; 6] = ["&", "and", "the", "of", "vs", "b2b"];

/// Minimum share of artist tokens a title must contain
pub const MIN_MATCH_RATIO: f64 = 0.5;

fn parentheses_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\([^)]*\)").expect("valid regex"))
}

/// Decode the handful of HTML entities the search API leaves in titles
pub fn decode_html(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// Remove parenthesised qualifiers, e.g. "Artist (NL)" -> "Artist"
pub fn strip_parentheses(s: &str) -> String {
    parentheses_regex().replace_all(s, "").trim().to_string()
}

pub fn tokenize(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Fraction of the artist's name tokens that appear in the title.
///
/// Returns 0.0 when the artist name has no meaningful tokens.
pub fn match_ratio(artist_name: &str, title: &str) -> f64 {
    let artist_tokens = tokenize(&strip_parentheses(&decode_html(artist_name)));
    if artist_tokens.is_empty() {
        return 0.0;
    }

    let title_tokens: HashSet<String> = tokenize(&decode_html(title)).into_iter().collect();
    let matched = artist_tokens
        .iter()
        .filter(|t| title_tokens.contains(*t))
        .count();

    matched as f64 / artist_tokens.len() as f64
}

pub fn is_relevant(artist_name: &str, title: &str) -> bool {
    match_ratio(artist_name, title) >= MIN_MATCH_RATIO
}

/// Search query used to find recorded sets for an artist
pub fn live_set_query(artist_name: &str) -> String {
    format!("{} live set", strip_parentheses(artist_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_parentheses() {
        assert_eq!(strip_parentheses("Charlotte de Witte (BE)"), "Charlotte de Witte");
        assert_eq!(strip_parentheses("A (x) B (y)"), "A B");
        assert_eq!(strip_parentheses("No parens"), "No parens");
    }

    #[test]
    fn test_decode_html() {
        assert_eq!(decode_html("Tom &amp; Jerry&#39;s &quot;set&quot;"), "Tom & Jerry's \"set\"");
    }

    #[test]
    fn test_tokenize_drops_stop_words() {
        assert_eq!(
            tokenize("The Chemical Brothers b2b Artist & Friends"),
            vec!["chemical", "brothers", "artist", "friends"]
        );
    }

    #[test]
    fn test_match_ratio() {
        assert_eq!(match_ratio("Charlotte de Witte", "Charlotte de Witte @ Tomorrowland"), 1.0);
        // "de" and "witte" missing -> 1/3
        let ratio = match_ratio("Charlotte de Witte", "Charlotte live");
        assert!((ratio - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(match_ratio("The & Of", "anything"), 0.0);
    }

    #[test]
    fn test_match_ratio_decodes_entities_and_ignores_country() {
        assert!(is_relevant("Mike &amp; Dave (SE)", "MIKE & DAVE full set"));
        assert!(!is_relevant("Mike Dave Someone", "Mike at home"));
    }

    #[test]
    fn test_live_set_query() {
        assert_eq!(live_set_query("Artist (NL)"), "Artist live set");
    }
}
