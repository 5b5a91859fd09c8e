//! Free-text guesses used only to fill gaps in provider metadata.
//!
//! These are keyword heuristics. They sit behind [`TitleHeuristic`] so a
//! better classifier can replace them without touching the callers.

use std::sync::LazyLock;

use regex::Regex;

/// Season or episode marker such as `s01e05`, matched on a lowercased title.
static EPISODE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bs[0-9]{2}(?:\s*e[0-9]{2,3})?\b").expect("episode marker pattern"));

pub trait TitleHeuristic: Send + Sync {
    /// Whether the title reads like a TV series rather than a movie.
    fn looks_like_series(&self, title: &str) -> bool;

    /// Genre names suggested by the title and overview.
    fn guess_genres(&self, text: &str) -> Vec<String>;
}

#[derive(Debug, Clone)]
pub struct KeywordHeuristic {
    series_keywords: Vec<String>,
    genre_keywords: Vec<(String, Vec<String>)>,
}

impl KeywordHeuristic {
    pub fn new(series_keywords: Vec<String>, genre_keywords: Vec<(String, Vec<String>)>) -> Self {
        Self {
            series_keywords: series_keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            genre_keywords: genre_keywords
                .into_iter()
                .map(|(genre, words)| (genre, words.into_iter().map(|w| w.to_lowercase()).collect()))
                .collect(),
        }
    }
}

impl Default for KeywordHeuristic {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect::<Vec<_>>();

        Self::new(
            owned(&["season", "episode", "series", "miniseries", "complete series"]),
            vec![
                ("Horror".into(), owned(&["horror", "haunted", "zombie", "demon", "slasher"])),
                ("Comedy".into(), owned(&["comedy", "funny", "hilarious", "sitcom"])),
                ("Action".into(), owned(&["action", "explosive", "heist", "mercenary"])),
                ("Romance".into(), owned(&["romance", "love story", "romantic"])),
                ("Science Fiction".into(), owned(&["sci-fi", "space", "alien", "robot"])),
                ("Documentary".into(), owned(&["documentary", "true story of"])),
                ("Animation".into(), owned(&["animated", "animation", "anime"])),
                ("Crime".into(), owned(&["crime", "detective", "murder", "mafia"])),
            ],
        )
    }
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

impl TitleHeuristic for KeywordHeuristic {
    fn looks_like_series(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        EPISODE_MARKER.is_match(&title)
            || self
                .series_keywords
                .iter()
                .any(|keyword| contains_word(&title, keyword))
    }

    fn guess_genres(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        self.genre_keywords
            .iter()
            .filter(|(_, words)| words.iter().any(|word| contains_word(&text, word)))
            .map(|(genre, _)| genre.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_series_keywords() {
        let heuristic = KeywordHeuristic::default();
        assert!(heuristic.looks_like_series("The Office Season 3"));
        assert!(heuristic.looks_like_series("Chernobyl (Miniseries)"));
        assert!(!heuristic.looks_like_series("The Godfather"));
    }

    #[test]
    fn detects_episode_markers() {
        let heuristic = KeywordHeuristic::default();
        assert!(heuristic.looks_like_series("The Office S01E01"));
        assert!(heuristic.looks_like_series("The Office s02 e10"));
        assert!(heuristic.looks_like_series("Dark S01"));
        assert!(!heuristic.looks_like_series("Class of S1999"));
        assert!(!heuristic.looks_like_series("Apollo 13"));
    }

    #[test]
    fn keywords_match_whole_words_only() {
        let heuristic = KeywordHeuristic::default();
        // "seasoned" must not count as "season".
        assert!(!heuristic.looks_like_series("A Seasoned Chef"));
    }

    #[test]
    fn guesses_genres_in_definition_order() {
        let heuristic = KeywordHeuristic::default();
        let genres = heuristic.guess_genres("A detective hunts a zombie in space");
        assert_eq!(genres, ["Horror", "Science Fiction", "Crime"]);
    }

    #[test]
    fn custom_keywords_replace_defaults() {
        let heuristic = KeywordHeuristic::new(vec!["Staffel".into()], vec![]);
        assert!(heuristic.looks_like_series("Dark Staffel 1"));
        assert!(!heuristic.looks_like_series("Dark Season 1"));
        assert!(heuristic.guess_genres("horror").is_empty());
    }
}
