//! Slug resolution for catalog URLs.
//!
//! A slug is a lowercase, hyphen-joined title followed by the canonical id of
//! the content it names. The suffix alone decides the content type:
//!
//! - `the-godfather-tt0068646` names a movie (`tt` + 7 or 8 digits)
//! - `breaking-bad-1396` names a series (digits only)
//! - `tt0068646` is a legacy bare movie id that should be redirected
//!
//! Anything else is rejected, never guessed.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::global::model::ParseEnumError;

static MOVIE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(tt[0-9]{7,8})$").expect("movie suffix pattern"));

static SERIES_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-([0-9]+)$").expect("series suffix pattern"));

static LEGACY_MOVIE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tt[0-9]{7,8}$").expect("legacy movie pattern"));

static TRUNCATED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|-)tt-[0-9]+$").expect("truncated marker pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Series,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" => Ok(Self::Movie),
            "series" | "tv" => Ok(Self::Series),
            _ => Err(ParseEnumError {
                enum_name: "ContentKind",
                value: s.into(),
                expected: &["movie", "series", "tv"],
            }),
        }
    }
}

/// External movie id: `tt` followed by 7 or 8 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MovieId(String);

impl MovieId {
    pub fn parse(value: &str) -> Option<Self> {
        LEGACY_MOVIE
            .is_match(value)
            .then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MovieId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(value)
    }
}

impl From<MovieId> for String {
    fn from(id: MovieId) -> Self {
        id.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Series id: a strictly positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct SeriesId(u64);

impl SeriesId {
    pub fn new(value: u64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for SeriesId {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "series id must be positive".to_string())
    }
}

impl From<SeriesId> for u64 {
    fn from(id: SeriesId) -> Self {
        id.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical identifier of a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentId {
    Movie(MovieId),
    Series(SeriesId),
}

impl ContentId {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Movie(_) => ContentKind::Movie,
            Self::Series(_) => ContentKind::Series,
        }
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie(id) => id.fmt(f),
            Self::Series(id) => id.fmt(f),
        }
    }
}

impl FromStr for ContentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = MovieId::parse(s) {
            return Ok(Self::Movie(id));
        }
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(id) = s.parse::<u64>().ok().and_then(SeriesId::new) {
                return Ok(Self::Series(id));
            }
        }
        Err(format!("'{s}' is neither a movie id (tt1234567) nor a positive series id"))
    }
}

impl Serialize for ContentId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Movie { id: MovieId, legacy: bool },
    Series { id: SeriesId },
    Invalid,
}

impl Classification {
    pub fn content_id(&self) -> Option<ContentId> {
        match self {
            Self::Movie { id, .. } => Some(ContentId::Movie(id.clone())),
            Self::Series { id } => Some(ContentId::Series(*id)),
            Self::Invalid => None,
        }
    }

    /// Whether the caller should redirect to the canonical slugged form.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Movie { legacy: true, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classify a URL-decoded path segment.
///
/// The movie suffix is tested first; the series suffix only applies when the
/// movie suffix does not. A bare `tt` id is accepted as a legacy movie URL.
pub fn classify(slug: &str) -> Classification {
    if let Some(id) = MOVIE_SUFFIX
        .captures(slug)
        .and_then(|caps| caps.get(1))
        .and_then(|m| MovieId::parse(m.as_str()))
    {
        return Classification::Movie { id, legacy: false };
    }

    if let Some(digits) = SERIES_SUFFIX.captures(slug).and_then(|caps| caps.get(1)) {
        return match digits.as_str().parse::<u64>().ok().and_then(SeriesId::new) {
            Some(id) => Classification::Series { id },
            None => Classification::Invalid,
        };
    }

    if let Some(id) = MovieId::parse(slug) {
        return Classification::Movie { id, legacy: true };
    }

    Classification::Invalid
}

/// Lowercase `title`, replace every run of characters outside `[a-z0-9]`
/// with a single hyphen and trim hyphens from both ends.
pub fn normalize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    out
}

pub fn build_slug(title: &str, id: &ContentId) -> Slug {
    Slug(format!("{}-{}", normalize_title(title), id))
}

/// True when a slug resolves to a series but its title segment ends in a bare
/// `tt` marker (`foo-tt-1234567`), which usually means a mangled movie URL.
/// Classification is left untouched; callers decide whether to log it.
pub fn has_truncated_movie_marker(slug: &str) -> bool {
    matches!(classify(slug), Classification::Series { .. }) && TRUNCATED_MARKER.is_match(slug)
}
