use chrono::{DateTime, Utc};
use mongodb::bson;
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogEntry, ContentId, ContentKind};

// ========================================================================
// TMDB wire types
// ========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbFindResponse {
    #[serde(default)]
    pub movie_results: Vec<TmdbFindResult>,
    #[serde(default)]
    pub tv_results: Vec<TmdbFindResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbFindResult {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCountry {
    pub iso_3166_1: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: u64,
    pub imdb_id: Option<String>,
    pub title: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub production_countries: Vec<TmdbCountry>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub runtime: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbExternalIds {
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbTvDetails {
    pub id: u64,
    pub name: String,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub origin_country: Vec<String>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
    #[serde(default)]
    pub external_ids: Option<TmdbExternalIds>,
}

// ========================================================================
// Provider-neutral metadata
// ========================================================================

/// Metadata as returned by a [`MetadataProvider`](super::provider::MetadataProvider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub id: ContentId,
    pub tmdb_id: Option<u64>,
    pub title: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
    pub rating: Option<f32>,
    pub vote_count: Option<u32>,
    pub popularity: f64,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub seasons: Option<u32>,
    pub episodes: Option<u32>,
    /// IMDb id of a series, when the provider knows it.
    pub imdb_id: Option<String>,
}

// ========================================================================
// Stored document
// ========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<bson::oid::ObjectId>,

    pub content_id: ContentId,
    pub kind: ContentKind,
    pub slug: String,
    pub title: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// True when `genres` came from the keyword heuristic rather than the provider.
    #[serde(default)]
    pub genres_inferred: bool,
    #[serde(default)]
    pub countries: Vec<String>,
    pub rating: Option<f32>,
    pub vote_count: Option<u32>,
    #[serde(default)]
    pub popularity: f64,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub seasons: Option<u32>,
    pub episodes: Option<u32>,
    pub tmdb_id: Option<u64>,
    pub imdb_id: Option<String>,

    pub fetched_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ContentDocument> for CatalogEntry {
    fn from(doc: &ContentDocument) -> Self {
        Self {
            content_id: doc.content_id.clone(),
            kind: doc.kind,
            title: doc.title.clone(),
            slug: doc.slug.clone(),
            year: doc.year,
            genres: doc.genres.clone(),
            countries: doc.countries.clone(),
            rating: doc.rating,
            popularity: doc.popularity,
        }
    }
}
