use chrono::Utc;
use tracing::debug;

use super::model::{ContentDocument, ContentMetadata, TmdbMovieDetails, TmdbTvDetails};
use crate::catalog::{ContentId, MovieId, SeriesId, TitleHeuristic, build_slug};

/// Year from a `YYYY-MM-DD` date; TMDB sends empty strings for unknown dates.
pub fn parse_year(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<i32>().ok())
        .filter(|y| *y > 1800)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn movie_to_metadata(id: MovieId, movie: TmdbMovieDetails) -> ContentMetadata {
    ContentMetadata {
        id: ContentId::Movie(id),
        tmdb_id: Some(movie.id),
        year: parse_year(movie.release_date.as_deref()),
        title: movie.title,
        original_title: non_empty(movie.original_title),
        overview: non_empty(movie.overview),
        genres: movie.genres.into_iter().map(|g| g.name).collect(),
        countries: movie
            .production_countries
            .into_iter()
            .map(|c| c.iso_3166_1)
            .collect(),
        rating: movie.vote_average,
        vote_count: movie.vote_count,
        popularity: movie.popularity.unwrap_or_default(),
        poster_path: movie.poster_path,
        backdrop_path: movie.backdrop_path,
        runtime_minutes: movie.runtime.filter(|r| *r > 0),
        seasons: None,
        episodes: None,
        imdb_id: movie.imdb_id,
    }
}

pub fn series_to_metadata(id: SeriesId, tv: TmdbTvDetails) -> ContentMetadata {
    ContentMetadata {
        id: ContentId::Series(id),
        tmdb_id: Some(tv.id),
        year: parse_year(tv.first_air_date.as_deref()),
        title: tv.name,
        original_title: non_empty(tv.original_name),
        overview: non_empty(tv.overview),
        genres: tv.genres.into_iter().map(|g| g.name).collect(),
        countries: tv.origin_country,
        rating: tv.vote_average,
        vote_count: tv.vote_count,
        popularity: tv.popularity.unwrap_or_default(),
        poster_path: tv.poster_path,
        backdrop_path: tv.backdrop_path,
        runtime_minutes: None,
        seasons: tv.number_of_seasons,
        episodes: tv.number_of_episodes,
        imdb_id: tv.external_ids.and_then(|ids| non_empty(ids.imdb_id)),
    }
}

/// Build the stored document. Genres are guessed from title and overview
/// only when the provider sent none.
pub fn metadata_to_document(meta: ContentMetadata, heuristic: &dyn TitleHeuristic) -> ContentDocument {
    let slug = build_slug(&meta.title, &meta.id).into_string();

    let (genres, genres_inferred) = if meta.genres.is_empty() {
        let text = format!("{} {}", meta.title, meta.overview.as_deref().unwrap_or_default());
        let guessed = heuristic.guess_genres(&text);
        debug!(content_id = %meta.id, genres = ?guessed, "Inferred genres from text");
        let inferred = !guessed.is_empty();
        (guessed, inferred)
    } else {
        (meta.genres, false)
    };

    if meta.id.kind() == crate::catalog::ContentKind::Movie && heuristic.looks_like_series(&meta.title) {
        debug!(content_id = %meta.id, title = %meta.title, "Movie title reads like a series");
    }

    let now = Utc::now();
    ContentDocument {
        id: None,
        kind: meta.id.kind(),
        content_id: meta.id,
        slug,
        title: meta.title,
        original_title: meta.original_title,
        overview: meta.overview,
        year: meta.year,
        genres,
        genres_inferred,
        countries: meta.countries,
        rating: meta.rating,
        vote_count: meta.vote_count,
        popularity: meta.popularity,
        poster_path: meta.poster_path,
        backdrop_path: meta.backdrop_path,
        runtime_minutes: meta.runtime_minutes,
        seasons: meta.seasons,
        episodes: meta.episodes,
        tmdb_id: meta.tmdb_id,
        imdb_id: meta.imdb_id,
        fetched_at: now,
        updated_at: now,
    }
}
