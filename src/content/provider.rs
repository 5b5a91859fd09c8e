use std::sync::Arc;

use tracing::debug;

use super::cache::MetadataCache;
use super::converter::{movie_to_metadata, series_to_metadata};
use super::model::{ContentMetadata, TmdbFindResponse, TmdbMovieDetails, TmdbTvDetails};
use crate::catalog::{ContentId, MovieId, SeriesId};
use crate::global::config::TmdbConfig;
use crate::global::error::HttpError;
use crate::global::http::{ClientWithLimiter, RequestConfig};

/// Source of content metadata. Injected wherever metadata is needed.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, id: &ContentId) -> Result<ContentMetadata, HttpError>;
}

pub struct TmdbProvider {
    client: ClientWithLimiter,
    api_key: String,
    base_url: String,
    language: String,
}

impl TmdbProvider {
    pub fn new(client: ClientWithLimiter, config: &TmdbConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
        }
    }

    /// v4 read access tokens are JWTs and go in a header; v3 keys go in the query.
    fn uses_bearer_token(&self) -> bool {
        self.api_key.starts_with("eyJ")
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> String {
        let mut query: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        if !self.uses_bearer_token() {
            query.push(format!("api_key={}", urlencoding::encode(&self.api_key)));
        }
        format!("{}{}?{}", self.base_url, path, query.join("&"))
    }

    fn request_config(&self) -> Option<RequestConfig> {
        self.uses_bearer_token()
            .then(|| RequestConfig::new().with_bearer_token(&self.api_key))
    }

    async fn fetch_movie(&self, id: &MovieId) -> Result<ContentMetadata, HttpError> {
        let find_url = self.url(
            &format!("/find/{}", id),
            &[("external_source", "imdb_id")],
        );
        let found: TmdbFindResponse = self.client.fetch_json(&find_url, self.request_config()).await?;

        let tmdb_id = found
            .movie_results
            .first()
            .map(|m| m.id)
            .ok_or_else(|| HttpError::NotFound(format!("no TMDB movie for {}", id)))?;

        debug!(provider = "tmdb", imdb_id = %id, tmdb_id = tmdb_id, "Resolved IMDb id");

        let details_url = self.url(&format!("/movie/{}", tmdb_id), &[("language", self.language.as_str())]);
        let details: TmdbMovieDetails = self.client.fetch_json(&details_url, self.request_config()).await?;

        Ok(movie_to_metadata(id.clone(), details))
    }

    async fn fetch_series(&self, id: SeriesId) -> Result<ContentMetadata, HttpError> {
        let url = self.url(
            &format!("/tv/{}", id),
            &[("language", self.language.as_str()), ("append_to_response", "external_ids")],
        );
        let details: TmdbTvDetails = self.client.fetch_json(&url, self.request_config()).await?;

        Ok(series_to_metadata(id, details))
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn fetch(&self, id: &ContentId) -> Result<ContentMetadata, HttpError> {
        match id {
            ContentId::Movie(movie) => self.fetch_movie(movie).await,
            ContentId::Series(series) => self.fetch_series(*series).await,
        }
    }
}

/// Wraps a provider with a caller-owned [`MetadataCache`].
pub struct CachedProvider<P> {
    inner: P,
    cache: Arc<MetadataCache>,
}

impl<P: MetadataProvider> CachedProvider<P> {
    pub fn new(inner: P, cache: Arc<MetadataCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }
}

#[async_trait::async_trait]
impl<P: MetadataProvider> MetadataProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, id: &ContentId) -> Result<ContentMetadata, HttpError> {
        if let Some(hit) = self.cache.get(id).await {
            debug!(provider = %self.inner.name(), content_id = %id, "Metadata cache hit");
            return Ok(hit);
        }

        let meta = self.inner.fetch(id).await?;
        self.cache.insert(id.clone(), meta.clone()).await;
        Ok(meta)
    }
}
