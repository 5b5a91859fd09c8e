//! Metadata fetching and storage for catalog titles.

pub mod cache;
pub mod converter;
pub mod database;
pub mod model;
pub mod module;
pub mod provider;
pub mod store;
pub mod task;

pub use cache::{MetadataCache, TtlCache};
pub use model::{ContentDocument, ContentMetadata};
pub use module::{CatalogModule, CatalogTaskFactory};
pub use provider::{CachedProvider, MetadataProvider, TmdbProvider};
pub use store::{ContentStore, InMemoryContentStore, MongoContentStore};
