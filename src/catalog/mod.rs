//! Pure catalog logic: slug resolution, category windows and section
//! allocation. Nothing in here performs I/O.

pub mod allocator;
pub mod category;
pub mod heuristics;
pub mod paginator;
pub mod slug;

pub use allocator::{AllocatedSection, Allocation, SectionSpec, UsedIdSet, allocate_unique};
pub use category::{CatalogEntry, CategoryDef, CategoryRule};
pub use heuristics::{KeywordHeuristic, TitleHeuristic};
pub use paginator::{CategoryWindow, Page, PageCursor};
pub use slug::{
    Classification, ContentId, ContentKind, MovieId, SeriesId, Slug, build_slug, classify,
    has_truncated_movie_marker, normalize_title,
};

/// Anything that can stand in an ordered catalog list.
pub trait CatalogItem {
    fn content_id(&self) -> &ContentId;
}

impl CatalogItem for ContentId {
    fn content_id(&self) -> &ContentId {
        self
    }
}

impl<T: CatalogItem + ?Sized> CatalogItem for &T {
    fn content_id(&self) -> &ContentId {
        (**self).content_id()
    }
}
