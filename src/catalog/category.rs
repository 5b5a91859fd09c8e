use serde::{Deserialize, Serialize};

use super::paginator::{CategoryWindow, Page};
use super::{CatalogItem, ContentId, ContentKind};

/// Lightweight projection of a stored content document, enough to order and
/// bucket the catalog without loading full metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub content_id: ContentId,
    pub kind: ContentKind,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub popularity: f64,
}

impl CatalogItem for CatalogEntry {
    fn content_id(&self) -> &ContentId {
        &self.content_id
    }
}

/// Which entries belong to a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum CategoryRule {
    All,
    Genre(String),
    /// First year of the decade, e.g. `1990`.
    Decade(i32),
    Country(String),
    Kind(ContentKind),
    MinRating(f32),
}

impl CategoryRule {
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        match self {
            Self::All => true,
            Self::Genre(genre) => entry.genres.iter().any(|g| g.eq_ignore_ascii_case(genre)),
            Self::Decade(start) => entry
                .year
                .is_some_and(|year| (*start..*start + 10).contains(&year)),
            Self::Country(code) => entry.countries.iter().any(|c| c.eq_ignore_ascii_case(code)),
            Self::Kind(kind) => entry.kind == *kind,
            Self::MinRating(min) => entry.rating.is_some_and(|rating| rating >= *min),
        }
    }
}

/// A named category as configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDef {
    pub name: String,
    pub rule: CategoryRule,
    /// Offset of the category's first item within its region.
    #[serde(default)]
    pub base: usize,
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl CategoryDef {
    pub fn window(&self, default_page_size: usize) -> CategoryWindow {
        CategoryWindow::new(
            self.name.clone(),
            self.base,
            self.page_size.unwrap_or(default_page_size),
        )
    }

    /// The category's region: entries matching the rule, in source order.
    pub fn region<'a>(&self, source: &'a [CatalogEntry]) -> Vec<&'a CatalogEntry> {
        source.iter().filter(|entry| self.rule.matches(entry)).collect()
    }

    pub fn page(&self, source: &[CatalogEntry], page: u32, default_page_size: usize) -> Page {
        self.window(default_page_size).page(&self.region(source), page)
    }
}
