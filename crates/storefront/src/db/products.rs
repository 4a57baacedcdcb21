//! Product repository.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use template_shop_core::{NewProduct, Product, ProductId, ProductPatch};

use super::{CategoryRepository, RepositoryError};
use crate::backend::{BackendClient, Caller, Direction, Query};

const TABLE: &str = "products";
const SELECT: &str = "*,categories(name,slug)";

/// Default page size for product listings.
pub const DEFAULT_PER_PAGE: u32 = 12;
/// Largest page size a listing may request.
pub const MAX_PER_PAGE: u32 = 48;

/// Listing order for products.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Popular,
}

impl ProductSort {
    fn apply(self, query: Query) -> Query {
        match self {
            Self::Newest => query.order("created_at", Direction::Desc),
            Self::PriceAsc => query.order("price", Direction::Asc),
            Self::PriceDesc => query.order("price", Direction::Desc),
            Self::Popular => query
                .order("download_count", Direction::Desc)
                .order("created_at", Direction::Desc),
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Popular => "popular",
        }
    }
}

/// Filters for a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    /// Category slug.
    pub category: Option<String>,
    /// Case-insensitive title search.
    pub q: Option<String>,
    pub featured: Option<bool>,
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Include inactive products (back-office only).
    #[serde(skip)]
    pub include_inactive: bool,
}

impl ProductFilter {
    /// Page number, starting at 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Search term with surrounding whitespace removed, if any is left.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// Whether results of this listing may be served from the catalog cache.
    ///
    /// Searches and back-office listings always go to the backend.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        !self.include_inactive && self.search_term().is_none()
    }

    /// Normalized key identifying this listing in the catalog cache.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "category={}&featured={}&sort={}&page={}&per_page={}",
            self.category.as_deref().unwrap_or(""),
            self.featured.map_or("", |f| if f { "true" } else { "false" }),
            self.sort.as_str(),
            self.page(),
            self.per_page()
        )
    }
}

/// One page of a product listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl ProductPage {
    fn empty(filter: &ProductFilter) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: filter.page(),
            per_page: filter.per_page(),
        }
    }
}

/// Repository for `products`.
pub struct ProductRepository<'a> {
    client: &'a BackendClient,
    caller: Caller<'a>,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(client: &'a BackendClient, caller: Caller<'a>) -> Self {
        Self { client, caller }
    }

    /// List products matching `filter`, with the total match count.
    ///
    /// An unknown category slug yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if a query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ProductFilter) -> Result<ProductPage, RepositoryError> {
        let mut base = Query::new();

        if !filter.include_inactive {
            base = base.eq("is_active", true);
        }
        if let Some(slug) = filter.category.as_deref().filter(|s| !s.is_empty()) {
            let categories = CategoryRepository::new(self.client, self.caller);
            match categories.get_by_slug(slug).await? {
                Some(category) => base = base.eq("category_id", category.id),
                None => return Ok(ProductPage::empty(filter)),
            }
        }
        if let Some(featured) = filter.featured {
            base = base.eq("is_featured", featured);
        }
        if let Some(term) = filter.search_term() {
            base = base.search("title", term);
        }

        let total = self.client.count(self.caller, TABLE, &base).await?;
        let query = filter
            .sort
            .apply(base.select(SELECT))
            .page(filter.page(), filter.per_page());
        let items = self.client.select(self.caller, TABLE, &query).await?;

        Ok(ProductPage {
            items,
            total,
            page: filter.page(),
            per_page: filter.per_page(),
        })
    }

    /// Get an active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_active_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let query = Query::new()
            .select(SELECT)
            .eq("slug", slug)
            .eq("is_active", true);
        Ok(self.client.select_one(self.caller, TABLE, &query).await?)
    }

    /// Get a product by id, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let query = Query::new().select(SELECT).eq("id", id);
        Ok(self.client.select_one(self.caller, TABLE, &query).await?)
    }

    /// Get several products by id. Unknown ids are silently absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self), fields(count = ids.len()))]
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new()
            .select(SELECT)
            .is_in("id", ids.iter())
            .order("created_at", Direction::Desc);
        Ok(self.client.select(self.caller, TABLE, &query).await?)
    }

    /// Number of products, optionally only active ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn count(&self, active_only: bool) -> Result<u64, RepositoryError> {
        let query = if active_only {
            Query::new().eq("is_active", true)
        } else {
            Query::new()
        };
        Ok(self.client.count(self.caller, TABLE, &query).await?)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, product), fields(slug = %product.slug))]
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        Ok(self.client.insert_one(self.caller, TABLE, product).await?)
    }

    /// Update a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this id.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: ProductId, patch: &ProductPatch) -> Result<Product, RepositoryError> {
        let query = Query::new().eq("id", id);
        let rows: Vec<Product> = self.client.update(self.caller, TABLE, &query, patch).await?;
        rows.into_iter().next().ok_or(RepositoryError::NotFound)
    }

    /// Delete a product row. Stored files are removed by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let query = Query::new().eq("id", id);
        Ok(self.client.delete(self.caller, TABLE, &query).await?)
    }

    /// Bump the download counter.
    ///
    /// This is a read-modify-write; concurrent downloads may lose an
    /// increment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the update fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn increment_download_count(&self, product: &Product) -> Result<(), RepositoryError> {
        let query = Query::new().eq("id", product.id);
        let patch = ProductPatch {
            download_count: Some(product.download_count.saturating_add(1)),
            ..ProductPatch::default()
        };
        let _: Vec<Product> = self.client.update(self.caller, TABLE, &query, &patch).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_defaults_and_clamps() {
        let filter = ProductFilter::default();
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.per_page(), DEFAULT_PER_PAGE);

        let filter = ProductFilter {
            page: Some(0),
            per_page: Some(500),
            ..ProductFilter::default()
        };
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.per_page(), MAX_PER_PAGE);
    }

    #[test]
    fn test_sort_orders() {
        assert_eq!(
            ProductSort::PriceAsc.apply(Query::new()).to_query_string(),
            "order=price.asc"
        );
        assert_eq!(
            ProductSort::Popular.apply(Query::new()).to_query_string(),
            "order=download_count.desc,created_at.desc"
        );
    }

    #[test]
    fn test_sort_parses_snake_case() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap_or_default();
        assert_eq!(sort, ProductSort::PriceDesc);
    }

    #[test]
    fn test_search_is_not_cacheable() {
        let filter = ProductFilter {
            q: Some("  resume ".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.search_term(), Some("resume"));
        assert!(!filter.is_cacheable());

        let blank = ProductFilter {
            q: Some("   ".to_string()),
            ..ProductFilter::default()
        };
        assert!(blank.is_cacheable());
    }

    #[test]
    fn test_cache_key_normalizes_paging() {
        let a = ProductFilter::default();
        let b = ProductFilter {
            page: Some(1),
            per_page: Some(DEFAULT_PER_PAGE),
            ..ProductFilter::default()
        };
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(
            a.cache_key(),
            ProductFilter {
                featured: Some(true),
                ..ProductFilter::default()
            }
            .cache_key()
        );
    }
}
