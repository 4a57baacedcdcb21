//! In-memory cache for public catalog reads.

use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use template_shop_core::{Category, Product};

use crate::db::products::ProductPage;

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CatalogKey {
    Categories,
    /// A product listing, keyed by its normalized query string.
    Products(String),
    Product(String),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CatalogValue {
    Categories(Vec<Category>),
    Products(ProductPage),
    Product(Box<Product>),
}

/// Public catalog cache.
///
/// Entries live for 5 minutes. Admin writes clear the whole cache, so stale
/// listings only survive edits made directly in the backend.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CatalogKey, CatalogValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300), 1000)
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn categories(&self) -> Option<Vec<Category>> {
        match self.cache.get(&CatalogKey::Categories).await {
            Some(CatalogValue::Categories(categories)) => {
                debug!("Cache hit for categories");
                Some(categories)
            }
            _ => None,
        }
    }

    pub async fn insert_categories(&self, categories: Vec<Category>) {
        self.cache
            .insert(CatalogKey::Categories, CatalogValue::Categories(categories))
            .await;
    }

    pub async fn products(&self, key: &str) -> Option<ProductPage> {
        match self.cache.get(&CatalogKey::Products(key.to_string())).await {
            Some(CatalogValue::Products(page)) => {
                debug!(key, "Cache hit for products");
                Some(page)
            }
            _ => None,
        }
    }

    pub async fn insert_products(&self, key: String, page: ProductPage) {
        self.cache
            .insert(CatalogKey::Products(key), CatalogValue::Products(page))
            .await;
    }

    pub async fn product(&self, slug: &str) -> Option<Product> {
        match self.cache.get(&CatalogKey::Product(slug.to_string())).await {
            Some(CatalogValue::Product(product)) => {
                debug!(slug, "Cache hit for product");
                Some(*product)
            }
            _ => None,
        }
    }

    pub async fn insert_product(&self, product: Product) {
        self.cache
            .insert(
                CatalogKey::Product(product.slug.clone()),
                CatalogValue::Product(Box::new(product)),
            )
            .await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("Catalog cache cleared");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use template_shop_core::CategoryId;

    use super::*;

    fn category(slug: &str) -> Category {
        Category {
            id: CategoryId::random(),
            name: slug.to_uppercase(),
            slug: slug.to_string(),
            description: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_categories_round_trip_and_invalidate() {
        let cache = CatalogCache::default();
        assert!(cache.categories().await.is_none());

        cache.insert_categories(vec![category("resumes")]).await;
        let cached = cache.categories().await.unwrap();
        assert_eq!(cached[0].slug, "resumes");

        cache.invalidate_all().await;
        assert!(cache.categories().await.is_none());
    }

    #[tokio::test]
    async fn test_product_pages_keyed_by_query() {
        let cache = CatalogCache::default();
        cache
            .insert_products(
                "page=1".to_string(),
                ProductPage {
                    items: Vec::new(),
                    total: 0,
                    page: 1,
                    per_page: 12,
                },
            )
            .await;

        assert!(cache.products("page=1").await.is_some());
        assert!(cache.products("page=2").await.is_none());
    }
}
