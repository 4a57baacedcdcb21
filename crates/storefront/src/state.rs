//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, CatalogCache, RetryPolicy};
use crate::config::StorefrontConfig;
use crate::services::AdminStatusCache;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the backend client, the in-memory caches and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    admin_cache: AdminStatusCache,
    catalog: CatalogCache,
}

impl AppState {
    /// Create a new application state from configuration.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let backend = BackendClient::new(&config.backend, RetryPolicy::from(config.retry));
        let admin_cache = AdminStatusCache::new(config.admin_cache_ttl);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                admin_cache,
                catalog: CatalogCache::default(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the hosted backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the admin-status cache.
    #[must_use]
    pub fn admin_cache(&self) -> &AdminStatusCache {
        &self.inner.admin_cache
    }

    /// Get a reference to the public catalog cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }
}
