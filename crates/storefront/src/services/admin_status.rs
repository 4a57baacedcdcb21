//! Admin-status resolution with a time-limited cache.
//!
//! Whether a user is an administrator is read from the `role` column of
//! their profile. The answer is cached per user for a fixed time (30 minutes
//! by default) so back-office pages do not fetch the profile on every
//! request. The entry is dropped when the user signs out, signs in again,
//! refreshes their token, or has their role changed.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, warn};

use template_shop_core::{UserId, UserRole};

/// Default time an admin-status answer stays valid.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Admin status of the current visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminStatus {
    /// Not determined yet.
    Loading,
    Admin,
    NotAdmin,
    /// The profile could not be fetched.
    Error,
}

impl AdminStatus {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    const fn from_flag(is_admin: bool) -> Self {
        if is_admin { Self::Admin } else { Self::NotAdmin }
    }
}

/// A cached admin-status answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedAdminStatus {
    pub is_admin: bool,
    pub checked_at: DateTime<Utc>,
}

/// Per-user admin-status cache.
#[derive(Clone)]
pub struct AdminStatusCache {
    cache: Cache<UserId, CachedAdminStatus>,
    ttl: Duration,
}

impl Default for AdminStatusCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl AdminStatusCache {
    /// Create a cache whose entries expire `ttl` after they are written.
    ///
    /// `ttl` is capped at [`DEFAULT_TTL`]; a status is never older than that.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let ttl = ttl.min(DEFAULT_TTL);
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
            ttl,
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached entry for `user`, if it has not expired.
    pub async fn get(&self, user: UserId) -> Option<CachedAdminStatus> {
        self.cache.get(&user).await
    }

    /// Status from the cache alone. `Loading` when nothing is known yet.
    pub async fn peek(&self, user: UserId) -> AdminStatus {
        self.get(user)
            .await
            .map_or(AdminStatus::Loading, |entry| AdminStatus::from_flag(entry.is_admin))
    }

    pub async fn insert(&self, user: UserId, is_admin: bool) {
        let entry = CachedAdminStatus {
            is_admin,
            checked_at: Utc::now(),
        };
        self.cache.insert(user, entry).await;
    }

    /// Forget the answer for one user.
    pub async fn invalidate(&self, user: UserId) {
        self.cache.invalidate(&user).await;
        debug!(%user, "Admin status invalidated");
    }

    /// Forget every answer.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Resolve the admin status of `user`.
    ///
    /// - no settled session: `NotAdmin`, without fetching;
    /// - a live cache entry: its answer;
    /// - otherwise `fetch_role` decides. An admin role gives `Admin`; any
    ///   other role or a missing profile gives `NotAdmin`. Both are cached.
    ///   A failed fetch gives `Error` and is not cached, so the next request
    ///   tries again.
    pub async fn resolve<F, Fut, E>(&self, user: Option<UserId>, fetch_role: F) -> AdminStatus
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<UserRole>, E>>,
        E: Display,
    {
        let Some(user) = user else {
            return AdminStatus::NotAdmin;
        };

        if let Some(entry) = self.get(user).await {
            debug!(%user, is_admin = entry.is_admin, "Admin status cache hit");
            return AdminStatus::from_flag(entry.is_admin);
        }

        match fetch_role().await {
            Ok(role) => {
                let is_admin = role.is_some_and(|r| r.is_admin());
                self.insert(user, is_admin).await;
                AdminStatus::from_flag(is_admin)
            }
            Err(e) => {
                warn!(%user, error = %e, "Failed to resolve admin status");
                AdminStatus::Error
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    async fn fetch_ok(
        calls: &AtomicU32,
        role: Option<UserRole>,
    ) -> Result<Option<UserRole>, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(role)
    }

    #[test]
    fn test_ttl_capped_at_thirty_minutes() {
        assert_eq!(AdminStatusCache::new(Duration::from_secs(60)).ttl(), Duration::from_secs(60));
        assert_eq!(AdminStatusCache::new(Duration::from_secs(7200)).ttl(), DEFAULT_TTL);
        assert_eq!(
            AdminStatusCache::new(Duration::from_secs(40_000_000_000)).ttl(),
            DEFAULT_TTL
        );
    }

    #[tokio::test]
    async fn test_no_session_is_not_admin_without_fetch() {
        let cache = AdminStatusCache::default();
        let calls = AtomicU32::new(0);
        let status = cache
            .resolve(None, || fetch_ok(&calls, Some(UserRole::Admin)))
            .await;
        assert_eq!(status, AdminStatus::NotAdmin);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_admin_role_is_cached() {
        let cache = AdminStatusCache::default();
        let user = UserId::random();
        let calls = AtomicU32::new(0);

        assert_eq!(cache.peek(user).await, AdminStatus::Loading);

        let first = cache
            .resolve(Some(user), || fetch_ok(&calls, Some(UserRole::Admin)))
            .await;
        let second = cache
            .resolve(Some(user), || fetch_ok(&calls, Some(UserRole::Customer)))
            .await;

        assert_eq!(first, AdminStatus::Admin);
        assert_eq!(second, AdminStatus::Admin);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek(user).await, AdminStatus::Admin);
        assert!(cache.get(user).await.unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_customer_and_missing_profile_are_not_admin() {
        let cache = AdminStatusCache::default();
        let calls = AtomicU32::new(0);

        let customer = UserId::random();
        let status = cache
            .resolve(Some(customer), || fetch_ok(&calls, Some(UserRole::Customer)))
            .await;
        assert_eq!(status, AdminStatus::NotAdmin);

        let no_profile = UserId::random();
        let status = cache
            .resolve(Some(no_profile), || fetch_ok(&calls, None))
            .await;
        assert_eq!(status, AdminStatus::NotAdmin);
        assert_eq!(cache.peek(no_profile).await, AdminStatus::NotAdmin);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let cache = AdminStatusCache::default();
        let user = UserId::random();
        let calls = Arc::new(AtomicU32::new(0));

        let status = cache
            .resolve(Some(user), || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<Option<UserRole>, _>("permission denied")
                }
            })
            .await;
        assert_eq!(status, AdminStatus::Error);
        assert_eq!(cache.peek(user).await, AdminStatus::Loading);

        let status = cache
            .resolve(Some(user), || fetch_ok(&calls, Some(UserRole::Admin)))
            .await;
        assert_eq!(status, AdminStatus::Admin);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = AdminStatusCache::default();
        let user = UserId::random();
        let other = UserId::random();
        cache.insert(user, true).await;
        cache.insert(other, false).await;

        cache.invalidate(user).await;
        assert_eq!(cache.peek(user).await, AdminStatus::Loading);
        assert_eq!(cache.peek(other).await, AdminStatus::NotAdmin);

        let calls = AtomicU32::new(0);
        let status = cache
            .resolve(Some(user), || fetch_ok(&calls, Some(UserRole::Customer)))
            .await;
        assert_eq!(status, AdminStatus::NotAdmin);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = AdminStatusCache::default();
        let user = UserId::random();
        cache.insert(user, true).await;
        cache.invalidate_all().await;
        assert!(cache.get(user).await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = AdminStatusCache::new(Duration::from_millis(100));
        let user = UserId::random();
        cache.insert(user, true).await;
        assert_eq!(cache.peek(user).await, AdminStatus::Admin);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(cache.peek(user).await, AdminStatus::Loading);
        assert_eq!(cache.ttl(), Duration::from_millis(100));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AdminStatus::NotAdmin).unwrap(),
            "\"not_admin\""
        );
        assert!(AdminStatus::Admin.is_admin());
        assert!(!AdminStatus::Error.is_admin());
    }
}
