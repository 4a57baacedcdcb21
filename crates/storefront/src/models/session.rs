//! Session-related types.
//!
//! Types stored in the session for authentication and cart state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use template_shop_core::{Email, ProductId, UserId};

use crate::backend::{AuthSession, Caller};

/// Refresh this long before the access token actually expires.
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Session-stored user identity and backend tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Auth user id (also the `user_profiles` key).
    pub id: UserId,
    pub email: Email,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CurrentUser {
    /// Build the session user from a fresh auth session.
    ///
    /// Returns `None` when the auth service reported no usable email.
    #[must_use]
    pub fn from_auth_session(session: &AuthSession, now: DateTime<Utc>) -> Option<Self> {
        let email = Email::parse(session.user.email.as_deref()?).ok()?;
        Some(Self {
            id: session.user.id,
            email,
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expiry(now),
        })
    }

    /// Whether the access token has expired or is about to.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(EXPIRY_LEEWAY_SECS) >= self.expires_at
    }

    /// Backend identity for requests made on this user's behalf.
    #[must_use]
    pub fn caller(&self) -> Caller<'_> {
        Caller::User(&self.access_token)
    }
}

/// Products in the visitor's cart.
///
/// Templates are digital goods, so a cart is a set: each product appears at
/// most once and adding it again changes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: BTreeSet<ProductId>,
}

impl Cart {
    /// Add a product. Returns `false` if it was already in the cart.
    pub fn add(&mut self, product_id: ProductId) -> bool {
        self.items.insert(product_id)
    }

    /// Remove a product. Returns `false` if it was not in the cart.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        self.items.remove(&product_id)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Keep only the products for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&ProductId) -> bool) {
        self.items.retain(|id| keep(id));
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.items.contains(&product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Product ids in a stable order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().copied().collect()
    }
}

/// Session keys for authentication and cart data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for storing the cart.
    pub const CART: &str = "cart";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::AuthUser;

    fn auth_session(email: Option<&str>) -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: 3600,
            expires_at: None,
            user: AuthUser {
                id: UserId::random(),
                email: email.map(String::from),
                email_confirmed_at: None,
            },
        }
    }

    #[test]
    fn test_cart_add_is_idempotent() {
        let mut cart = Cart::default();
        let id = ProductId::random();
        assert!(cart.add(id));
        assert!(!cart.add(id));
        assert_eq!(cart.len(), 1);
        assert!(cart.contains(id));
    }

    #[test]
    fn test_cart_remove_and_clear() {
        let mut cart = Cart::default();
        let a = ProductId::random();
        let b = ProductId::random();
        cart.add(a);
        cart.add(b);
        assert!(cart.remove(a));
        assert!(!cart.remove(a));
        assert_eq!(cart.product_ids(), vec![b]);
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_current_user_from_auth_session() {
        let now = Utc::now();
        let user = CurrentUser::from_auth_session(&auth_session(Some("Buyer@Example.com")), now)
            .unwrap();
        assert_eq!(user.email.as_str(), "buyer@example.com");
        assert_eq!(user.expires_at, now + chrono::Duration::seconds(3600));
        assert!(!user.is_expired(now));
        assert!(user.is_expired(now + chrono::Duration::seconds(3590)));
    }

    #[test]
    fn test_current_user_requires_email() {
        assert!(CurrentUser::from_auth_session(&auth_session(None), Utc::now()).is_none());
    }

    #[test]
    fn test_current_user_debug_redacts_tokens() {
        let user =
            CurrentUser::from_auth_session(&auth_session(Some("a@b.co")), Utc::now()).unwrap();
        let debug = format!("{user:?}");
        assert!(!debug.contains("access\""));
        assert!(debug.contains("[REDACTED]"));
    }
}
