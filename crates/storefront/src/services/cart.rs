//! Session cart operations.

use rust_decimal::Decimal;
use serde::Serialize;
use tower_sessions::Session;

use template_shop_core::{Price, Product};

use crate::backend::{BackendClient, Caller};
use crate::db::{ProductRepository, RepositoryError};
use crate::models::Cart;
use crate::models::session::keys;

/// Load the cart from the session. A missing cart is an empty one.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

/// Store the cart in the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CART, cart).await
}

/// The cart with its products and total.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<Product>,
    pub count: usize,
    pub total: Decimal,
}

impl CartView {
    /// Build the view from the products found for a cart.
    ///
    /// Products that are gone or no longer active are dropped from `cart`;
    /// returns whether that happened so the caller can save the cart.
    pub fn reconcile(cart: &mut Cart, products: Vec<Product>) -> (Self, bool) {
        let items: Vec<Product> = products
            .into_iter()
            .filter(|p| p.is_active && cart.contains(p.id))
            .collect();

        let before = cart.len();
        cart.retain(|id| items.iter().any(|p| p.id == *id));
        let pruned = cart.len() != before;

        let total = Price::sum(items.iter().map(|p| &p.price));
        let view = Self {
            count: items.len(),
            items,
            total,
        };
        (view, pruned)
    }
}

/// Load the products in `cart`, dropping any that can no longer be bought.
///
/// # Errors
///
/// Returns `RepositoryError::Backend` if the product lookup fails.
pub async fn view(
    client: &BackendClient,
    caller: Caller<'_>,
    cart: &mut Cart,
) -> Result<(CartView, bool), RepositoryError> {
    let products = ProductRepository::new(client, caller)
        .get_many(&cart.product_ids())
        .await?;
    Ok(CartView::reconcile(cart, products))
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use template_shop_core::ProductId;

    use super::*;

    pub(crate) fn product(cents: i64, active: bool) -> Product {
        let id = ProductId::random();
        Product {
            id,
            category_id: None,
            title: format!("Template {id}"),
            slug: format!("template-{id}"),
            description: String::new(),
            price: Price::from_cents(cents).unwrap_or(Price::FREE),
            image_url: None,
            file_path: Some(format!("products/{id}/template.zip")),
            preview_url: None,
            tags: Vec::new(),
            is_active: active,
            is_featured: false,
            download_count: 0,
            created_at: Utc::now(),
            updated_at: None,
            category: None,
        }
    }

    #[test]
    fn test_reconcile_totals_active_products() {
        let a = product(1999, true);
        let b = product(500, true);
        let mut cart = Cart::default();
        cart.add(a.id);
        cart.add(b.id);

        let (view, pruned) = CartView::reconcile(&mut cart, vec![a, b]);
        assert!(!pruned);
        assert_eq!(view.count, 2);
        assert_eq!(view.total, Decimal::new(2499, 2));
    }

    #[test]
    fn test_reconcile_prunes_inactive_and_missing() {
        let active = product(1000, true);
        let inactive = product(1000, false);
        let missing = ProductId::random();
        let mut cart = Cart::default();
        cart.add(active.id);
        cart.add(inactive.id);
        cart.add(missing);

        let (view, pruned) = CartView::reconcile(&mut cart, vec![active.clone(), inactive]);
        assert!(pruned);
        assert_eq!(view.count, 1);
        assert_eq!(cart.product_ids(), vec![active.id]);
        assert_eq!(view.total, Decimal::new(1000, 2));
    }

    #[test]
    fn test_reconcile_empty_cart() {
        let mut cart = Cart::default();
        let (view, pruned) = CartView::reconcile(&mut cart, Vec::new());
        assert!(!pruned);
        assert_eq!(view.count, 0);
        assert_eq!(view.total, Decimal::ZERO);
    }
}
