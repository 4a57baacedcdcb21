//! Checkout: turn the session cart into a completed order.
//!
//! Templates are delivered as downloads and no payment provider is wired in,
//! so an order is written as `pending`, filled with its items, and marked
//! `completed` once the items are stored. If storing the items fails the
//! order is marked `failed` instead.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use template_shop_core::{NewOrder, NewOrderItem, Order, OrderStatus, Price, Product, ProductId};

use crate::backend::BackendClient;
use crate::db::{OrderRepository, ProductRepository, RepositoryError};
use crate::models::{Cart, CurrentUser};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing in the cart can be bought.
    #[error("cart is empty")]
    EmptyCart,

    /// Every product in the cart is already owned.
    #[error("you already own every item in your cart")]
    AlreadyOwned,

    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What an order will contain.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlan {
    pub products: Vec<Product>,
    /// Cart products skipped because the user already owns them.
    pub skipped: Vec<ProductId>,
    pub total: Decimal,
}

/// Decide which products to buy.
///
/// Inactive products are ignored and products the user already owns are
/// skipped.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` if no active product remains, or
/// `CheckoutError::AlreadyOwned` if every remaining product is owned.
pub fn plan_order(
    products: Vec<Product>,
    owned: &HashSet<ProductId>,
) -> Result<OrderPlan, CheckoutError> {
    let (skipped, products): (Vec<Product>, Vec<Product>) = products
        .into_iter()
        .filter(|p| p.is_active)
        .partition(|p| owned.contains(&p.id));

    if products.is_empty() {
        return Err(if skipped.is_empty() {
            CheckoutError::EmptyCart
        } else {
            CheckoutError::AlreadyOwned
        });
    }

    let total = Price::sum(products.iter().map(|p| &p.price));
    Ok(OrderPlan {
        products,
        skipped: skipped.into_iter().map(|p| p.id).collect(),
        total,
    })
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub order: Order,
    pub skipped: Vec<ProductId>,
}

/// Checkout service, acting as the signed-in user.
pub struct CheckoutService<'a> {
    client: &'a BackendClient,
    user: &'a CurrentUser,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(client: &'a BackendClient, user: &'a CurrentUser) -> Self {
        Self { client, user }
    }

    /// Place an order for the cart's contents.
    ///
    /// The cart itself is left untouched; the caller clears it on success.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` or `CheckoutError::AlreadyOwned`
    /// when there is nothing to buy, `CheckoutError::Repository` when the
    /// backend fails.
    #[instrument(skip(self, cart), fields(user_id = %self.user.id, cart_size = cart.len()))]
    pub async fn checkout(&self, cart: &Cart) -> Result<Receipt, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let products = ProductRepository::new(self.client, self.user.caller())
            .get_many(&cart.product_ids())
            .await?;
        let orders = OrderRepository::new(self.client, self.user.caller());
        let owned = orders.purchased_product_ids(self.user.id).await?;
        let plan = plan_order(products, &owned)?;

        let order = orders
            .create(&NewOrder {
                user_id: self.user.id,
                total_amount: plan.total,
                status: OrderStatus::Pending,
            })
            .await?;

        let items: Vec<NewOrderItem> = plan
            .products
            .iter()
            .map(|p| NewOrderItem {
                order_id: order.id,
                product_id: p.id,
                price: p.price,
            })
            .collect();

        if let Err(e) = orders.add_items(&items).await {
            if let Err(mark) = orders.set_status(order.id, OrderStatus::Failed).await {
                warn!(order_id = %order.id, error = %mark, "Failed to mark order as failed");
            }
            return Err(e.into());
        }

        orders.set_status(order.id, OrderStatus::Completed).await?;
        let order = orders.get(order.id).await?.ok_or(RepositoryError::NotFound)?;

        info!(
            order_id = %order.id,
            items = items.len(),
            skipped = plan.skipped.len(),
            total = %plan.total,
            "Order completed"
        );

        Ok(Receipt {
            order,
            skipped: plan.skipped,
        })
    }
}
