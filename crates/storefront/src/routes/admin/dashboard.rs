//! Dashboard route handler.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use template_shop_core::{ContactStatus, OrderStatus};

use crate::db::{ContactRepository, OrderRepository, ProductRepository, ProfileRepository};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Dashboard metrics.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub products: u64,
    pub active_products: u64,
    pub orders: u64,
    pub completed_orders: u64,
    pub revenue: Decimal,
    pub users: u64,
    pub new_contacts: u64,
}

/// Store-wide counts and completed revenue.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    let caller = admin.caller();
    let products = ProductRepository::new(state.backend(), caller);
    let orders = OrderRepository::new(state.backend(), caller);
    let profiles = ProfileRepository::new(state.backend(), caller);
    let contact = ContactRepository::new(state.backend(), caller);

    let (all_products, active_products, all_orders, completed_orders, revenue, users, new_contacts) =
        tokio::try_join!(
            products.count(false),
            products.count(true),
            orders.count(None),
            orders.count(Some(OrderStatus::Completed)),
            orders.completed_revenue(),
            profiles.count(),
            contact.count(ContactStatus::New),
        )?;

    Ok(Json(DashboardStats {
        products: all_products,
        active_products,
        orders: all_orders,
        completed_orders,
        revenue,
        users,
        new_contacts,
    }))
}
