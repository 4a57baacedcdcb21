//! Order administration.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use template_shop_core::{Order, OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::{PageQuery, path_id};
use crate::state::AppState;

/// Order list query.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

/// Orders with their items, newest first.
#[instrument(skip(state, admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>> {
    let paging = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let orders = OrderRepository::new(state.backend(), admin.caller())
        .list(query.status, paging.page(), paging.per_page())
        .await?;
    Ok(Json(orders))
}

/// One order with its items.
#[instrument(skip(state, admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id: OrderId = path_id(&id, "Order")?;
    let order = OrderRepository::new(state.backend(), admin.caller())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(Json(order))
}

/// Change an order's status, e.g. to record a refund.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Order>> {
    let id: OrderId = path_id(&id, "Order")?;
    let order = OrderRepository::new(state.backend(), admin.caller())
        .set_status(id, request.status)
        .await?;

    tracing::info!(order_id = %id, status = %request.status, "Order status changed");
    Ok(Json(order))
}
