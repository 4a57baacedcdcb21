//! Cart route handlers.
//!
//! The cart lives in the session as a set of product IDs. Every handler
//! answers with the current [`CartView`] so clients can re-render at once.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use template_shop_core::ProductId;

use super::path_id;
use crate::backend::Caller;
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{Cart, CurrentUser};
use crate::services::cart::{self, CartView};
use crate::state::AppState;

/// Add-to-cart form.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
}

/// Show the cart.
#[instrument(skip(state, user, session))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<CartView>> {
    let mut cart = cart::load(&session).await?;
    render(&state, user.as_ref(), &session, &mut cart).await
}

/// Add a product. Adding a product already in the cart changes nothing.
#[instrument(skip(state, user, session))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let product = ProductRepository::new(state.backend(), caller(user.as_ref()))
        .get(request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    if !product.is_active {
        return Err(AppError::BadRequest(
            "This product is no longer available".to_string(),
        ));
    }

    let mut cart = cart::load(&session).await?;
    if cart.add(product.id) {
        cart::save(&session, &cart).await?;
    }
    render(&state, user.as_ref(), &session, &mut cart).await
}

/// Remove a product.
#[instrument(skip(state, user, session))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(product_id): Path<String>,
) -> Result<Json<CartView>> {
    let product_id: ProductId = path_id(&product_id, "Product")?;
    let mut cart = cart::load(&session).await?;
    if cart.remove(product_id) {
        cart::save(&session, &cart).await?;
    }
    render(&state, user.as_ref(), &session, &mut cart).await
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Json<CartView>> {
    let mut cart = cart::load(&session).await?;
    cart.clear();
    cart::save(&session, &cart).await?;
    Ok(Json(CartView::reconcile(&mut cart, Vec::new()).0))
}

/// Look up the cart's products, saving the cart if any had to be dropped.
async fn render(
    state: &AppState,
    user: Option<&CurrentUser>,
    session: &Session,
    cart: &mut Cart,
) -> Result<Json<CartView>> {
    if cart.is_empty() {
        return Ok(Json(CartView::reconcile(cart, Vec::new()).0));
    }
    let (view, pruned) = cart::view(state.backend(), caller(user), cart).await?;
    if pruned {
        cart::save(session, cart).await?;
    }
    Ok(Json(view))
}

fn caller(user: Option<&CurrentUser>) -> Caller<'_> {
    user.map_or(Caller::Anon, CurrentUser::caller)
}
