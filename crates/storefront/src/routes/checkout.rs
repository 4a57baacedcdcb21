//! Checkout handler.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::{CheckoutService, cart};
use crate::state::AppState;

/// Turn the session cart into a completed order, then empty the cart.
#[instrument(skip(state, user, session), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<impl IntoResponse> {
    let mut cart = cart::load(&session).await?;
    let receipt = CheckoutService::new(state.backend(), &user)
        .checkout(&cart)
        .await?;

    cart.clear();
    cart::save(&session, &cart).await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}
