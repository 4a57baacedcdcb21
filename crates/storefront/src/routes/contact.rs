//! Contact form handler.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::backend::Caller;
use crate::db::ContactRepository;
use crate::error::Result;
use crate::services::validation;
use crate::state::AppState;

/// Contact form.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

/// Store a contact form submission.
#[instrument(skip(state, request))]
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<ContactRequest>,
) -> Result<impl IntoResponse> {
    let submission = validation::contact(
        &request.name,
        &request.email,
        request.subject.as_deref(),
        &request.message,
    )?;

    ContactRepository::new(state.backend(), Caller::Anon)
        .create(&submission)
        .await?;

    tracing::info!("Contact form submitted");
    Ok((StatusCode::CREATED, Json(json!({ "status": "received" }))))
}
