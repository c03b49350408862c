//! # 해설 생성 핸들러
//!
//! - `POST /api/v1/explanations` `{ "problem_id": "..." }`

use crate::{
    error::AppError,
    middleware::auth::AuthUser,
    models::document::{DocumentResponse, ExplanationRequest},
    routes::{
        documents::document_response,
        projects::{load_problem, Lifecycle},
    },
    services::pipeline,
    state::AppState,
};
use axum::{extract::State, http::StatusCode, Json};

pub async fn create_explanation(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<ExplanationRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let problem =
        load_problem(&state, &req.problem_id, &auth_user.user_id, Lifecycle::Active).await?;
    let doc = pipeline::generate_explanation(&state, &auth_user.user_id, &problem).await?;

    Ok((
        StatusCode::CREATED,
        Json(document_response(&state.storage, doc)),
    ))
}
