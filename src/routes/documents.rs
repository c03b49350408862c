//! # 문서 버전 라우트 핸들러
//!
//! 문제 문서와 해설은 같은 버전 규칙을 따르므로, 핸들러는 종류만 고정해
//! 공통 함수(`history_for`, `confirm_for`)에 위임합니다.
//!
//! ## 엔드포인트
//! - `GET  /api/v1/projects/{id}/latex/history`
//! - `POST /api/v1/projects/{id}/latex/{version}/confirm`
//! - `GET  /api/v1/projects/{id}/explanation/history`
//! - `POST /api/v1/projects/{id}/explanation/{version}/confirm`

use crate::{
    db,
    error::AppError,
    middleware::auth::AuthUser,
    models::document::{DocumentKind, DocumentResponse, VersionedDocument},
    routes::projects::{load_problem, Lifecycle},
    services::storage::FileStorage,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

pub fn document_response(storage: &FileStorage, doc: VersionedDocument) -> DocumentResponse {
    let pdf_url = if doc.pdf_path.is_empty() {
        None
    } else {
        Some(storage.url(&doc.pdf_path))
    };

    DocumentResponse {
        id: doc.id,
        problem_id: doc.problem_id,
        source_problem_latex_id: doc.source_problem_latex_id,
        latex_code: doc.latex_code,
        pdf_path: doc.pdf_path,
        pdf_url,
        version: doc.version,
        is_confirmed: doc.is_confirmed,
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    }
}

pub async fn latex_history(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    history_for(&state, &auth_user, &id, DocumentKind::Problem).await
}

pub async fn explanation_history(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    history_for(&state, &auth_user, &id, DocumentKind::Explanation).await
}

pub async fn confirm_latex(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, version)): Path<(String, i64)>,
) -> Result<Json<DocumentResponse>, AppError> {
    confirm_for(&state, &auth_user, &id, version, DocumentKind::Problem).await
}

pub async fn confirm_explanation(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, version)): Path<(String, i64)>,
) -> Result<Json<DocumentResponse>, AppError> {
    confirm_for(&state, &auth_user, &id, version, DocumentKind::Explanation).await
}

async fn history_for(
    state: &AppState,
    auth_user: &AuthUser,
    problem_id: &str,
    kind: DocumentKind,
) -> Result<Json<Value>, AppError> {
    load_problem(state, problem_id, &auth_user.user_id, Lifecycle::Active).await?;

    let versions: Vec<DocumentResponse> = db::documents::history(&state.pool, kind, problem_id)
        .await?
        .into_iter()
        .map(|d| document_response(&state.storage, d))
        .collect();

    Ok(Json(json!({ "versions": versions })))
}

async fn confirm_for(
    state: &AppState,
    auth_user: &AuthUser,
    problem_id: &str,
    version: i64,
    kind: DocumentKind,
) -> Result<Json<DocumentResponse>, AppError> {
    load_problem(state, problem_id, &auth_user.user_id, Lifecycle::Active).await?;

    let doc = db::documents::confirm(&state.pool, kind, problem_id, version).await?;
    tracing::info!("Confirmed {:?} version {} of problem {}", kind, version, problem_id);

    Ok(Json(document_response(&state.storage, doc)))
}
