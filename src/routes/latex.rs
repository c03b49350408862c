//! # LaTeX 렌더링 / PDF 조회 핸들러
//!
//! - `POST /api/v1/latex/render`     → 수동 편집한 LaTeX를 컴파일해 새 버전 생성
//! - `GET  /api/v1/latex/pdf/{*path}` → 저장된 PDF 조회
//!
//! PDF는 정적 미디어 경로 대신 이 엔드포인트로 서빙합니다.
//! 프런트엔드가 iframe으로 임베드하므로 프레임 차단 헤더를 붙이지 않습니다.

use crate::{
    error::AppError,
    middleware::auth::AuthUser,
    models::document::{DocumentResponse, RenderRequest},
    routes::{
        documents::document_response,
        projects::{load_problem, Lifecycle},
    },
    services::pipeline,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

pub async fn render(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<RenderRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let problem =
        load_problem(&state, &req.problem_id, &auth_user.user_id, Lifecycle::Active).await?;
    let doc = pipeline::render_manual(&state, &problem, &req).await?;

    Ok((
        StatusCode::CREATED,
        Json(document_response(&state.storage, doc)),
    ))
}

/// 경로 탐색, `.pdf`가 아닌 파일, 없는 파일은 모두 404입니다.
pub async fn get_pdf(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let full_path = state
        .storage
        .resolve_pdf(&path)
        .await
        .ok_or(AppError::NotFound)?;

    let bytes = tokio::fs::read(&full_path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "inline"),
            (header::CACHE_CONTROL, "private, max-age=3600"),
        ],
        bytes,
    ))
}
