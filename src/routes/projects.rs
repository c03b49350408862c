//! # 문제(프로젝트) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET    /api/v1/projects`                 → 활성 문제 목록
//! - `POST   /api/v1/projects`                 → 새 문제 (제목만)
//! - `GET    /api/v1/projects/trash`           → 휴지통 목록
//! - `GET    /api/v1/projects/{id}`            → 상세 (최신 문제 문서 + 최신 해설 포함)
//! - `PATCH  /api/v1/projects/{id}`            → 제목/풀이 메모 수정
//! - `DELETE /api/v1/projects/{id}`            → 휴지통으로 이동
//! - `POST   /api/v1/projects/{id}/restore`    → 복원
//! - `DELETE /api/v1/projects/{id}/permanent`  → 영구 삭제 (휴지통에 있는 경우만)
//!
//! 휴지통에 있는 문제는 복원/영구 삭제/휴지통 목록을 제외한 모든 요청에서 404입니다.

use crate::{
    db,
    error::AppError,
    middleware::auth::AuthUser,
    models::{document::DocumentKind, problem::*},
    routes::documents::document_response,
    services::storage::FileStorage,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

const MAX_TITLE_LENGTH: usize = 200;

/// 요청이 기대하는 문제 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Trashed,
}

/// 문제를 조회하고 소유자와 상태를 확인합니다.
///
/// - 없거나 상태가 다르면 `NotFound`
/// - 다른 사용자의 문제면 `Forbidden`
pub async fn load_problem(
    state: &AppState,
    id: &str,
    user_id: &str,
    lifecycle: Lifecycle,
) -> Result<Problem, AppError> {
    let problem = db::problems::get_problem(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound)?;

    if problem.user_id != user_id {
        return Err(AppError::Forbidden);
    }

    let matches = match lifecycle {
        Lifecycle::Active => !problem.is_deleted(),
        Lifecycle::Trashed => problem.is_deleted(),
    };
    if !matches {
        return Err(AppError::NotFound);
    }

    Ok(problem)
}

pub fn problem_response(storage: &FileStorage, problem: Problem) -> ProblemResponse {
    let original_image_url = if problem.original_image_path.is_empty() {
        None
    } else {
        Some(storage.url(&problem.original_image_path))
    };

    ProblemResponse {
        id: problem.id,
        title: problem.title,
        original_image_url,
        solution_notes: problem.solution_notes,
        deleted_at: problem.deleted_at,
        created_at: problem.created_at,
        updated_at: problem.updated_at,
    }
}

fn validate_title(title: &str) -> Result<&str, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title)
}

pub async fn list_projects(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let problems = db::problems::list_problems(&state.pool, &auth_user.user_id, false).await?;
    let projects: Vec<ProblemResponse> = problems
        .into_iter()
        .map(|p| problem_response(&state.storage, p))
        .collect();

    Ok(Json(json!({ "projects": projects })))
}

pub async fn list_trash(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let problems = db::problems::list_problems(&state.pool, &auth_user.user_id, true).await?;
    let projects: Vec<ProblemResponse> = problems
        .into_iter()
        .map(|p| problem_response(&state.storage, p))
        .collect();

    Ok(Json(json!({ "projects": projects })))
}

pub async fn create_project(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<CreateProblemRequest>,
) -> Result<(StatusCode, Json<ProblemResponse>), AppError> {
    let title = validate_title(&req.title)?;
    let problem = db::problems::create_problem(&state.pool, &auth_user.user_id, title).await?;

    tracing::info!("Created problem {} for user {}", problem.id, auth_user.user_id);
    Ok((
        StatusCode::CREATED,
        Json(problem_response(&state.storage, problem)),
    ))
}

pub async fn get_project(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProblemDetail>, AppError> {
    let problem = load_problem(&state, &id, &auth_user.user_id, Lifecycle::Active).await?;

    let latex_document = db::documents::latest(&state.pool, DocumentKind::Problem, &problem.id)
        .await?
        .map(|d| document_response(&state.storage, d));
    let explanation = db::documents::latest(&state.pool, DocumentKind::Explanation, &problem.id)
        .await?
        .map(|d| document_response(&state.storage, d));

    Ok(Json(ProblemDetail {
        problem: problem_response(&state.storage, problem),
        latex_document,
        explanation,
    }))
}

pub async fn update_project(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateProblemRequest>,
) -> Result<Json<ProblemResponse>, AppError> {
    load_problem(&state, &id, &auth_user.user_id, Lifecycle::Active).await?;

    let title = req.title.as_deref().map(validate_title).transpose()?;
    let problem =
        db::problems::update_problem(&state.pool, &id, title, req.solution_notes.as_deref())
            .await?;

    Ok(Json(problem_response(&state.storage, problem)))
}

/// 휴지통으로 이동합니다.
pub async fn delete_project(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    load_problem(&state, &id, &auth_user.user_id, Lifecycle::Active).await?;

    if !db::problems::soft_delete(&state.pool, &id).await? {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_project(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProblemResponse>, AppError> {
    load_problem(&state, &id, &auth_user.user_id, Lifecycle::Trashed).await?;

    if !db::problems::restore(&state.pool, &id).await? {
        return Err(AppError::NotFound);
    }

    let problem = db::problems::get_problem(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(problem_response(&state.storage, problem)))
}

/// 영구 삭제. 문서 행은 FK CASCADE로 지워지고, 저장된 PDF와 원본 이미지는 최선을 다해 삭제합니다.
pub async fn permanent_delete(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let problem = load_problem(&state, &id, &auth_user.user_id, Lifecycle::Trashed).await?;
    let pdf_paths = db::documents::list_pdf_paths(&state.pool, &id).await?;

    if !db::problems::delete_problem(&state.pool, &id).await? {
        return Err(AppError::NotFound);
    }

    let mut failed = 0;
    for path in pdf_paths.iter().chain(std::iter::once(&problem.original_image_path)) {
        if !state.storage.delete(path).await {
            failed += 1;
        }
    }
    if failed > 0 {
        tracing::warn!("Problem {} deleted but {} stored files remain", id, failed);
    }

    tracing::info!("Permanently deleted problem {}", id);
    Ok(StatusCode::NO_CONTENT)
}
