//! # LaTeX 템플릿 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET    /api/v1/templates`               → 내 템플릿 목록 (기본 템플릿 먼저)
//! - `POST   /api/v1/templates`               → 생성
//! - `GET    /api/v1/templates/{id}`          → 조회 (시스템 템플릿도 조회 가능)
//! - `PUT    /api/v1/templates/{id}`          → 수정 (PATCH도 동일)
//! - `DELETE /api/v1/templates/{id}`          → 삭제
//! - `POST   /api/v1/templates/{id}/default`  → 기본 템플릿으로 지정
//!
//! 기본 템플릿을 삭제하면 이후 렌더링은 시스템 템플릿을 사용합니다.

use crate::{
    db,
    error::AppError,
    middleware::auth::AuthUser,
    models::template::*,
    services::template::{validate_content, validate_name},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

/// 요청자가 수정할 수 있는 템플릿인지 확인합니다. 시스템 템플릿은 수정할 수 없습니다.
async fn load_owned(state: &AppState, id: &str, user_id: &str) -> Result<LatexTemplate, AppError> {
    let template = db::templates::get_template(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound)?;

    if template.user_id.as_deref() != Some(user_id) {
        return Err(AppError::Forbidden);
    }

    Ok(template)
}

pub async fn list_templates(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let templates = db::templates::list_for_user(&state.pool, &auth_user.user_id).await?;
    Ok(Json(json!({ "templates": templates })))
}

pub async fn get_template(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<LatexTemplate>, AppError> {
    let template = db::templates::get_template(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    match template.user_id.as_deref() {
        None => Ok(Json(template)),
        Some(owner) if owner == auth_user.user_id => Ok(Json(template)),
        Some(_) => Err(AppError::Forbidden),
    }
}

pub async fn create_template(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<LatexTemplate>), AppError> {
    let name = validate_name(&req.name)?;
    validate_content(&req.content)?;

    let template = db::templates::create_template(
        &state.pool,
        &auth_user.user_id,
        &name,
        &req.content,
        req.is_default,
    )
    .await?;

    tracing::info!("Created template {} for user {}", template.id, auth_user.user_id);
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn update_template(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateTemplateRequest>,
) -> Result<Json<LatexTemplate>, AppError> {
    load_owned(&state, &id, &auth_user.user_id).await?;

    let name = req.name.as_deref().map(validate_name).transpose()?;
    if let Some(content) = &req.content {
        validate_content(content)?;
    }

    let template = db::templates::update_template(
        &state.pool,
        &id,
        &auth_user.user_id,
        name.as_deref(),
        req.content.as_deref(),
        req.is_default,
    )
    .await?;

    Ok(Json(template))
}

pub async fn delete_template(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    load_owned(&state, &id, &auth_user.user_id).await?;

    if !db::templates::delete_template(&state.pool, &id, &auth_user.user_id).await? {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_default(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<LatexTemplate>, AppError> {
    load_owned(&state, &id, &auth_user.user_id).await?;

    let template = db::templates::set_default(&state.pool, &id, &auth_user.user_id).await?;
    tracing::info!("Template {} is now the default for user {}", id, auth_user.user_id);

    Ok(Json(template))
}
