//! # 라우트 핸들러 모듈
//!
//! 각 하위 모듈:
//! - `auth`: 회원가입, 로그인, 내 정보
//! - `projects`: 문제(프로젝트) CRUD와 휴지통
//! - `documents`: 문제 문서/해설의 이력 조회와 버전 확정
//! - `ocr`: 이미지 업로드 → OCR 파이프라인
//! - `explanations`: AI 해설 생성 파이프라인
//! - `latex`: 수동 편집 렌더링과 PDF 조회
//! - `templates`: LaTeX 템플릿 CRUD와 기본 템플릿 지정
//! - `health`: 헬스체크

pub mod auth;
pub mod documents;
pub mod explanations;
pub mod health;
pub mod latex;
pub mod ocr;
pub mod projects;
pub mod templates;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

/// `/api/v1` 아래에 중첩될 API 라우터
pub fn api_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me));

    let project_routes = Router::new()
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/projects/trash", get(projects::list_trash))
        .route(
            "/projects/{id}",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/{id}/restore", post(projects::restore_project))
        .route("/projects/{id}/permanent", delete(projects::permanent_delete))
        .route("/projects/{id}/latex/history", get(documents::latex_history))
        .route(
            "/projects/{id}/latex/{version}/confirm",
            post(documents::confirm_latex),
        )
        .route(
            "/projects/{id}/explanation/history",
            get(documents::explanation_history),
        )
        .route(
            "/projects/{id}/explanation/{version}/confirm",
            post(documents::confirm_explanation),
        );

    let pipeline_routes = Router::new()
        .route("/ocr", post(ocr::upload).layer(upload_limit))
        .route("/explanations", post(explanations::create_explanation))
        .route("/latex/render", post(latex::render))
        .route("/latex/pdf/{*path}", get(latex::get_pdf));

    let template_routes = Router::new()
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/templates/{id}",
            get(templates::get_template)
                .put(templates::update_template)
                .patch(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/templates/{id}/default", post(templates::set_default));

    Router::new()
        .merge(auth_routes)
        .merge(project_routes)
        .merge(pipeline_routes)
        .merge(template_routes)
        .route("/health", get(health::health_check))
        .with_state(state)
}
