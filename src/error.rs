//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러를 `AppError` 하나로 모으고,
//! `IntoResponse` 구현으로 일관된 JSON 에러 응답으로 변환합니다.
//!
//! 응답 형태: `{ "error": { "code": "...", "message": "..." } }`
//!
//! 하위 계층의 에러(`CompileError`, `AiError`, `OcrError`, `sqlx::Error`,
//! `std::io::Error`)는 `From` 구현으로 `?` 한 번에 변환됩니다.

use crate::services::{ai::AiError, latex::CompileError, ocr::OcrError};
use axum::{
    http::StatusCode,                   // HTTP 상태 코드
    response::{IntoResponse, Response}, // 핸들러 반환값 → HTTP 응답 변환
    Json,
};
use serde_json::json; // 에러 본문 생성용 json! 매크로
use thiserror::Error; // Display + std::error::Error 자동 구현

// #[derive(Debug, Error)]
// - #[error("...")]가 각 variant의 Display 메시지가 됩니다.
// - #[from]이 붙은 필드는 From 구현이 생성되어 `?`로 바로 변환됩니다.
// - #[error(transparent)]는 감싼 에러의 메시지를 그대로 사용합니다.

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 리소스(문제/문서/템플릿/버전)가 없음 (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// 입력 검증 실패 (HTTP 400). 외부 호출 전에 거부됩니다.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 리소스는 있지만 요청자가 소유자가 아님 (HTTP 403)
    #[error("You do not have access to this resource")]
    Forbidden,

    /// 인증 실패 (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 리소스 충돌 (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// LaTeX → PDF 컴파일 실패. 단계별 진단 정보를 포함합니다.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// OCR 엔진이나 AI 서비스 호출 실패 (HTTP 502)
    #[error("Upstream service error: {0}")]
    Upstream(String),

    /// 배포 설정 오류 (예: 시스템 기본 템플릿 누락)
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// AI / OCR 에러는 원인이 외부 서비스이므로 모두 Upstream(502)으로 모읍니다.
// 메시지에는 상태 코드와 응답 본문 일부가 들어 있어 그대로 클라이언트에 전달합니다.
impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<OcrError> for AppError {
    fn from(err: OcrError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// 내부 에러(Database, IO, Internal, Configuration)는 상세 내용을 로그에만 남기고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    /// 컴파일 실패는 사용자가 LaTeX를 고칠 수 있도록 진단 정보를 그대로 돌려줍니다.
    fn into_response(self) -> Response {
        // `ref` 바인딩으로 빌려오기 때문에 arm 안에서 self.to_string()을 쓸 수 있습니다.
        let (status, code, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::Unauthorized(ref msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            // 컴파일 에러는 종류마다 상태 코드가 다릅니다.
            AppError::Compile(ref err) => match err {
                // 사용자 LaTeX 오류: 단계, stderr, 로그 끝부분을 그대로 돌려줌
                CompileError::Compilation { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "compilation_failed",
                    err.diagnostic(),
                ),
                CompileError::Timeout { .. } => {
                    (StatusCode::GATEWAY_TIMEOUT, "compile_timeout", err.to_string())
                }
                // 종료 코드는 0인데 결과 파일이 없음: 툴체인 문제로 보고 500
                CompileError::MissingArtifact { .. } => {
                    tracing::error!("LaTeX toolchain produced no output: {}", err.diagnostic());
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "missing_artifact",
                        err.diagnostic(),
                    )
                }
                CompileError::Io(ref e) => {
                    tracing::error!("IO error during compilation: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "io_error",
                        "An IO error occurred".to_string(),
                    )
                }
            },
            AppError::Upstream(ref msg) => {
                tracing::warn!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, "upstream_error", msg.clone())
            }
            // 여기서부터는 서버 내부 사정: 로그에만 상세 내용을 남깁니다.
            AppError::Configuration(ref msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration_error",
                    "The server is misconfigured".to_string(),
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "An IO error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::latex::CompileStage;

    #[test]
    fn compile_failures_keep_distinct_status_codes() {
        let failed = AppError::from(CompileError::Compilation {
            stage: CompileStage::LatexPass(1),
            stderr: String::new(),
            stdout: "! Undefined control sequence.".to_string(),
            log_tail: None,
        });
        let timed_out = AppError::from(CompileError::Timeout {
            stage: CompileStage::LatexPass(2),
            secs: 30,
        });

        assert_eq!(
            failed.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            timed_out.into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn forbidden_and_not_found_differ() {
        assert_eq!(
            AppError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
