//! # LaTeX 템플릿 서비스
//!
//! - `resolve()`: 사용자에게 적용할 템플릿 결정 (사용자 기본 템플릿 → 시스템 템플릿)
//! - `wrap()`: 템플릿의 `{children}` 자리에 본문을 끼워 완성된 문서를 만듦
//! - `validate_*()`: 템플릿 저장 전 입력 검증

use crate::{db, error::AppError, models::template::LatexTemplate};
use sqlx::SqlitePool;

/// 본문이 들어갈 자리표시자
pub const PLACEHOLDER: &str = "{children}";

/// 시스템 전역 템플릿 이름 (마이그레이션으로 시드됨)
pub const SYSTEM_TEMPLATE_NAME: &str = "システムデフォルト";

const MAX_NAME_LENGTH: usize = 200;

/// 템플릿 본문에 자리표시자가 있는지 검사합니다.
pub fn validate_content(content: &str) -> Result<(), AppError> {
    if content.contains(PLACEHOLDER) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Template content must contain the {} placeholder",
            PLACEHOLDER
        )))
    }
}

/// 앞뒤 공백을 제거한 이름을 반환합니다.
pub fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Template name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Template name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// 자리표시자를 본문으로 치환합니다. 자리표시자가 여러 개면 모두 치환됩니다.
pub fn wrap(body: &str, template: &LatexTemplate) -> String {
    template.content.replace(PLACEHOLDER, body)
}

/// 사용자의 기본 템플릿, 없으면 시스템 템플릿을 반환합니다.
///
/// 시스템 템플릿마저 없다면 배포 설정 문제이므로 `Configuration` 에러입니다.
pub async fn resolve(pool: &SqlitePool, user_id: &str) -> Result<LatexTemplate, AppError> {
    if let Some(template) = db::templates::get_user_default(pool, user_id).await? {
        return Ok(template);
    }

    db::templates::get_system_template(pool, SYSTEM_TEMPLATE_NAME)
        .await?
        .ok_or_else(|| {
            AppError::Configuration(format!(
                "System template '{}' is missing",
                SYSTEM_TEMPLATE_NAME
            ))
        })
}
