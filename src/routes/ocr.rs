//! # OCR 업로드 핸들러
//!
//! - `POST /api/v1/ocr` (multipart/form-data)
//!   - `image`: 문제 사진
//!   - `problem_id`: 대상 문제
//!
//! 업로드 크기는 `MAX_UPLOAD_BYTES`로 제한됩니다 (`routes::api_router`).

use crate::{
    error::AppError,
    middleware::auth::AuthUser,
    models::document::DocumentResponse,
    routes::{
        documents::document_response,
        projects::{load_problem, Lifecycle},
    },
    services::pipeline,
    state::AppState,
};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

pub async fn upload(
    State(state): State<AppState>,
    auth_user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let mut image: Option<(Vec<u8>, &'static str)> = None;
    let mut problem_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        // field.bytes()/text()가 field를 소비하므로 이름을 먼저 복사
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read image: {}", e)))?;
                let extension = image_extension(file_name.as_deref(), &bytes);
                image = Some((bytes.to_vec(), extension));
            }
            Some("problem_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid problem_id: {}", e)))?;
                problem_id = Some(value.trim().to_string());
            }
            // 알 수 없는 필드는 무시
            _ => {}
        }
    }

    let problem_id = problem_id
        .filter(|id| !id.is_empty())
        .ok_or(AppError::BadRequest("problem_id is required".to_string()))?;
    let (bytes, extension) = image
        .filter(|(bytes, _)| !bytes.is_empty())
        .ok_or(AppError::BadRequest("image is required".to_string()))?;

    // 입력 검증이 끝난 뒤에만 소유권 확인과 외부 호출을 수행
    let problem = load_problem(&state, &problem_id, &auth_user.user_id, Lifecycle::Active).await?;
    let doc =
        pipeline::ocr_to_problem_latex(&state, &auth_user.user_id, &problem, &bytes, extension)
            .await?;

    Ok((
        StatusCode::CREATED,
        Json(document_response(&state.storage, doc)),
    ))
}

/// 파일 이름의 확장자를 우선하고, 없으면 시그니처로 추정합니다.
fn image_extension(file_name: Option<&str>, bytes: &[u8]) -> &'static str {
    let from_name = file_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match from_name.as_deref() {
        Some("jpg") | Some("jpeg") => "jpg",
        Some("png") => "png",
        Some("webp") => "webp",
        Some("gif") => "gif",
        _ if bytes.starts_with(&[0xFF, 0xD8]) => "jpg",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_prefers_file_name_then_signature() {
        assert_eq!(image_extension(Some("photo.JPEG"), b""), "jpg");
        assert_eq!(image_extension(Some("scan.webp"), b""), "webp");
        assert_eq!(image_extension(Some("noext"), &[0xFF, 0xD8, 0xFF]), "jpg");
        assert_eq!(image_extension(None, b"\x89PNG"), "png");
    }
}
