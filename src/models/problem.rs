use super::document::DocumentResponse;
use serde::{Deserialize, Serialize};

/// 문제(프로젝트). `deleted_at`이 있으면 휴지통 상태입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Problem {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// 빈 문자열 = 업로드된 이미지 없음
    pub original_image_path: String,
    pub solution_notes: String,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Problem {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// 목록/상세 응답용 문제 표현
#[derive(Debug, Serialize)]
pub struct ProblemResponse {
    pub id: String,
    pub title: String,
    pub original_image_url: Option<String>,
    pub solution_notes: String,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProblemRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProblemRequest {
    pub title: Option<String>,
    pub solution_notes: Option<String>,
}

/// 상세 화면: 문제 + 최신 문제 문서 + 최신 해설
#[derive(Debug, Serialize)]
pub struct ProblemDetail {
    #[serde(flatten)]
    pub problem: ProblemResponse,
    pub latex_document: Option<DocumentResponse>,
    pub explanation: Option<DocumentResponse>,
}
