use serde::{Deserialize, Serialize};

/// 버전 관리되는 문서의 종류. 종류마다 버전 번호가 독립적으로 증가합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// 문제 LaTeX 문서
    Problem,
    /// 해설
    Explanation,
}

impl DocumentKind {
    pub fn table(self) -> &'static str {
        match self {
            DocumentKind::Problem => "problem_latex_documents",
            DocumentKind::Explanation => "explanations",
        }
    }

    /// 두 테이블을 같은 `VersionedDocument`로 읽기 위한 SELECT 컬럼 목록
    pub fn columns(self) -> &'static str {
        match self {
            DocumentKind::Problem => {
                "id, problem_id, NULL AS source_problem_latex_id, latex_code, pdf_path, \
                 version, is_confirmed, created_at, updated_at"
            }
            DocumentKind::Explanation => {
                "id, problem_id, source_problem_latex_id, latex_code, pdf_path, \
                 version, is_confirmed, created_at, updated_at"
            }
        }
    }

    /// 저장 파일명 접두사 ("problem_<id>", "explanation_<id>")
    pub fn file_hint(self, problem_id: &str) -> String {
        match self {
            DocumentKind::Problem => format!("problem_{}", problem_id),
            DocumentKind::Explanation => format!("explanation_{}", problem_id),
        }
    }
}

/// 문제 문서와 해설의 공통 행 표현
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VersionedDocument {
    pub id: String,
    pub problem_id: String,
    /// 해설에만 존재. 원본 문제 문서가 삭제되면 NULL
    pub source_problem_latex_id: Option<String>,
    pub latex_code: String,
    /// 빈 문자열 = PDF 없음
    pub pdf_path: String,
    pub version: i64,
    pub is_confirmed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub problem_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_problem_latex_id: Option<String>,
    pub latex_code: String,
    pub pdf_path: String,
    pub pdf_url: Option<String>,
    pub version: i64,
    pub is_confirmed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// 수동 편집 렌더링 요청
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub problem_id: String,
    pub document_type: DocumentKind,
    pub latex_document_id: Option<String>,
    pub latex_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ExplanationRequest {
    pub problem_id: String,
}
