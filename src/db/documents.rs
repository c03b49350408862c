//! # 버전 관리 문서 쿼리
//!
//! 문제 LaTeX 문서(`problem_latex_documents`)와 해설(`explanations`)은 같은 규칙을 따르므로
//! `DocumentKind` 하나로 테이블을 골라 같은 함수를 사용합니다.
//!
//! 규칙:
//! - 버전 번호는 (문제, 종류)마다 `MAX(version) + 1`로 매겨지며 재사용되지 않습니다.
//! - 새 버전은 항상 미확정 상태로 생성됩니다.
//! - 확정(`confirm`)은 해당 버전에만 적용되고 다른 버전의 확정 상태는 건드리지 않습니다.

use crate::error::AppError;
use crate::models::document::{DocumentKind, VersionedDocument};
use sqlx::SqlitePool;

/// 버전 번호 충돌 시 다시 시도하는 최대 횟수
const MAX_VERSION_ATTEMPTS: usize = 5;

/// 새 버전을 생성합니다.
///
/// 다음 버전 번호 계산과 삽입을 `INSERT … SELECT` 한 문장으로 처리하고,
/// 그래도 `UNIQUE(problem_id, version)` 충돌이 나면 번호를 다시 계산해 재시도합니다.
/// 재시도를 모두 소진하면 `Conflict`를 반환합니다.
///
/// `source_id`는 해설에만 의미가 있으며 문제 문서에서는 무시됩니다.
pub async fn create_version(
    pool: &SqlitePool,
    kind: DocumentKind,
    problem_id: &str,
    latex_code: &str,
    pdf_path: &str,
    source_id: Option<&str>,
) -> Result<VersionedDocument, AppError> {
    for attempt in 1..=MAX_VERSION_ATTEMPTS {
        // 시도마다 새 id. UUID v7은 시간순 정렬이 됩니다.
        let id = uuid::Uuid::now_v7().to_string();

        // 테이블마다 컬럼이 달라 쿼리를 나눕니다 (해설만 source_problem_latex_id 보유).
        let inserted = match kind {
            DocumentKind::Problem => {
                sqlx::query(
                    r#"
                    INSERT INTO problem_latex_documents (id, problem_id, latex_code, pdf_path, version)
                    SELECT ?, ?, ?, ?, COALESCE(MAX(version), 0) + 1
                    FROM problem_latex_documents
                    WHERE problem_id = ?
                    "#,
                )
                .bind(&id)
                .bind(problem_id)
                .bind(latex_code)
                .bind(pdf_path)
                .bind(problem_id)
                .execute(pool)
                .await
            }
            DocumentKind::Explanation => {
                sqlx::query(
                    r#"
                    INSERT INTO explanations
                        (id, problem_id, source_problem_latex_id, latex_code, pdf_path, version)
                    SELECT ?, ?, ?, ?, ?, COALESCE(MAX(version), 0) + 1
                    FROM explanations
                    WHERE problem_id = ?
                    "#,
                )
                .bind(&id)
                .bind(problem_id)
                .bind(source_id)
                .bind(latex_code)
                .bind(pdf_path)
                .bind(problem_id)
                .execute(pool)
                .await
            }
        };

        match inserted {
            // 삽입 성공: DB가 채운 기본값(created_at 등)까지 포함해 다시 조회
            Ok(_) => {
                return get_document(pool, kind, &id).await?.ok_or(AppError::Internal(
                    "Failed to retrieve created document version".to_string(),
                ));
            }
            // 같은 번호를 다른 요청이 먼저 가져감: MAX를 다시 계산해 재시도
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                tracing::debug!(
                    "Version collision for {:?} of problem {} (attempt {})",
                    kind,
                    problem_id,
                    attempt
                );
                continue;
            }
            // 외래 키 위반 등 나머지 DB 에러는 재시도하지 않음
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Conflict(format!(
        "Could not allocate a new version for problem {}",
        problem_id
    )))
}

pub async fn get_document(
    pool: &SqlitePool,
    kind: DocumentKind,
    id: &str,
) -> Result<Option<VersionedDocument>, AppError> {
    let doc = sqlx::query_as::<_, VersionedDocument>(&format!(
        "SELECT {} FROM {} WHERE id = ?",
        kind.columns(),
        kind.table()
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(doc)
}

/// 지정한 버전을 확정합니다.
///
/// 이미 확정된 버전이면 아무것도 바꾸지 않습니다 (`updated_at` 포함).
/// 해당 버전이 없으면 `NotFound`.
pub async fn confirm(
    pool: &SqlitePool,
    kind: DocumentKind,
    problem_id: &str,
    version: i64,
) -> Result<VersionedDocument, AppError> {
    let result = sqlx::query(&format!(
        r#"
        -- 이미 확정된 행은 updated_at을 유지
        UPDATE {} SET
            updated_at = CASE WHEN is_confirmed = 1 THEN updated_at
                              ELSE strftime('%Y-%m-%dT%H:%M:%fZ', 'now') END,
            is_confirmed = 1
        WHERE problem_id = ? AND version = ?
        "#,
        kind.table()
    ))
    .bind(problem_id)
    .bind(version)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    get_version(pool, kind, problem_id, version)
        .await?
        .ok_or(AppError::NotFound)
}

/// 컴파일이 끝난 버전에 PDF 경로를 기록합니다.
///
/// 버전은 빈 `pdf_path`로 먼저 만들어지고, 컴파일에 성공했을 때만 이 함수로 채워집니다.
pub async fn set_pdf_path(
    pool: &SqlitePool,
    kind: DocumentKind,
    id: &str,
    pdf_path: &str,
) -> Result<VersionedDocument, AppError> {
    let result = sqlx::query(&format!(
        "UPDATE {} SET pdf_path = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
        kind.table()
    ))
    .bind(pdf_path)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    get_document(pool, kind, id).await?.ok_or(AppError::NotFound)
}

pub async fn get_version(
    pool: &SqlitePool,
    kind: DocumentKind,
    problem_id: &str,
    version: i64,
) -> Result<Option<VersionedDocument>, AppError> {
    let doc = sqlx::query_as::<_, VersionedDocument>(&format!(
        "SELECT {} FROM {} WHERE problem_id = ? AND version = ?",
        kind.columns(),
        kind.table()
    ))
    .bind(problem_id)
    .bind(version)
    .fetch_optional(pool)
    .await?;

    Ok(doc)
}

/// 확정된 버전 중 가장 높은 것, 확정본이 없으면 가장 높은 버전.
/// 해설 생성 시 어떤 문제 문서를 입력으로 쓸지 결정하는 기준입니다.
pub async fn latest_confirmed_or_latest(
    pool: &SqlitePool,
    kind: DocumentKind,
    problem_id: &str,
) -> Result<Option<VersionedDocument>, AppError> {
    let doc = sqlx::query_as::<_, VersionedDocument>(&format!(
        "SELECT {} FROM {} WHERE problem_id = ? ORDER BY is_confirmed DESC, version DESC LIMIT 1",
        kind.columns(),
        kind.table()
    ))
    .bind(problem_id)
    .fetch_optional(pool)
    .await?;

    Ok(doc)
}

/// 확정 여부와 관계없이 가장 높은 버전
pub async fn latest(
    pool: &SqlitePool,
    kind: DocumentKind,
    problem_id: &str,
) -> Result<Option<VersionedDocument>, AppError> {
    let doc = sqlx::query_as::<_, VersionedDocument>(&format!(
        "SELECT {} FROM {} WHERE problem_id = ? ORDER BY version DESC LIMIT 1",
        kind.columns(),
        kind.table()
    ))
    .bind(problem_id)
    .fetch_optional(pool)
    .await?;

    Ok(doc)
}

/// 전체 이력, 최신 버전 먼저
pub async fn history(
    pool: &SqlitePool,
    kind: DocumentKind,
    problem_id: &str,
) -> Result<Vec<VersionedDocument>, AppError> {
    let docs = sqlx::query_as::<_, VersionedDocument>(&format!(
        "SELECT {} FROM {} WHERE problem_id = ? ORDER BY version DESC",
        kind.columns(),
        kind.table()
    ))
    .bind(problem_id)
    .fetch_all(pool)
    .await?;

    Ok(docs)
}

/// 문제에 속한 모든 문서의 PDF 경로 (영구 삭제 시 파일 정리용)
pub async fn list_pdf_paths(pool: &SqlitePool, problem_id: &str) -> Result<Vec<String>, AppError> {
    let paths = sqlx::query_scalar::<_, String>(
        r#"
        SELECT pdf_path FROM problem_latex_documents WHERE problem_id = ? AND pdf_path != ''
        UNION
        SELECT pdf_path FROM explanations WHERE problem_id = ? AND pdf_path != ''
        "#,
    )
    .bind(problem_id)
    .bind(problem_id)
    .fetch_all(pool)
    .await?;

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{problems, testing, users};

    async fn problem(pool: &SqlitePool) -> String {
        let user = users::create_user(pool, "u", None, "h").await.unwrap();
        problems::create_problem(pool, &user.id, "p").await.unwrap().id
    }

    #[tokio::test]
    async fn versions_are_dense_and_per_kind() {
        let pool = testing::pool().await;
        let pid = problem(&pool).await;

        for expected in 1..=4 {
            let doc = create_version(&pool, DocumentKind::Problem, &pid, "x", "", None)
                .await
                .unwrap();
            assert_eq!(doc.version, expected);
            assert!(!doc.is_confirmed);
        }

        let first_explanation = create_version(&pool, DocumentKind::Explanation, &pid, "e", "", None)
            .await
            .unwrap();
        assert_eq!(first_explanation.version, 1);

        let versions: Vec<i64> = history(&pool, DocumentKind::Problem, &pid)
            .await
            .unwrap()
            .iter()
            .map(|d| d.version)
            .collect();
        assert_eq!(versions, vec![4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn concurrent_creates_never_collide() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = testing::file_pool(&dir).await;
        let pid = problem(&pool).await;

        let mut handles = Vec::new();
        for i in 0..16 {
            let pool = pool.clone();
            let pid = pid.clone();
            handles.push(tokio::spawn(async move {
                create_version(&pool, DocumentKind::Problem, &pid, &format!("v{}", i), "", None)
                    .await
                    .unwrap()
                    .version
            }));
        }

        let mut versions = Vec::new();
        for handle in handles {
            versions.push(handle.await.unwrap());
        }
        versions.sort();
        assert_eq!(versions, (1..=16).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn confirm_is_idempotent_and_missing_versions_fail() {
        let pool = testing::pool().await;
        let pid = problem(&pool).await;
        create_version(&pool, DocumentKind::Problem, &pid, "x", "", None)
            .await
            .unwrap();

        let once = confirm(&pool, DocumentKind::Problem, &pid, 1).await.unwrap();
        let twice = confirm(&pool, DocumentKind::Problem, &pid, 1).await.unwrap();
        assert!(once.is_confirmed);
        assert_eq!(once, twice);

        let before = history(&pool, DocumentKind::Problem, &pid).await.unwrap();
        assert!(matches!(
            confirm(&pool, DocumentKind::Problem, &pid, 7).await,
            Err(AppError::NotFound)
        ));
        assert_eq!(history(&pool, DocumentKind::Problem, &pid).await.unwrap(), before);
    }

    #[tokio::test]
    async fn latest_confirmed_beats_newer_unconfirmed() {
        let pool = testing::pool().await;
        let pid = problem(&pool).await;
        for _ in 0..3 {
            create_version(&pool, DocumentKind::Problem, &pid, "x", "", None)
                .await
                .unwrap();
        }

        let latest_any = latest_confirmed_or_latest(&pool, DocumentKind::Problem, &pid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest_any.version, 3);

        confirm(&pool, DocumentKind::Problem, &pid, 1).await.unwrap();
        let picked = latest_confirmed_or_latest(&pool, DocumentKind::Problem, &pid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.version, 1);

        confirm(&pool, DocumentKind::Problem, &pid, 3).await.unwrap();
        let picked = latest_confirmed_or_latest(&pool, DocumentKind::Problem, &pid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.version, 3);

        // 이전 확정본은 그대로 유지
        let v1 = get_version(&pool, DocumentKind::Problem, &pid, 1).await.unwrap().unwrap();
        assert!(v1.is_confirmed);
    }

    #[tokio::test]
    async fn explanation_survives_source_deletion() {
        let pool = testing::pool().await;
        let pid = problem(&pool).await;
        let source = create_version(&pool, DocumentKind::Problem, &pid, "x", "", None)
            .await
            .unwrap();
        let explanation =
            create_version(&pool, DocumentKind::Explanation, &pid, "e", "", Some(&source.id))
                .await
                .unwrap();
        assert_eq!(explanation.source_problem_latex_id.as_deref(), Some(source.id.as_str()));

        sqlx::query("DELETE FROM problem_latex_documents WHERE id = ?")
            .bind(&source.id)
            .execute(&pool)
            .await
            .unwrap();

        let survived = get_document(&pool, DocumentKind::Explanation, &explanation.id)
            .await
            .unwrap()
            .unwrap();
        assert!(survived.source_problem_latex_id.is_none());
        assert_eq!(survived.latex_code, "e");
    }

    #[tokio::test]
    async fn pdf_path_is_filled_after_creation() {
        let pool = testing::pool().await;
        let pid = problem(&pool).await;
        let draft = create_version(&pool, DocumentKind::Explanation, &pid, "e", "", None)
            .await
            .unwrap();
        assert!(draft.pdf_path.is_empty());

        let compiled = set_pdf_path(&pool, DocumentKind::Explanation, &draft.id, "pdfs/e.pdf")
            .await
            .unwrap();
        assert_eq!(compiled.pdf_path, "pdfs/e.pdf");
        assert_eq!(compiled.version, draft.version);
        assert_eq!(compiled.latex_code, "e");

        assert!(matches!(
            set_pdf_path(&pool, DocumentKind::Problem, &draft.id, "pdfs/x.pdf").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn pdf_paths_cover_both_kinds() {
        let pool = testing::pool().await;
        let pid = problem(&pool).await;
        create_version(&pool, DocumentKind::Problem, &pid, "x", "pdfs/a.pdf", None)
            .await
            .unwrap();
        create_version(&pool, DocumentKind::Problem, &pid, "x", "", None)
            .await
            .unwrap();
        create_version(&pool, DocumentKind::Explanation, &pid, "e", "pdfs/b.pdf", None)
            .await
            .unwrap();

        let mut paths = list_pdf_paths(&pool, &pid).await.unwrap();
        paths.sort();
        assert_eq!(paths, vec!["pdfs/a.pdf", "pdfs/b.pdf"]);
    }
}
