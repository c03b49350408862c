//! # 문제(프로젝트) 쿼리
//!
//! 휴지통 상태 전이:
//! - 활성 → 삭제됨: `soft_delete` (deleted_at 설정)
//! - 삭제됨 → 활성: `restore` (deleted_at 해제)
//! - 삭제됨 → 영구 삭제: `delete_problem` (문서/해설은 FK CASCADE로 함께 삭제)
//!
//! 상태가 맞지 않으면 영향받은 행이 0이므로 `false`를 반환합니다.

use crate::error::AppError;
use crate::models::problem::Problem;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, user_id, title, original_image_path, solution_notes, deleted_at, created_at, updated_at";

pub async fn create_problem(
    pool: &SqlitePool,
    user_id: &str,
    title: &str,
) -> Result<Problem, AppError> {
    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query("INSERT INTO problems (id, user_id, title) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .execute(pool)
        .await?;

    get_problem(pool, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created problem".to_string()))
}

/// 삭제 여부와 관계없이 ID로 조회합니다. 상태 검사는 호출하는 쪽에서 합니다.
pub async fn get_problem(pool: &SqlitePool, id: &str) -> Result<Option<Problem>, AppError> {
    let problem = sqlx::query_as::<_, Problem>(&format!(
        "SELECT {} FROM problems WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(problem)
}

/// 사용자의 문제 목록.
/// - 활성 목록: 최근 수정순
/// - 휴지통(`trashed = true`): 최근 삭제순
pub async fn list_problems(
    pool: &SqlitePool,
    user_id: &str,
    trashed: bool,
) -> Result<Vec<Problem>, AppError> {
    let sql = if trashed {
        format!(
            "SELECT {} FROM problems WHERE user_id = ? AND deleted_at IS NOT NULL ORDER BY deleted_at DESC",
            COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM problems WHERE user_id = ? AND deleted_at IS NULL ORDER BY updated_at DESC",
            COLUMNS
        )
    };

    let problems = sqlx::query_as::<_, Problem>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(problems)
}

/// `None`인 필드는 기존 값을 유지합니다.
pub async fn update_problem(
    pool: &SqlitePool,
    id: &str,
    title: Option<&str>,
    solution_notes: Option<&str>,
) -> Result<Problem, AppError> {
    sqlx::query(
        r#"
        UPDATE problems SET
            title = COALESCE(?, title),
            solution_notes = COALESCE(?, solution_notes),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(solution_notes)
    .bind(id)
    .execute(pool)
    .await?;

    get_problem(pool, id).await?.ok_or(AppError::NotFound)
}

pub async fn set_original_image(
    pool: &SqlitePool,
    id: &str,
    image_path: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE problems
        SET original_image_path = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(image_path)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// 활성 문제를 휴지통으로 옮깁니다.
pub async fn soft_delete(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE problems SET deleted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 휴지통의 문제를 복원합니다. `updated_at`은 그대로 둡니다.
pub async fn restore(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result =
        sqlx::query("UPDATE problems SET deleted_at = NULL WHERE id = ? AND deleted_at IS NOT NULL")
            .bind(id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// 휴지통에 있는 문제만 영구 삭제합니다.
pub async fn delete_problem(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM problems WHERE id = ? AND deleted_at IS NOT NULL")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
