//! # LaTeX 템플릿 쿼리
//!
//! 사용자당 기본 템플릿은 최대 1개이며, DB의 부분 유니크 인덱스
//! (`uq_latex_templates_user_default`)가 이를 강제합니다.
//! 기본 템플릿을 바꾸는 함수는 "기존 기본 해제 → 새 기본 지정"을 한 트랜잭션에서 수행합니다.

use crate::error::AppError;
use crate::models::template::LatexTemplate;
use sqlx::{Sqlite, SqlitePool, Transaction};

const COLUMNS: &str = "id, user_id, name, content, is_default, created_at, updated_at";

/// 사용자 템플릿 목록 (기본 템플릿 먼저, 그다음 최신순)
pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<LatexTemplate>, AppError> {
    let templates = sqlx::query_as::<_, LatexTemplate>(&format!(
        "SELECT {} FROM latex_templates WHERE user_id = ? ORDER BY is_default DESC, created_at DESC",
        COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(templates)
}

pub async fn get_template(pool: &SqlitePool, id: &str) -> Result<Option<LatexTemplate>, AppError> {
    let template = sqlx::query_as::<_, LatexTemplate>(&format!(
        "SELECT {} FROM latex_templates WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(template)
}

pub async fn get_user_default(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<LatexTemplate>, AppError> {
    let template = sqlx::query_as::<_, LatexTemplate>(&format!(
        "SELECT {} FROM latex_templates WHERE user_id = ? AND is_default = 1",
        COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(template)
}

/// 소유자가 없는 시스템 템플릿을 이름으로 찾습니다.
pub async fn get_system_template(
    pool: &SqlitePool,
    name: &str,
) -> Result<Option<LatexTemplate>, AppError> {
    let template = sqlx::query_as::<_, LatexTemplate>(&format!(
        "SELECT {} FROM latex_templates WHERE user_id IS NULL AND name = ? LIMIT 1",
        COLUMNS
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(template)
}

pub async fn create_template(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
    content: &str,
    is_default: bool,
) -> Result<LatexTemplate, AppError> {
    let id = uuid::Uuid::now_v7().to_string();
    let mut tx = pool.begin().await?;

    if is_default {
        clear_default(&mut tx, user_id).await?;
    }

    sqlx::query(
        r#"
        INSERT INTO latex_templates (id, user_id, name, content, is_default)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(name)
    .bind(content)
    .bind(is_default)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_template(pool, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created template".to_string()))
}

/// `None`인 필드는 기존 값을 유지합니다.
/// `is_default = Some(false)`는 이 템플릿의 기본 지정만 해제합니다.
pub async fn update_template(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    name: Option<&str>,
    content: Option<&str>,
    is_default: Option<bool>,
) -> Result<LatexTemplate, AppError> {
    let mut tx = pool.begin().await?;

    if is_default == Some(true) {
        clear_default(&mut tx, user_id).await?;
    }

    sqlx::query(
        r#"
        UPDATE latex_templates SET
            name = COALESCE(?, name),
            content = COALESCE(?, content),
            is_default = COALESCE(?, is_default),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(name)
    .bind(content)
    .bind(is_default)
    .bind(id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_template(pool, id).await?.ok_or(AppError::NotFound)
}

/// 템플릿을 사용자의 기본 템플릿으로 지정합니다. 기존 기본 템플릿은 해제됩니다.
pub async fn set_default(pool: &SqlitePool, id: &str, user_id: &str) -> Result<LatexTemplate, AppError> {
    let mut tx = pool.begin().await?;

    clear_default(&mut tx, user_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE latex_templates
        SET is_default = 1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    // 대상이 없으면 롤백해서 기존 기본 템플릿을 유지
    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound);
    }

    tx.commit().await?;

    get_template(pool, id).await?.ok_or(AppError::NotFound)
}

pub async fn delete_template(pool: &SqlitePool, id: &str, user_id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM latex_templates WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

async fn clear_default(tx: &mut Transaction<'_, Sqlite>, user_id: &str) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE latex_templates
        SET is_default = 0, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE user_id = ? AND is_default = 1
        "#,
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{testing, users};

    async fn defaults(pool: &SqlitePool, user_id: &str) -> Vec<String> {
        list_for_user(pool, user_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.is_default)
            .map(|t| t.id)
            .collect()
    }

    #[tokio::test]
    async fn switching_default_leaves_exactly_one() {
        let pool = testing::pool().await;
        let user = users::create_user(&pool, "u", None, "h").await.unwrap();
        let a = create_template(&pool, &user.id, "A", "{children}", true).await.unwrap();
        let b = create_template(&pool, &user.id, "B", "{children}", false).await.unwrap();

        assert_eq!(defaults(&pool, &user.id).await, vec![a.id.clone()]);

        set_default(&pool, &b.id, &user.id).await.unwrap();
        assert_eq!(defaults(&pool, &user.id).await, vec![b.id.clone()]);

        update_template(&pool, &a.id, &user.id, None, None, Some(true))
            .await
            .unwrap();
        assert_eq!(defaults(&pool, &user.id).await, vec![a.id.clone()]);

        let c = create_template(&pool, &user.id, "C", "x{children}", true).await.unwrap();
        assert_eq!(defaults(&pool, &user.id).await, vec![c.id]);
    }

    #[tokio::test]
    async fn set_default_on_foreign_template_keeps_current_default() {
        let pool = testing::pool().await;
        let alice = users::create_user(&pool, "alice", None, "h").await.unwrap();
        let bob = users::create_user(&pool, "bob", None, "h").await.unwrap();
        let mine = create_template(&pool, &alice.id, "A", "{children}", true).await.unwrap();
        let theirs = create_template(&pool, &bob.id, "B", "{children}", false).await.unwrap();

        assert!(matches!(
            set_default(&pool, &theirs.id, &alice.id).await,
            Err(AppError::NotFound)
        ));
        assert_eq!(defaults(&pool, &alice.id).await, vec![mine.id]);
    }

    #[tokio::test]
    async fn database_rejects_second_default_and_missing_placeholder() {
        let pool = testing::pool().await;
        let user = users::create_user(&pool, "u", None, "h").await.unwrap();
        create_template(&pool, &user.id, "A", "{children}", true).await.unwrap();

        let second_default = sqlx::query(
            "INSERT INTO latex_templates (id, user_id, name, content, is_default) VALUES ('x', ?, 'B', '{children}', 1)",
        )
        .bind(&user.id)
        .execute(&pool)
        .await;
        assert!(second_default.is_err());

        let no_placeholder = sqlx::query(
            "INSERT INTO latex_templates (id, user_id, name, content) VALUES ('y', ?, 'C', 'plain')",
        )
        .bind(&user.id)
        .execute(&pool)
        .await;
        assert!(no_placeholder.is_err());
    }

    #[tokio::test]
    async fn system_template_is_seeded_and_not_listed() {
        let pool = testing::pool().await;
        let user = users::create_user(&pool, "u", None, "h").await.unwrap();

        let system = get_system_template(&pool, "システムデフォルト").await.unwrap().unwrap();
        assert!(system.content.contains("{children}"));
        assert!(list_for_user(&pool, &user.id).await.unwrap().is_empty());
    }
}
