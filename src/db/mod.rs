//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 라우트 핸들러와 파이프라인은 이 모듈의 함수를 통해서만 DB에 접근합니다.
//!
//! 각 하위 모듈:
//! - `users`: 사용자 조회/생성
//! - `problems`: 문제(프로젝트) CRUD와 휴지통 상태 전이
//! - `documents`: 문제 문서/해설 공통 버전 관리 (생성, 확정, 이력, 최신 확정본 조회)
//! - `templates`: LaTeX 템플릿 CRUD와 기본 템플릿 지정

pub mod documents;
pub mod problems;
pub mod templates;
pub mod users;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// SQLite 연결 풀을 만듭니다.
///
/// 외래 키(`ON DELETE CASCADE`, `ON DELETE SET NULL`)는 연결마다 켜야 동작하므로
/// 연결 옵션에서 `foreign_keys(true)`를 지정합니다.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// `migrations/` 디렉토리의 SQL 파일을 순서대로 적용합니다.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// 마이그레이션이 적용된 인메모리 DB.
    /// 인메모리 DB는 연결마다 별개이므로 연결 1개로 제한합니다.
    pub async fn pool() -> SqlitePool {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        migrate(&pool).await.unwrap();
        pool
    }

    /// 동시성 테스트용 파일 DB (여러 연결이 같은 DB를 공유)
    pub async fn file_pool(dir: &tempfile::TempDir) -> SqlitePool {
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let pool = connect(&url, 8).await.unwrap();
        migrate(&pool).await.unwrap();
        pool
    }
}
