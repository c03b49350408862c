//! # 미들웨어 / 추출기
//!
//! - `auth`: Bearer 액세스 토큰 발급·검증과 `AuthUser` 추출기

pub mod auth;
