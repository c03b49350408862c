//! # 데이터 모델 모듈
//!
//! DB 행(row) 구조체와 요청/응답 본문 구조체를 정의합니다.
//! - `user`: 사용자와 인증 요청/응답
//! - `problem`: 문제(프로젝트)
//! - `document`: 버전 관리되는 LaTeX 문서 (문제 문서, 해설 공통)
//! - `template`: LaTeX 래퍼 템플릿
//!
//! 하위 모듈의 공개 항목은 `crate::models::Problem`처럼 바로 쓸 수 있도록 재공개합니다.

pub mod document;
pub mod problem;
pub mod template;
pub mod user;

pub use document::*;
pub use problem::*;
pub use template::*;
pub use user::*;
