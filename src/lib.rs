//! # mathtex
//!
//! 손글씨 수학 문제 사진을 OCR + AI 교정으로 LaTeX로 옮기고, 템플릿에 감싸 PDF로 렌더링하며,
//! 문제 문서와 해설을 버전 단위로 관리하는 HTTP 서버입니다.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
