//! # 공유 애플리케이션 상태
//!
//! 모든 핸들러가 `State<AppState>`로 받는 의존성 묶음입니다.
//! OCR 엔진과 AI 서비스는 트레이트 객체로 보관하므로 테스트에서 대역으로 바꿀 수 있습니다.

use crate::services::{ai::AiService, latex::PdfCompiler, ocr::OcrEngine, storage::FileStorage};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt_secret: String,
    pub storage: FileStorage,
    pub compiler: Arc<PdfCompiler>,
    pub ai: Arc<dyn AiService>,
    pub ocr: Arc<dyn OcrEngine>,
    /// OCR 이미지 업로드 최대 크기
    pub max_upload_bytes: usize,
}
