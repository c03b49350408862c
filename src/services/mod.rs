//! # 서비스 계층
//!
//! - `storage`: 미디어 루트 아래 파일 저장, URL 변환, PDF 경로 검증
//! - `latex`: LaTeX → PDF 컴파일 (2-pass / 1-pass)
//! - `template`: 템플릿 결정과 본문 래핑
//! - `extract`: AI 응답에서 LaTeX 본문만 추출
//! - `ai`, `ocr`: 외부 협력자 (AI 텍스트 서비스, OCR 엔진)
//! - `pipeline`: 위 구성요소를 조합해 새 문서 버전을 만드는 세 가지 파이프라인

pub mod ai;
pub mod extract;
pub mod latex;
pub mod ocr;
pub mod pipeline;
pub mod storage;
pub mod template;
