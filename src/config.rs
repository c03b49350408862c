//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수(`.env` 포함)에서 서버 설정값을 읽어옵니다.
//!
//! 필수 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로
//! - `JWT_SECRET`: 액세스 토큰 서명 비밀키
//!
//! 나머지는 기본값이 있습니다. LaTeX 툴체인 관련 항목은 `LATEX_*`,
//! OCR/AI 협력자 관련 항목은 `OCR_*`, `OPENAI_*` 접두사를 사용합니다.

use crate::services::latex::CompilerFamily;
use std::env;
use std::time::Duration;

/// 애플리케이션 전체 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 URL (예: "sqlite:data/mathtex.db")
    pub database_url: String,
    /// 액세스 토큰 서명/검증 비밀키
    pub jwt_secret: String,
    /// 업로드 이미지와 생성된 PDF가 저장되는 루트 디렉토리
    pub media_root: String,
    pub host: String,
    pub port: u16,
    /// LaTeX 컴파일러 명령 (기본값: "platex")
    pub latex_command: String,
    /// 컴파일러 계열. `LATEX_COMPILER_FAMILY`가 없으면 명령 이름으로 추론합니다.
    pub latex_family: CompilerFamily,
    /// DVI → PDF 변환기 명령 (2-pass 계열에서만 사용)
    pub dvipdf_command: String,
    /// 외부 프로세스 1회 실행당 제한 시간
    pub latex_timeout: Duration,
    /// 컴파일 실패 시 첨부할 로그 파일의 마지막 줄 수
    pub latex_log_tail_lines: usize,
    /// OCR 명령줄. `{image}` 자리에 이미지 절대 경로가 들어갑니다.
    pub ocr_command: String,
    pub ocr_timeout: Duration,
    /// 없으면 AI 호출이 업스트림 에러로 실패합니다.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    /// OCR 업로드 최대 크기 (바이트)
    pub max_upload_bytes: usize,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`이 없으면 `VarError`를 반환합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        let latex_command = env::var("LATEX_COMMAND").unwrap_or_else(|_| "platex".to_string());

        // 명시적 설정이 우선, 파싱할 수 없는 값이면 명령 이름으로 추론
        let latex_family = env::var("LATEX_COMPILER_FAMILY")
            .ok()
            .and_then(|v| CompilerFamily::parse(&v))
            .unwrap_or_else(|| CompilerFamily::infer(&latex_command));

        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            media_root: env::var("MEDIA_ROOT").unwrap_or_else(|_| "data/media".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3000),
            latex_command,
            latex_family,
            dvipdf_command: env::var("DVIPDF_COMMAND").unwrap_or_else(|_| "dvipdfmx".to_string()),
            latex_timeout: Duration::from_secs(parse_or("LATEX_TIMEOUT_SECS", 30)),
            latex_log_tail_lines: parse_or("LATEX_LOG_TAIL_LINES", 200),
            ocr_command: env::var("OCR_COMMAND")
                .unwrap_or_else(|_| "p2t predict --text-formula -i {image}".to_string()),
            ocr_timeout: Duration::from_secs(parse_or("OCR_TIMEOUT_SECS", 120)),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
        })
    }
}

/// 환경변수를 숫자로 파싱하고, 없거나 잘못된 값이면 기본값을 사용합니다.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
