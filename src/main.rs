//! # mathtex 웹 서버 진입점
//!
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 연결 풀 생성과 마이그레이션
//! 4. 미디어 디렉토리 생성
//! 5. 컴파일러 / OCR / AI 협력자 구성
//! 6. API 라우터 설정 후 HTTP 서버 시작

use anyhow::Result;
use axum::Router;
use mathtex::{
    config::Config,
    db, routes,
    services::{
        ai::OpenAiClient,
        latex::{CompilerSettings, PdfCompiler},
        ocr::CommandOcr,
        storage::FileStorage,
    },
    state::AppState,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mathtex=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting mathtex server on {}:{}", config.host, config.port);

    let pool = db::connect(&config.database_url, 5).await?;

    tracing::info!("Running database migrations...");
    db::migrate(&pool).await?;

    tokio::fs::create_dir_all(&config.media_root).await?;
    let storage = FileStorage::new(&config.media_root);

    tracing::info!(
        "LaTeX compiler: {} ({:?}), timeout {:?}",
        config.latex_command,
        config.latex_family,
        config.latex_timeout
    );
    let compiler = PdfCompiler::new(
        CompilerSettings {
            command: config.latex_command.clone(),
            family: config.latex_family,
            dvipdf_command: config.dvipdf_command.clone(),
            timeout: config.latex_timeout,
            log_tail_lines: config.latex_log_tail_lines,
        },
        storage.clone(),
    );

    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set, OCR correction and explanations will fail");
    }
    let ai = OpenAiClient::new(
        config.openai_api_key.clone(),
        &config.openai_base_url,
        &config.openai_model,
    );
    let ocr = CommandOcr::new(&config.ocr_command, config.ocr_timeout);

    let state = AppState {
        pool,
        jwt_secret: config.jwt_secret.clone(),
        storage,
        compiler: Arc::new(compiler),
        ai: Arc::new(ai),
        ocr: Arc::new(ocr),
        max_upload_bytes: config.max_upload_bytes,
    };

    // 개발 환경 기준으로 모든 출처 허용
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/v1", routes::api_router(state))
        .nest_service("/media", ServeDir::new(&config.media_root))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
