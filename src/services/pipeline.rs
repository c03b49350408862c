//! # 생성 파이프라인
//!
//! 세 파이프라인 모두 마지막에 새 문서 버전 하나를 만듭니다.
//!
//! - OCR: 이미지 저장 → OCR → AI 교정 → 템플릿 래핑 → 문제 문서 버전 생성 → 컴파일
//! - 해설: 최신 확정(없으면 최신) 문제 문서 → AI 해설 → 본문 추출 → 템플릿 래핑 → 컴파일 → 해설 버전 생성
//! - 수동 편집: 사용자가 보낸 LaTeX 그대로 버전 생성 → 컴파일 (래핑 없음)
//!
//! OCR과 수동 편집은 버전을 빈 `pdf_path`로 먼저 저장하므로, 컴파일이 실패해도
//! 소스는 남고 오류만 호출한 쪽으로 전달됩니다. 해설은 컴파일에 성공했을 때만 버전이 생깁니다.
//! 호출한 쪽은 파이프라인 전체가 끝날 때까지 기다립니다.

use crate::{
    db,
    error::AppError,
    models::{
        document::{DocumentKind, RenderRequest, VersionedDocument},
        problem::Problem,
    },
    services::{extract, storage::IMAGE_FOLDER, template},
    state::AppState,
};

/// 업로드 이미지에서 문제 문서의 새 버전을 만듭니다.
pub async fn ocr_to_problem_latex(
    state: &AppState,
    user_id: &str,
    problem: &Problem,
    image: &[u8],
    extension: &str,
) -> Result<VersionedDocument, AppError> {
    tracing::info!("OCR pipeline started for problem {}", problem.id);

    let image_path = state
        .storage
        .save(image, IMAGE_FOLDER, &format!("user_{}", user_id), extension)
        .await?;
    db::problems::set_original_image(&state.pool, &problem.id, &image_path).await?;

    let ocr_text = state
        .ocr
        .recognize(&state.storage.absolute(&image_path))
        .await
        .inspect_err(|e| tracing::warn!("OCR failed for problem {}: {}", problem.id, e))?;

    let body = state
        .ai
        .correct_latex(&ocr_text, image)
        .await
        .inspect_err(|e| tracing::warn!("AI correction failed for problem {}: {}", problem.id, e))?;

    let tpl = template::resolve(&state.pool, user_id).await?;
    let document = template::wrap(&body, &tpl);

    let doc = store_then_compile(state, DocumentKind::Problem, &problem.id, &document, None).await?;
    tracing::info!(
        "OCR pipeline finished for problem {}: version {} ({})",
        problem.id,
        doc.version,
        doc.pdf_path
    );
    Ok(doc)
}

/// 문제 문서로부터 AI 해설의 새 버전을 만듭니다.
///
/// 문제 문서가 하나도 없으면 `NotFound`.
pub async fn generate_explanation(
    state: &AppState,
    user_id: &str,
    problem: &Problem,
) -> Result<VersionedDocument, AppError> {
    let source =
        db::documents::latest_confirmed_or_latest(&state.pool, DocumentKind::Problem, &problem.id)
            .await?
            .ok_or(AppError::NotFound)?;

    tracing::info!(
        "Explanation pipeline started for problem {} from version {}",
        problem.id,
        source.version
    );

    let notes = Some(problem.solution_notes.trim()).filter(|n| !n.is_empty());
    let response = state
        .ai
        .generate_explanation(&source.latex_code, notes)
        .await
        .inspect_err(|e| tracing::warn!("Explanation generation failed for problem {}: {}", problem.id, e))?;

    let body = extract::extract_body(&response);
    let tpl = template::resolve(&state.pool, user_id).await?;
    let document = template::wrap(&body, &tpl);

    let doc = compile_then_store(
        state,
        DocumentKind::Explanation,
        &problem.id,
        &document,
        Some(&source.id),
    )
    .await?;
    tracing::info!(
        "Explanation pipeline finished for problem {}: version {} ({})",
        problem.id,
        doc.version,
        doc.pdf_path
    );
    Ok(doc)
}

/// 사용자가 직접 편집한 LaTeX를 렌더링해 새 버전으로 저장합니다.
///
/// `latex_document_id`가 있으면 같은 문제의 같은 종류 문서여야 합니다.
/// 수동으로 만든 해설은 현재 최신 확정(없으면 최신) 문제 문서를 원본으로 기록합니다.
pub async fn render_manual(
    state: &AppState,
    problem: &Problem,
    req: &RenderRequest,
) -> Result<VersionedDocument, AppError> {
    if req.latex_code.trim().is_empty() {
        return Err(AppError::BadRequest("latex_code cannot be empty".to_string()));
    }

    if let Some(base_id) = &req.latex_document_id {
        let base = db::documents::get_document(&state.pool, req.document_type, base_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if base.problem_id != problem.id {
            return Err(AppError::BadRequest(
                "latex_document_id does not belong to this problem".to_string(),
            ));
        }
    }

    let source_id = match req.document_type {
        DocumentKind::Problem => None,
        DocumentKind::Explanation => {
            db::documents::latest_confirmed_or_latest(&state.pool, DocumentKind::Problem, &problem.id)
                .await?
                .map(|d| d.id)
        }
    };

    let doc = store_then_compile(
        state,
        req.document_type,
        &problem.id,
        &req.latex_code,
        source_id.as_deref(),
    )
    .await?;
    tracing::info!(
        "Manual render for problem {}: {:?} version {}",
        problem.id,
        req.document_type,
        doc.version
    );
    Ok(doc)
}

/// 버전을 먼저 저장한 뒤 컴파일합니다.
///
/// 컴파일이 실패하면 버전은 `pdf_path`가 빈 채로 남고 컴파일 오류를 그대로 반환합니다.
async fn store_then_compile(
    state: &AppState,
    kind: DocumentKind,
    problem_id: &str,
    document: &str,
    source_id: Option<&str>,
) -> Result<VersionedDocument, AppError> {
    let draft =
        db::documents::create_version(&state.pool, kind, problem_id, document, "", source_id).await?;

    let pdf_path = state
        .compiler
        .compile(document, &kind.file_hint(problem_id))
        .await
        .inspect_err(|e| {
            tracing::warn!(
                "Compilation failed for problem {} ({:?} version {} kept without PDF): {}",
                problem_id,
                kind,
                draft.version,
                e
            )
        })?;

    match db::documents::set_pdf_path(&state.pool, kind, &draft.id, &pdf_path).await {
        Ok(doc) => Ok(doc),
        Err(e) => {
            discard_pdf(state, &pdf_path).await;
            Err(e)
        }
    }
}

/// 컴파일에 성공했을 때만 버전을 만듭니다.
async fn compile_then_store(
    state: &AppState,
    kind: DocumentKind,
    problem_id: &str,
    document: &str,
    source_id: Option<&str>,
) -> Result<VersionedDocument, AppError> {
    let pdf_path = state
        .compiler
        .compile(document, &kind.file_hint(problem_id))
        .await
        .inspect_err(|e| tracing::warn!("Compilation failed for problem {}: {}", problem_id, e))?;

    match db::documents::create_version(&state.pool, kind, problem_id, document, &pdf_path, source_id)
        .await
    {
        Ok(doc) => Ok(doc),
        Err(e) => {
            discard_pdf(state, &pdf_path).await;
            Err(e)
        }
    }
}

// 어떤 버전도 가리키지 않게 된 PDF 정리 (삭제 실패는 storage가 로그로 남김)
async fn discard_pdf(state: &AppState, pdf_path: &str) {
    if state.storage.delete(pdf_path).await {
        tracing::debug!("Removed orphaned PDF {}", pdf_path);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::db::{problems, testing, users};
    use crate::services::{
        ai::{AiError, AiService},
        latex::{CompilerFamily, CompilerSettings, PdfCompiler},
        ocr::{OcrEngine, OcrError},
        storage::FileStorage,
    };
    use async_trait::async_trait;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// 호출 인자를 기록하고 고정 응답을 돌려주는 AI 대역
    #[derive(Default)]
    struct RecordingAi {
        explanation_reply: String,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl AiService for RecordingAi {
        async fn correct_latex(&self, ocr_text: &str, _image: &[u8]) -> Result<String, AiError> {
            Ok(format!("corrected: {}", ocr_text))
        }

        async fn generate_explanation(
            &self,
            problem_latex: &str,
            solution_notes: Option<&str>,
        ) -> Result<String, AiError> {
            self.seen
                .lock()
                .unwrap()
                .push((problem_latex.to_string(), solution_notes.map(str::to_string)));
            Ok(self.explanation_reply.clone())
        }
    }

    struct FixedOcr;

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
            assert!(image_path.is_file());
            Ok("x^2".to_string())
        }
    }

    struct Fixture {
        state: AppState,
        ai: Arc<RecordingAi>,
        _media: TempDir,
        _bin: TempDir,
    }

    async fn fixture(compiler_body: &str, explanation_reply: &str) -> Fixture {
        let media = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let script = bin.path().join("latex");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", compiler_body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let storage = FileStorage::new(media.path());
        let compiler = PdfCompiler::new(
            CompilerSettings {
                command: script.to_string_lossy().into_owned(),
                family: CompilerFamily::SinglePass,
                dvipdf_command: String::new(),
                timeout: Duration::from_secs(10),
                log_tail_lines: 200,
            },
            storage.clone(),
        );
        let ai = Arc::new(RecordingAi {
            explanation_reply: explanation_reply.to_string(),
            ..Default::default()
        });

        Fixture {
            state: AppState {
                pool: testing::pool().await,
                jwt_secret: "test".to_string(),
                storage,
                compiler: Arc::new(compiler),
                ai: ai.clone(),
                ocr: Arc::new(FixedOcr),
                max_upload_bytes: 1024 * 1024,
            },
            ai,
            _media: media,
            _bin: bin,
        }
    }

    async fn problem(state: &AppState) -> (String, Problem) {
        let user = users::create_user(&state.pool, "u", None, "h").await.unwrap();
        let problem = problems::create_problem(&state.pool, &user.id, "p").await.unwrap();
        (user.id, problem)
    }

    #[tokio::test]
    async fn ocr_pipeline_wraps_with_system_template_and_records_image() {
        let f = fixture("cp document.tex document.pdf", "").await;
        let (user_id, problem) = problem(&f.state).await;

        let doc = ocr_to_problem_latex(&f.state, &user_id, &problem, b"\x89PNG", "png")
            .await
            .unwrap();

        assert_eq!(doc.version, 1);
        assert!(doc.latex_code.contains("\\documentclass{jsarticle}"));
        assert!(doc.latex_code.contains("corrected: x^2"));
        assert!(!doc.latex_code.contains("{children}"));
        assert!(f.state.storage.exists(&doc.pdf_path).await);

        let stored = problems::get_problem(&f.state.pool, &problem.id).await.unwrap().unwrap();
        assert!(stored.original_image_path.starts_with("images/user-"));
    }

    #[tokio::test]
    async fn explanation_uses_confirmed_source_and_notes() {
        let reply = "```latex\n\\documentclass{article}\n\\begin{document}\n解説本文\n\\end{document}\n```";
        let f = fixture("cp document.tex document.pdf", reply).await;
        let (user_id, problem) = problem(&f.state).await;

        let v1 = db::documents::create_version(&f.state.pool, DocumentKind::Problem, &problem.id, "first", "", None)
            .await
            .unwrap();
        db::documents::create_version(&f.state.pool, DocumentKind::Problem, &problem.id, "second", "", None)
            .await
            .unwrap();
        db::documents::confirm(&f.state.pool, DocumentKind::Problem, &problem.id, 1)
            .await
            .unwrap();
        let problem = problems::update_problem(&f.state.pool, &problem.id, None, Some("  置換する "))
            .await
            .unwrap();

        let doc = generate_explanation(&f.state, &user_id, &problem).await.unwrap();

        assert_eq!(doc.source_problem_latex_id.as_deref(), Some(v1.id.as_str()));
        assert!(doc.latex_code.contains("解説本文"));
        assert!(!doc.latex_code.contains("\\documentclass{article}"));
        let seen = f.ai.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![("first".to_string(), Some("置換する".to_string()))]);
    }

    #[tokio::test]
    async fn explanation_without_problem_document_is_not_found() {
        let f = fixture("exit 0", "x").await;
        let (user_id, problem) = problem(&f.state).await;

        assert!(matches!(
            generate_explanation(&f.state, &user_id, &problem).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn failed_compile_keeps_source_without_pdf() {
        let f = fixture("echo '! Missing $ inserted.'\nexit 1", "").await;
        let (_, problem) = problem(&f.state).await;
        let latex = "\\documentclass{article}\\begin{document}$x\\end{document}";
        let req = RenderRequest {
            problem_id: problem.id.clone(),
            document_type: DocumentKind::Problem,
            latex_document_id: None,
            latex_code: latex.to_string(),
        };

        let err = render_manual(&f.state, &problem, &req).await.unwrap_err();
        assert!(matches!(err, AppError::Compile(_)));

        let versions = db::documents::history(&f.state.pool, DocumentKind::Problem, &problem.id)
            .await
            .unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, 1);
        assert_eq!(versions[0].latex_code, latex);
        assert!(versions[0].pdf_path.is_empty());
        assert!(!versions[0].is_confirmed);
    }

    #[tokio::test]
    async fn failed_ocr_compile_keeps_corrected_source() {
        let f = fixture("exit 1", "").await;
        let (user_id, problem) = problem(&f.state).await;

        let err = ocr_to_problem_latex(&f.state, &user_id, &problem, b"\x89PNG", "png")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Compile(_)));

        let kept = db::documents::latest(&f.state.pool, DocumentKind::Problem, &problem.id)
            .await
            .unwrap()
            .unwrap();
        assert!(kept.latex_code.contains("corrected: x^2"));
        assert!(kept.pdf_path.is_empty());
    }

    #[tokio::test]
    async fn failed_explanation_compile_creates_no_version() {
        let f = fixture("exit 1", "解説").await;
        let (user_id, problem) = problem(&f.state).await;
        db::documents::create_version(&f.state.pool, DocumentKind::Problem, &problem.id, "p", "", None)
            .await
            .unwrap();

        assert!(matches!(
            generate_explanation(&f.state, &user_id, &problem).await,
            Err(AppError::Compile(_))
        ));
        assert!(db::documents::history(&f.state.pool, DocumentKind::Explanation, &problem.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn pdf_is_removed_when_version_cannot_be_stored() {
        let f = fixture("cp document.tex document.pdf", "解説").await;
        let (user_id, problem) = problem(&f.state).await;
        db::documents::create_version(&f.state.pool, DocumentKind::Problem, &problem.id, "p", "", None)
            .await
            .unwrap();
        // 해설 삽입만 실패하도록 테이블을 제거
        sqlx::query("DROP TABLE explanations")
            .execute(&f.state.pool)
            .await
            .unwrap();

        assert!(generate_explanation(&f.state, &user_id, &problem).await.is_err());

        let pdfs = f.state.storage.absolute("pdfs");
        let leftover = std::fs::read_dir(&pdfs)
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn manual_render_checks_base_document_owner() {
        let f = fixture("cp document.tex document.pdf", "").await;
        let (user_id, problem) = problem(&f.state).await;
        let other = problems::create_problem(&f.state.pool, &user_id, "other").await.unwrap();
        let foreign = db::documents::create_version(&f.state.pool, DocumentKind::Problem, &other.id, "x", "", None)
            .await
            .unwrap();

        let mut req = RenderRequest {
            problem_id: problem.id.clone(),
            document_type: DocumentKind::Problem,
            latex_document_id: Some(foreign.id),
            latex_code: "body".to_string(),
        };
        assert!(matches!(
            render_manual(&f.state, &problem, &req).await,
            Err(AppError::BadRequest(_))
        ));

        req.latex_document_id = Some("missing".to_string());
        assert!(matches!(
            render_manual(&f.state, &problem, &req).await,
            Err(AppError::NotFound)
        ));

        req.latex_document_id = None;
        req.latex_code = "   ".to_string();
        assert!(matches!(
            render_manual(&f.state, &problem, &req).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn manual_explanation_records_current_problem_source() {
        let f = fixture("cp document.tex document.pdf", "").await;
        let (_, problem) = problem(&f.state).await;
        let source = db::documents::create_version(&f.state.pool, DocumentKind::Problem, &problem.id, "p", "", None)
            .await
            .unwrap();

        let req = RenderRequest {
            problem_id: problem.id.clone(),
            document_type: DocumentKind::Explanation,
            latex_document_id: None,
            latex_code: "hand written".to_string(),
        };
        let doc = render_manual(&f.state, &problem, &req).await.unwrap();

        assert_eq!(doc.version, 1);
        assert_eq!(doc.latex_code, "hand written");
        assert_eq!(doc.source_problem_latex_id, Some(source.id));
    }
}
