//! # LaTeX → PDF 컴파일러
//!
//! 완성된 LaTeX 문서를 요청마다 새로 만든 임시 디렉토리에서 외부 TeX 툴체인으로
//! 컴파일하고, 결과 PDF를 `FileStorage`의 `pdfs/` 폴더에 저장합니다.
//!
//! 두 가지 계열을 지원합니다.
//! - `TwoPass` (platex/uplatex): 컴파일러 2회 실행 → DVI 확인 → `dvipdfmx`로 PDF 변환
//! - `SinglePass` (pdflatex/lualatex/xelatex 등): 컴파일러 1회 실행 → PDF 확인
//!
//! 각 외부 프로세스는 설정된 시간 안에 끝나야 하며, 초과하면 프로세스를 종료하고
//! `CompileError::Timeout`을 반환합니다. 임시 디렉토리는 성공/실패와 관계없이 삭제됩니다.

use crate::services::storage::{FileStorage, PDF_FOLDER};
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// 임시 디렉토리 안의 소스 파일 이름
const SOURCE_FILE: &str = "document.tex";
const DVI_FILE: &str = "document.dvi";
const PDF_FILE: &str = "document.pdf";
const LOG_FILE: &str = "document.log";

/// 컴파일러 계열
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerFamily {
    /// DVI를 거치는 일본어 계열 (platex, uplatex)
    TwoPass,
    /// PDF를 직접 출력하는 계열
    SinglePass,
}

impl CompilerFamily {
    /// `LATEX_COMPILER_FAMILY` 값 파싱 ("two-pass" / "single-pass")
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "two-pass" | "twopass" | "dvi" => Some(Self::TwoPass),
            "single-pass" | "singlepass" | "pdf" => Some(Self::SinglePass),
            _ => None,
        }
    }

    /// 명령의 파일 이름으로 계열을 추론합니다. `/usr/bin/uplatex`도 TwoPass.
    pub fn infer(command: &str) -> Self {
        let name = Path::new(command.trim())
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or(command)
            .to_ascii_lowercase();

        if name == "platex" || name == "uplatex" {
            Self::TwoPass
        } else {
            Self::SinglePass
        }
    }
}

/// 실패가 발생한 컴파일 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStage {
    /// TwoPass 계열의 n번째 컴파일러 실행 (1 또는 2)
    LatexPass(u8),
    /// SinglePass 계열의 컴파일러 실행
    Latex,
    /// DVI → PDF 변환
    DviToPdf,
}

impl fmt::Display for CompileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileStage::LatexPass(n) => write!(f, "LaTeX pass {}", n),
            CompileStage::Latex => write!(f, "LaTeX"),
            CompileStage::DviToPdf => write!(f, "DVI to PDF conversion"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    /// 외부 프로세스가 0이 아닌 코드로 종료
    #[error("{stage} failed")]
    Compilation {
        stage: CompileStage,
        stderr: String,
        stdout: String,
        log_tail: Option<String>,
    },

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: CompileStage, secs: u64 },

    /// 프로세스는 성공했지만 기대한 산출물이 없음
    #[error("expected {artifact} was not produced")]
    MissingArtifact {
        artifact: &'static str,
        log_tail: Option<String>,
    },

    #[error("IO error during compilation: {0}")]
    Io(#[from] io::Error),
}

impl CompileError {
    /// 사용자에게 돌려줄 전체 진단 텍스트.
    /// 헤더 한 줄 뒤에 비어 있지 않은 stderr / stdout / 로그 구간만 이어 붙입니다.
    pub fn diagnostic(&self) -> String {
        let mut text = self.to_string();
        match self {
            CompileError::Compilation {
                stderr,
                stdout,
                log_tail,
                ..
            } => {
                push_section(&mut text, "stderr", stderr);
                push_section(&mut text, "stdout", stdout);
                if let Some(log) = log_tail {
                    push_section(&mut text, "log", log);
                }
            }
            CompileError::MissingArtifact {
                log_tail: Some(log),
                ..
            } => push_section(&mut text, "log", log),
            _ => {}
        }
        text
    }
}

fn push_section(text: &mut String, title: &str, body: &str) {
    let body = body.trim();
    if body.is_empty() {
        return;
    }
    text.push_str("\n\n--- ");
    text.push_str(title);
    text.push_str(" ---\n");
    text.push_str(body);
}

/// 컴파일러 설정 (`Config`에서 채워집니다)
#[derive(Debug, Clone)]
pub struct CompilerSettings {
    pub command: String,
    pub family: CompilerFamily,
    pub dvipdf_command: String,
    pub timeout: Duration,
    pub log_tail_lines: usize,
}

pub struct PdfCompiler {
    settings: CompilerSettings,
    storage: FileStorage,
}

impl PdfCompiler {
    pub fn new(settings: CompilerSettings, storage: FileStorage) -> Self {
        Self { settings, storage }
    }

    /// 완성된 LaTeX 문서를 PDF로 컴파일하고 저장소 상대 경로를 반환합니다.
    ///
    /// `name_hint`는 저장 파일명 앞부분에 쓰입니다 (예: "problem_<id>").
    pub async fn compile(&self, document: &str, name_hint: &str) -> Result<String, CompileError> {
        // Drop 시 디렉토리째 삭제
        let workdir = tempfile::Builder::new().prefix("mathtex-").tempdir()?;
        let dir = workdir.path();

        tokio::fs::write(dir.join(SOURCE_FILE), document).await?;

        match self.settings.family {
            CompilerFamily::TwoPass => self.run_two_pass(dir).await?,
            CompilerFamily::SinglePass => self.run_single_pass(dir).await?,
        }

        let pdf = tokio::fs::read(dir.join(PDF_FILE)).await?;
        let saved = self.storage.save(&pdf, PDF_FOLDER, name_hint, "pdf").await?;

        tracing::debug!("Compiled {} ({} bytes) into {}", name_hint, pdf.len(), saved);
        Ok(saved)
    }

    async fn run_two_pass(&self, dir: &Path) -> Result<(), CompileError> {
        let args = ["-kanji=utf8", "-interaction=nonstopmode", SOURCE_FILE];

        // 상호 참조 해결을 위해 2회 실행. 1회차 실패 시 2회차는 실행하지 않습니다.
        for pass in 1..=2u8 {
            let stage = CompileStage::LatexPass(pass);
            let output = self.run(stage, &self.settings.command, &args, dir).await?;
            self.check(stage, output, dir).await?;
        }

        if !dir.join(DVI_FILE).is_file() {
            return Err(CompileError::MissingArtifact {
                artifact: DVI_FILE,
                log_tail: self.log_tail(dir).await,
            });
        }

        let stage = CompileStage::DviToPdf;
        let output = self
            .run(
                stage,
                &self.settings.dvipdf_command,
                &["-o", PDF_FILE, DVI_FILE],
                dir,
            )
            .await?;
        self.check(stage, output, dir).await?;

        self.require_pdf(dir).await
    }

    async fn run_single_pass(&self, dir: &Path) -> Result<(), CompileError> {
        let stage = CompileStage::Latex;
        let output = self
            .run(
                stage,
                &self.settings.command,
                &["-interaction=nonstopmode", SOURCE_FILE],
                dir,
            )
            .await?;
        self.check(stage, output, dir).await?;

        self.require_pdf(dir).await
    }

    async fn require_pdf(&self, dir: &Path) -> Result<(), CompileError> {
        if dir.join(PDF_FILE).is_file() {
            Ok(())
        } else {
            Err(CompileError::MissingArtifact {
                artifact: PDF_FILE,
                log_tail: self.log_tail(dir).await,
            })
        }
    }

    /// 외부 프로세스를 제한 시간 안에 실행합니다.
    /// 시간 초과 시 future가 drop되면서 `kill_on_drop`으로 프로세스가 종료됩니다.
    async fn run(
        &self,
        stage: CompileStage,
        program: &str,
        args: &[&str],
        dir: &Path,
    ) -> Result<Output, CompileError> {
        let child = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.settings.timeout, child).await {
            Ok(output) => Ok(output?),
            Err(_) => {
                tracing::warn!("{} exceeded {:?}, process killed", stage, self.settings.timeout);
                Err(CompileError::Timeout {
                    stage,
                    secs: self.settings.timeout.as_secs(),
                })
            }
        }
    }

    async fn check(
        &self,
        stage: CompileStage,
        output: Output,
        dir: &Path,
    ) -> Result<(), CompileError> {
        if output.status.success() {
            return Ok(());
        }

        Err(CompileError::Compilation {
            stage,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            log_tail: self.log_tail(dir).await,
        })
    }

    /// `document.log`의 마지막 N줄. TeX 로그는 UTF-8이 아닐 수 있어 lossy 디코딩합니다.
    async fn log_tail(&self, dir: &Path) -> Option<String> {
        let bytes = tokio::fs::read(dir.join(LOG_FILE)).await.ok()?;
        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(self.settings.log_tail_lines);
        let tail = lines[start..].join("\n");

        if tail.trim().is_empty() {
            None
        } else {
            Some(tail)
        }
    }
}
