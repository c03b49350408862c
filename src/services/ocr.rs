//! # OCR 엔진
//!
//! 이미지 → 원문 텍스트 인식은 외부 명령(기본값: pix2text CLI)에 맡깁니다.
//! 명령줄은 `OCR_COMMAND`로 바꿀 수 있고, `{image}` 토큰이 이미지 경로로 치환됩니다.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR command is empty")]
    EmptyCommand,

    #[error("failed to run OCR command: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR timed out after {0}s")]
    Timeout(u64),

    #[error("OCR command failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError>;
}

const IMAGE_TOKEN: &str = "{image}";

pub struct CommandOcr {
    command_line: String,
    timeout: Duration,
}

impl CommandOcr {
    pub fn new(command_line: &str, timeout: Duration) -> Self {
        Self {
            command_line: command_line.to_string(),
            timeout,
        }
    }

    /// 공백으로 나눈 명령줄에 이미지 경로를 넣습니다. 토큰이 없으면 마지막 인자로 붙입니다.
    fn argv(&self, image_path: &Path) -> Result<Vec<String>, OcrError> {
        let image = image_path.to_string_lossy();
        let mut argv: Vec<String> = self
            .command_line
            .split_whitespace()
            .map(|arg| arg.replace(IMAGE_TOKEN, &image))
            .collect();

        if argv.is_empty() {
            return Err(OcrError::EmptyCommand);
        }
        if !self.command_line.contains(IMAGE_TOKEN) {
            argv.push(image.into_owned());
        }
        Ok(argv)
    }
}

#[async_trait]
impl OcrEngine for CommandOcr {
    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        let argv = self.argv(image_path)?;
        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| OcrError::Timeout(self.timeout.as_secs()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
