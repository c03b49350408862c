//! # 파일 저장소 서비스
//!
//! 업로드 이미지와 생성된 PDF를 미디어 루트 아래에 저장하고,
//! DB에는 루트 기준 상대 경로(예: "pdfs/problem-0190_20260101120000123456789.pdf")만 기록합니다.
//!
//! - `save()`: 바이트를 새 파일로 저장 (이름 충돌 시 접미사 추가)
//! - `url()`: 상대 경로 → 공개 URL. PDF는 전용 조회 엔드포인트를 거칩니다.
//! - `exists()` / `delete()`: 상대 경로 기준 존재 확인·삭제
//! - `resolve_pdf()`: PDF 조회 요청 경로 검증 (경로 탐색, 확장자, 존재 여부)

use chrono::Utc;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

/// 생성된 PDF가 저장되는 하위 폴더
pub const PDF_FOLDER: &str = "pdfs";
/// 업로드 이미지가 저장되는 하위 폴더
pub const IMAGE_FOLDER: &str = "images";

/// PDF 전용 조회 엔드포인트 접두사 (`routes::latex::get_pdf`)
const PDF_URL_PREFIX: &str = "/api/v1/latex/pdf/";
/// 그 밖의 파일은 정적 미디어 경로로 서빙됩니다 (`main.rs`의 ServeDir).
const MEDIA_URL_PREFIX: &str = "/media/";

/// 같은 타임스탬프로 충돌했을 때 붙여볼 최대 접미사 수
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 상대 경로를 미디어 루트 기준 절대 경로로 변환합니다.
    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }

    /// 바이트를 `<folder>/<hint>_<timestamp>.<ext>`로 저장하고 상대 경로를 반환합니다.
    ///
    /// 타임스탬프는 나노초까지 포함합니다. 그래도 같은 이름이 이미 있으면
    /// `create_new`가 실패하므로 `-1`, `-2` … 접미사를 붙여 다시 시도합니다.
    pub async fn save(
        &self,
        bytes: &[u8],
        folder: &str,
        name_hint: &str,
        extension: &str,
    ) -> io::Result<String> {
        let dir = self.root.join(folder);
        fs::create_dir_all(&dir).await?;

        let stem = file_stem(name_hint);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                format!("{}.{}", stem, extension)
            } else {
                format!("{}-{}.{}", stem, attempt, extension)
            };

            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&file_name))
                .await;

            match opened {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    return Ok(format!("{}/{}", folder, file_name));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("could not find a free file name for {}", stem),
        ))
    }

    /// 상대 경로를 클라이언트가 사용할 URL로 변환합니다.
    pub fn url(&self, relative: &str) -> String {
        let clean = relative.trim_start_matches('/');
        if clean.ends_with(".pdf") {
            format!("{}{}", PDF_URL_PREFIX, clean)
        } else {
            format!("{}{}", MEDIA_URL_PREFIX, clean)
        }
    }

    /// 빈 경로는 "파일 없음"으로 취급합니다.
    pub async fn exists(&self, relative: &str) -> bool {
        if relative.is_empty() {
            return false;
        }
        fs::metadata(self.absolute(relative))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// 파일을 삭제합니다. 이미 없으면 성공으로 취급하고, 삭제에 실패하면 false.
    pub async fn delete(&self, relative: &str) -> bool {
        if relative.is_empty() || !self.exists(relative).await {
            return true;
        }
        match fs::remove_file(self.absolute(relative)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to delete stored file {}: {}", relative, e);
                false
            }
        }
    }

    /// PDF 조회 요청 경로를 검증하고 실제 파일 경로를 반환합니다.
    ///
    /// `..` 구성요소, 절대 경로, `.pdf`가 아닌 파일, 존재하지 않는 파일은 모두 `None`.
    pub async fn resolve_pdf(&self, requested: &str) -> Option<PathBuf> {
        let clean = requested.strip_prefix('/').unwrap_or(requested);
        if clean.is_empty() || clean.starts_with('/') || clean.contains('\\') {
            return None;
        }
        if !clean.ends_with(".pdf") {
            return None;
        }

        let relative = Path::new(clean);
        let only_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !only_normal {
            return None;
        }

        let full = self.root.join(relative);
        match fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => Some(full),
            _ => None,
        }
    }
}

/// 파일명 앞부분: slug 처리한 힌트 + 나노초 타임스탬프
fn file_stem(name_hint: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S%9f");
    let slug = slug::slugify(name_hint);
    if slug.is_empty() {
        timestamp.to_string()
    } else {
        format!("{}_{}", slug, timestamp)
    }
}
