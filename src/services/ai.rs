//! # AI 텍스트 서비스
//!
//! OCR 결과 교정과 해설 생성을 담당하는 외부 협력자입니다.
//! 파이프라인은 `AiService` 트레이트에만 의존하고, 운영 환경에서는
//! OpenAI 호환 Chat Completions API를 호출하는 `OpenAiClient`를 사용합니다.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,

    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI service returned an empty response")]
    EmptyResponse,
}

#[async_trait]
pub trait AiService: Send + Sync {
    /// OCR 원문과 원본 이미지를 보고 LaTeX 본문을 교정합니다.
    async fn correct_latex(&self, ocr_text: &str, image: &[u8]) -> Result<String, AiError>;

    /// 문제 LaTeX(와 선택적 풀이 메모)로 해설 LaTeX를 생성합니다.
    async fn generate_explanation(
        &self,
        problem_latex: &str,
        solution_notes: Option<&str>,
    ) -> Result<String, AiError>;
}

const CORRECTION_SYSTEM_PROMPT: &str = "あなたは数学の問題文をLaTeXに清書する専門家です。\
OCRの認識結果と元画像を照合し、誤認識を修正したLaTeXの本文のみを出力してください。\
\\documentclass や \\begin{document} などの文書構造は含めないでください。";

const EXPLANATION_SYSTEM_PROMPT: &str = "あなたは数学の講師です。\
与えられた問題に対して、生徒が理解できる丁寧な解説をLaTeXの本文として書いてください。\
文書構造(プリアンブル)は含めないでください。";

const CORRECTION_TEMPERATURE: f32 = 0.1;
const EXPLANATION_TEMPERATURE: f32 = 0.3;

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: Option<String>, base_url: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    async fn chat(&self, messages: Value, temperature: f32) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "temperature": temperature,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(AiError::EmptyResponse)?;

        tracing::debug!("AI response received ({} chars)", content.len());
        Ok(content.to_string())
    }
}

#[async_trait]
impl AiService for OpenAiClient {
    async fn correct_latex(&self, ocr_text: &str, image: &[u8]) -> Result<String, AiError> {
        let data_url = format!("data:{};base64,{}", image_mime(image), STANDARD.encode(image));
        let messages = json!([
            { "role": "system", "content": CORRECTION_SYSTEM_PROMPT },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": correction_prompt(ocr_text) },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }
        ]);

        self.chat(messages, CORRECTION_TEMPERATURE).await
    }

    async fn generate_explanation(
        &self,
        problem_latex: &str,
        solution_notes: Option<&str>,
    ) -> Result<String, AiError> {
        let messages = json!([
            { "role": "system", "content": EXPLANATION_SYSTEM_PROMPT },
            { "role": "user", "content": explanation_prompt(problem_latex, solution_notes) }
        ]);

        self.chat(messages, EXPLANATION_TEMPERATURE).await
    }
}

fn correction_prompt(ocr_text: &str) -> String {
    format!("以下はOCRの認識結果です。画像と照合して修正してください。\n\n{}", ocr_text)
}

fn explanation_prompt(problem_latex: &str, solution_notes: Option<&str>) -> String {
    let mut prompt = format!("次の問題の解説を作成してください。\n\n{}", problem_latex);
    if let Some(notes) = solution_notes.map(str::trim).filter(|n| !n.is_empty()) {
        prompt.push_str("\n\n解法の参考情報:\n");
        prompt.push_str(notes);
    }
    prompt
}

/// JPEG 시그니처(FF D8)만 구분하고 나머지는 PNG로 취급합니다.
fn image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        "image/jpeg"
    } else {
        "image/png"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_section_only_when_notes_present() {
        assert!(!explanation_prompt("x", None).contains("解法の参考情報"));
        assert!(!explanation_prompt("x", Some("   ")).contains("解法の参考情報"));
        assert!(explanation_prompt("x", Some(" 置換積分 ")).ends_with("解法の参考情報:\n置換積分"));
    }

    #[test]
    fn mime_is_sniffed_from_signature() {
        assert_eq!(image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(image_mime(b"\x89PNG\r\n"), "image/png");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = OpenAiClient::new(None, "http://127.0.0.1:9", "gpt-4o");
        let err = client.generate_explanation("x", None).await.unwrap_err();
        assert!(matches!(err, AiError::MissingApiKey));
    }
}
