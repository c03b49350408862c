//! # AI 응답 본문 추출
//!
//! AI가 생성한 해설 텍스트에서 마크다운 코드 펜스와 문서 골격
//! (`\documentclass`, `\usepackage`, `\begin{document}` …)을 걷어내고
//! 템플릿에 끼워 넣을 본문만 남깁니다.
//!
//! 줄 단위 스캐너는 세 가지 상태(`Preamble` → `Body` → `Done`)를 가진 작은 상태 기계이며,
//! 각 줄은 먼저 `classify()`로 분류된 뒤 상태 전이 규칙에 따라 유지/폐기됩니다.

use regex::Regex;
use std::sync::LazyLock;

/// ```` ```latex … ``` ```` 또는 ```` ``` … ``` ```` (첫 번째 블록만 사용)
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:latex)?\s*\n?(.*?)\n?```").expect("fence pattern is valid")
});

/// 프리앰블에서 건너뛰는 명령 접두사 (대소문자 무시)
const PREAMBLE_DIRECTIVES: [&str; 5] = [
    "\\documentclass",
    "\\usepackage",
    "\\geometry",
    "\\pagestyle",
    "\\setlength",
];

const BEGIN_DOCUMENT: &str = "\\begin{document}";
const END_DOCUMENT: &str = "\\end{document}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Preamble,
    Body,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    PreambleDirective,
    BeginDocument,
    EndDocument,
    Content,
}

/// 앞뒤 공백을 제거한 줄을 분류합니다.
pub fn classify(line: &str) -> LineClass {
    let trimmed = line.trim();
    if starts_with_ignore_case(trimmed, BEGIN_DOCUMENT) {
        LineClass::BeginDocument
    } else if starts_with_ignore_case(trimmed, END_DOCUMENT) {
        LineClass::EndDocument
    } else if PREAMBLE_DIRECTIVES
        .iter()
        .any(|d| starts_with_ignore_case(trimmed, d))
    {
        LineClass::PreambleDirective
    } else {
        LineClass::Content
    }
}

/// 상태 전이. 두 번째 값은 현재 줄을 결과에 남길지 여부입니다.
///
/// 프리앰블 상태의 일반 줄은 버려집니다. 본문은 `\begin{document}` 이후에만 시작됩니다.
pub fn step(state: ScanState, class: LineClass) -> (ScanState, bool) {
    match (state, class) {
        (ScanState::Done, _) => (ScanState::Done, false),
        (_, LineClass::EndDocument) => (ScanState::Done, false),
        (ScanState::Preamble, LineClass::BeginDocument) => (ScanState::Body, false),
        (ScanState::Preamble, _) => (ScanState::Preamble, false),
        (ScanState::Body, _) => (ScanState::Body, true),
    }
}

/// 코드 펜스 안쪽을 꺼내고(없으면 전체 trim), 문서 골격을 제거한 본문을 반환합니다.
pub fn extract_body(response: &str) -> String {
    let unfenced = match FENCE.captures(response).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => response.trim(),
    };

    strip_document_scaffolding(unfenced)
}

/// 문서 골격 제거. 남는 줄이 없으면 이미 본문만 있던 것으로 보고 원본(trim)을 그대로 반환합니다.
pub fn strip_document_scaffolding(latex: &str) -> String {
    let original = latex.trim();
    let mut state = ScanState::Preamble;
    let mut kept = Vec::new();

    for line in original.lines() {
        let (next, keep) = step(state, classify(line));
        if keep {
            kept.push(line);
        }
        state = next;
        if state == ScanState::Done {
            break;
        }
    }

    let body = kept.join("\n");
    let body = body.trim();
    if body.is_empty() {
        original.to_string()
    } else {
        body.to_string()
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_full_document_reduces_to_body() {
        let input = "```latex\n\\documentclass{article}\n\\begin{document}\nHello\n\\end{document}\n```";
        assert_eq!(extract_body(input), "Hello");
    }

    #[test]
    fn bare_body_is_returned_unchanged() {
        let body = "\\section*{解説}\n$x^2 + 1 = 0$ より $x = \\pm i$.";
        let once = extract_body(body);
        assert_eq!(once, body);
        assert_eq!(extract_body(&once), once);
    }

    #[test]
    fn text_around_the_fence_is_ignored() {
        let input = "Here you go:\n```\n\\begin{document}\nA\n\nB\n\\end{document}\n```\nThanks!";
        assert_eq!(extract_body(input), "A\n\nB");
    }

    #[test]
    fn lines_after_end_document_are_dropped() {
        let input = "\\begin{document}\nkept\n\\end{document}\nafter";
        assert_eq!(extract_body(input), "kept");
    }

    #[test]
    fn directives_are_matched_case_insensitively() {
        let input = "\\DocumentClass{jsarticle}\n  \\UsePackage{amsmath}\n\\BEGIN{document}\nbody\n\\END{document}";
        assert_eq!(extract_body(input), "body");
    }

    #[test]
    fn preamble_only_input_falls_back_to_original() {
        let input = "\\documentclass{article}\n\\usepackage{amsmath}";
        assert_eq!(extract_body(input), input);
    }

    #[test]
    fn classification_and_transitions() {
        assert_eq!(classify("  \\usepackage{x}"), LineClass::PreambleDirective);
        assert_eq!(classify("\\begin{document}"), LineClass::BeginDocument);
        assert_eq!(classify("\\begin{align}"), LineClass::Content);
        assert_eq!(classify("\\end{document}"), LineClass::EndDocument);

        assert_eq!(
            step(ScanState::Preamble, LineClass::Content),
            (ScanState::Preamble, false)
        );
        assert_eq!(
            step(ScanState::Body, LineClass::PreambleDirective),
            (ScanState::Body, true)
        );
        assert_eq!(
            step(ScanState::Preamble, LineClass::EndDocument),
            (ScanState::Done, false)
        );
    }
}
