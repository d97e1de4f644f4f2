//! # 프롬프트
//!
//! 임상 문서 교정 모델에 보내는 프롬프트입니다.
//!
//! 두 모드 모두 같은 레코드 형태를 요구합니다.
//! - 스트리밍: 처음으로 완성된 배열에서 읽기를 끝낼 수 있도록 JSON 배열만 요구
//! - 배치: `response_format: json_object`는 최상위 배열을 허용하지 않으므로 객체로 감쌈

use serde_json::{json, Value};

const RECORD_SHAPE: &str = r#"{
  "range": {"from": <int>, "to": <int>},
  "original": "<exact text covered by range>",
  "replacement": "<corrected text>",
  "rule": "Spelling" | "Grammar" | "Style",
  "explanation": "<one short sentence>"
}"#;

const GUIDELINES: &str = "You review clinical documentation written by healthcare staff. \
Find spelling, grammar and style problems and propose precise corrections that keep a \
formal clinical tone. Preserve medical terminology and standard clinical abbreviations \
(for example Pt, Hx, SOB, PRN) unless they are misspelled.

Offsets are zero-based character positions into the text between the <document> tags, \
with `from` inclusive and `to` exclusive. `original` must equal the covered text exactly.

Only report changes that improve accuracy or clarity. Never add commentary, markdown, \
or code fences.";

pub fn stream_system_prompt() -> String {
    format!(
        "{GUIDELINES}\n\nRespond with ONLY a JSON array of correction records, each shaped as:\n{RECORD_SHAPE}\n\
         Respond with [] when nothing needs correcting."
    )
}

pub fn batch_system_prompt() -> String {
    format!(
        "{GUIDELINES}\n\nRespond with ONLY a JSON object of the form {{\"suggestions\": [...]}} \
         where each element is shaped as:\n{RECORD_SHAPE}\n\
         Respond with {{\"suggestions\": []}} when nothing needs correcting."
    )
}

/// 모델의 오프셋이 제출된 텍스트만을 기준으로 하도록 `<document>` 태그로 감쌉니다.
pub fn user_prompt(text: &str) -> String {
    format!("Review this clinical text.\n<document>{text}</document>")
}

/// `messages` 배열: system + user 두 개
pub fn messages(system: String, text: &str) -> Value {
    json!([
        { "role": "system", "content": system },
        { "role": "user", "content": user_prompt(text) },
    ])
}
