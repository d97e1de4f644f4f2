//! # 배치 제안 소스
//!
//! 요청 한 번에 구조화된 JSON 객체 하나를 받습니다.
//!
//! 제공자의 `response_format: json_object` 제약에 기대므로 본문을 점진적으로
//! 훑지 않고 한 번에 파싱합니다.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    ensure_success,
    parse::{into_suggestions, parse_batch_content},
    prompt, OpenAiEndpoint, SuggestionSource,
};
use crate::{error::UpstreamError, models::Suggestion};

/// `SUGGESTION_MODE=batch`일 때 쓰는 소스
pub struct BatchSource {
    http: reqwest::Client,
    endpoint: OpenAiEndpoint,
}

impl BatchSource {
    pub fn new(http: reqwest::Client, endpoint: OpenAiEndpoint) -> Self {
        Self { http, endpoint }
    }

    /// 요청 본문: 낮은 temperature로 교정 결과의 편차를 줄입니다.
    fn request_body(&self, text: &str) -> Value {
        json!({
            "model": self.endpoint.model,
            "messages": prompt::messages(prompt::batch_system_prompt(), text),
            "response_format": { "type": "json_object" },
            "temperature": 0.1,
            "max_tokens": 1000,
        })
    }
}

#[async_trait]
impl SuggestionSource for BatchSource {
    async fn suggest(&self, text: &str) -> Result<Vec<Suggestion>, UpstreamError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let resp = self
            .http
            .post(self.endpoint.chat_completions_url())
            .bearer_auth(&self.endpoint.api_key)
            .json(&self.request_body(text))
            .send()
            .await?;
        let data: Value = ensure_success(resp).await?.json().await?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| UpstreamError::Unparseable("completion has no message content".into()))?;

        let records = parse_batch_content(content)?;
        into_suggestions(text, records)
    }
}
