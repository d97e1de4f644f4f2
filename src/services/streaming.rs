//! # 스트리밍 제안 소스 (기본 모드)
//!
//! 모델 응답을 토큰 스트림으로 읽으면서, 델타가 배열을 닫았을 가능성이 있을 때마다
//! 누적된 텍스트를 다시 파싱합니다.
//!
//! 처음으로 완성된 배열이 결과입니다. 그 시점에 응답 본문을 drop하므로
//! 업스트림 연결이 닫히고 뒤따르는 토큰은 버려집니다.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use super::{
    ensure_success,
    parse::{find_array, into_suggestions, ScanError},
    prompt,
    sse::{SseData, SseDecoder},
    OpenAiEndpoint, SuggestionSource,
};
use crate::{error::UpstreamError, models::Suggestion};

/// `SUGGESTION_MODE=stream`일 때 쓰는 소스
pub struct StreamingSource {
    http: reqwest::Client,
    endpoint: OpenAiEndpoint,
}

impl StreamingSource {
    pub fn new(http: reqwest::Client, endpoint: OpenAiEndpoint) -> Self {
        Self { http, endpoint }
    }

    fn request_body(&self, text: &str) -> Value {
        json!({
            "model": self.endpoint.model,
            "messages": prompt::messages(prompt::stream_system_prompt(), text),
            "stream": true,
            "temperature": 0.1,
            "max_tokens": 1000,
        })
    }
}

#[async_trait]
impl SuggestionSource for StreamingSource {
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
        let resp = ensure_success(resp).await?;

        let mut body = resp.bytes_stream();
        let mut decoder = SseDecoder::default();
        let mut accumulated = String::new();
        let mut deltas = 0usize;

        'read: while let Some(chunk) = body.next().await {
            for event in decoder.push(&chunk?) {
                let SseData::Json(payload) = event else {
                    break 'read;
                };
                let Some(delta) = content_delta(&payload) else {
                    continue;
                };
                deltas += 1;
                accumulated.push_str(&delta);

                // 이번 델타가 대괄호를 닫았을 때만 배열이 막 완성됐을 수 있음
                if delta.contains(']') {
                    if let Ok(records) = find_array(&accumulated) {
                        tracing::debug!(deltas, records = records.len(), "suggestion array complete");
                        return into_suggestions(text, records);
                    }
                }
            }
        }

        if let Some(SseData::Json(payload)) = decoder.finish() {
            if let Some(delta) = content_delta(&payload) {
                accumulated.push_str(&delta);
            }
        }

        match find_array(&accumulated) {
            Ok(records) => into_suggestions(text, records),
            Err(ScanError::Incomplete) => Err(UpstreamError::Unparseable(format!(
                "stream ended inside an unterminated array after {deltas} deltas"
            ))),
            Err(ScanError::Invalid(reason)) => Err(UpstreamError::Unparseable(reason)),
        }
    }
}

/// 스트림 청크 하나의 `choices[0].delta.content` (없으면 None)
fn content_delta(payload: &str) -> Option<String> {
    let chunk: Value = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::debug!(error = %e, "skipping non-JSON stream event");
            return None;
        }
    };
    chunk["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}
