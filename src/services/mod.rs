//! # 서비스 계층
//!
//! 실시간 제안 채널의 핵심 로직을 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `prompt`: 모델에게 보내는 지시문
//! - `parse`: 모델 출력 → 검증된 `Suggestion` 목록
//! - `sse`: 서버 전송 이벤트(SSE) 줄 단위 디코더
//! - `streaming`: 토큰 스트림을 누적하며 배열이 완성되면 확정하는 제안 소스
//! - `batch`: 구조화 출력(JSON 객체)을 한 번에 받는 제안 소스
//! - `registry`: 세션 ID 발급과 열린 세션 수 집계
//! - `session`: 인증된 WebSocket 연결 하나를 담당하는 세션 루프

pub mod batch;
pub mod parse;
pub mod prompt;
pub mod registry;
pub mod session;
pub mod sse;
pub mod streaming;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::{Config, SuggestionMode},
    error::UpstreamError,
    models::Suggestion,
};

pub use batch::BatchSource;
pub use registry::SessionRegistry;
pub use session::{ConnectionSession, SessionSettings};
pub use streaming::StreamingSource;

/// 텍스트 하나를 받아 교정 제안 목록을 만드는 소스
///
/// 고칠 것이 없으면 에러가 아니라 빈 목록을 반환합니다.
/// 세션별 상태를 갖지 않으므로 하나의 인스턴스를 `Arc`로 모든 연결이 공유합니다.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggest(&self, text: &str) -> Result<Vec<Suggestion>, UpstreamError>;
}

/// OpenAI 호환 `/chat/completions` 엔드포인트 정보
#[derive(Debug, Clone)]
pub struct OpenAiEndpoint {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl OpenAiEndpoint {
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// 설정에 따라 스트리밍/배치 소스 중 하나를 만듭니다.
pub fn build_source(config: &Config, http: reqwest::Client) -> Arc<dyn SuggestionSource> {
    let endpoint = OpenAiEndpoint {
        base_url: config.openai_base_url.clone(),
        api_key: config.openai_api_key.clone(),
        model: config.openai_model.clone(),
    };

    match config.suggestion_mode {
        SuggestionMode::Stream => Arc::new(StreamingSource::new(http, endpoint)),
        SuggestionMode::Batch => Arc::new(BatchSource::new(http, endpoint)),
    }
}

/// 2xx가 아니면 본문을 읽어 에러로 만듭니다. 본문은 로그에만 남습니다.
pub(crate) async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        body,
    })
}
