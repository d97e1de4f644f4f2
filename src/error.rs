//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 에러 타입을 정의합니다.
//! Rust에서는 예외(exception) 대신 `Result<T, E>` 타입으로 에러를 처리합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError`: HTTP 핸들러 에러, `IntoResponse`로 JSON 응답 변환
//! - `ProtocolError`: 클라이언트가 보낸 메시지가 잘못됨 (연결은 유지)
//! - `UpstreamError`: 언어 모델 호출 실패 (세션은 유지)
//! - `TransportError`: 전송 도중 연결이 끊기거나 막힘 (보고할 상대가 없음)
//!
//! 인증 에러(`AuthError`)는 `middleware::auth`에 있습니다.
//!
//! 클라이언트에게는 에러 종류별로 정해진 일반 메시지만 보냅니다.
//! 실제 에러 내용(업스트림 응답 본문 등)은 로그에만 기록합니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// HTTP 핸들러에서 발생하는 에러
///
/// 이 서버의 HTTP 표면은 `/health`와 `/suggest`(업그레이드)뿐이므로
/// 매칭되지 않는 경로에 대한 404만 남아 있습니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 리소스를 찾을 수 없음 (HTTP 404)
    #[error("Resource not found")]
    NotFound,
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 결과: `{ "error": { "code": "not_found", "message": "Resource not found" } }`
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// 클라이언트 메시지 형식 오류
///
/// 연결을 끊지 않고 `error` 메시지 하나로 보고합니다.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message is not valid JSON for an analysis request: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("docId is not a UUID: {0:?}")]
    InvalidDocId(String),

    #[error("binary frames are not supported")]
    UnsupportedFrame,
}

impl ProtocolError {
    /// 클라이언트에게 보낼 메시지
    pub fn peer_message(&self) -> &'static str {
        match self {
            ProtocolError::UnsupportedFrame => "Unsupported frame type",
            _ => "Invalid message format",
        }
    }
}

/// 언어 모델(업스트림) 호출 실패
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// 네트워크/HTTP 수준 실패
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 2xx가 아닌 응답. 본문은 로그 전용입니다.
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// 제한 시간 초과
    #[error("upstream call exceeded {0:?}")]
    Timeout(std::time::Duration),

    /// 스트림이 끝났는데 완전한 JSON을 얻지 못함
    #[error("model output could not be parsed: {0}")]
    Unparseable(String),

    /// 필수 필드가 없거나 타입이 틀린 제안 레코드
    #[error("model returned an invalid suggestion at index {index}: {reason}")]
    InvalidSuggestion { index: usize, reason: String },
}

impl UpstreamError {
    /// 클라이언트에게 보낼 메시지 (원본 에러 내용은 절대 포함하지 않음)
    pub fn peer_message(&self) -> &'static str {
        match self {
            UpstreamError::Timeout(_) => "Analysis timed out",
            _ => "Failed to analyze text",
        }
    }
}

/// 전송 실패. 현재 요청의 전송만 중단합니다.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// 상대가 연결을 닫음. 세션도 끝납니다.
    #[error("peer connection closed")]
    Closed,

    /// 상대의 수신 버퍼가 가득 차서 전송이 제한 시간 안에 끝나지 않음
    #[error("send did not complete in time")]
    Stalled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_peer_message_never_leaks_body() {
        let err = UpstreamError::Status {
            status: 401,
            body: "{\"error\":\"invalid api key sk-123\"}".to_string(),
        };
        assert_eq!(err.peer_message(), "Failed to analyze text");
        assert!(!err.peer_message().contains("sk-123"));
    }

    #[test]
    fn timeout_has_its_own_peer_message() {
        let err = UpstreamError::Timeout(std::time::Duration::from_secs(30));
        assert_eq!(err.peer_message(), "Analysis timed out");
    }

    #[test]
    fn protocol_errors_collapse_to_generic_message() {
        assert_eq!(
            ProtocolError::InvalidDocId("x".into()).peer_message(),
            "Invalid message format"
        );
        assert_eq!(
            ProtocolError::UnsupportedFrame.peer_message(),
            "Unsupported frame type"
        );
    }
}
