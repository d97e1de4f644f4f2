//! # 제안 채널 핸들러
//!
//! `GET /suggest`: 인증된 WebSocket 제안 채널입니다.
//!
//! ## 인증
//! 업그레이드 요청에서 자격 증명을 확인합니다.
//! - `Authorization: Bearer <token>` 헤더 (네이티브 클라이언트)
//! - `?token=<token>` 쿼리 파라미터 (브라우저)
//!
//! 거부된 상대도 일단 업그레이드한 뒤 1008로 닫습니다.
//! 브라우저는 거절된 업그레이드의 HTTP 상태는 읽을 수 없지만 닫힘 코드는 읽을 수 있습니다.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::StreamExt;
use serde::Deserialize;
use tracing::Instrument;

use super::AppState;
use crate::{
    middleware::auth::{extract_bearer, AuthError, Identity, TokenValidator},
    services::ConnectionSession,
};

/// 닫힘 사유: 자격 증명이 없음
pub const AUTH_REQUIRED: &str = "Authentication required";
/// 닫힘 사유: 자격 증명이 있지만 유효하지 않음
pub const AUTH_INVALID: &str = "Invalid authentication token";

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// 업그레이드 핸들러: 인증에 성공하면 세션을 열고, 실패하면 1008로 닫습니다.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Response {
    match authenticate(&state.validator, &headers, query.token.as_deref()) {
        Ok(identity) => ws.on_upgrade(move |socket| serve(socket, state, identity)),
        Err(err) => {
            tracing::warn!(reason = %err, "rejecting suggestion channel");
            let reason = match err {
                AuthError::Missing => AUTH_REQUIRED,
                _ => AUTH_INVALID,
            };
            ws.on_upgrade(move |socket| reject(socket, reason))
        }
    }
}

fn authenticate(
    validator: &TokenValidator,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<Identity, AuthError> {
    let token = extract_bearer(headers, query_token).ok_or(AuthError::Missing)?;
    validator.validate(&token)
}

/// 인증된 연결 하나를 세션으로 돌립니다. 세션이 끝날 때까지 레지스트리에 등록됩니다.
async fn serve(socket: WebSocket, state: AppState, identity: Identity) {
    let guard = state.registry.open();
    let span = tracing::info_span!("session", session_id = guard.id(), user_id = %identity.user_id);

    let (tx, rx) = socket.split();
    ConnectionSession::new(tx, rx, identity, Arc::clone(&state.source), state.settings)
        .run()
        .instrument(span)
        .await;

    drop(guard);
}

async fn reject(mut socket: WebSocket, reason: &'static str) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: reason.into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!(error = %e, "peer left before the rejection was sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderValue};
    use chrono::Duration;

    use crate::middleware::auth::issue_token;

    const SECRET: &str = "suggest-secret";

    #[test]
    fn missing_credential_is_reported_as_missing() {
        let validator = TokenValidator::new(SECRET, None);
        assert_eq!(
            authenticate(&validator, &HeaderMap::new(), None),
            Err(AuthError::Missing)
        );
        assert_eq!(
            authenticate(&validator, &HeaderMap::new(), Some("  ")),
            Err(AuthError::Missing)
        );
    }

    #[test]
    fn query_token_authenticates_browser_peers() {
        let validator = TokenValidator::new(SECRET, None);
        let token = issue_token("user-7", "authenticated", "authenticated", Duration::minutes(5), SECRET).unwrap();
        let identity = authenticate(&validator, &HeaderMap::new(), Some(&token)).unwrap();
        assert_eq!(identity.user_id, "user-7");
    }

    #[test]
    fn bad_header_token_wins_over_good_query_token() {
        let validator = TokenValidator::new(SECRET, None);
        let good = issue_token("user-7", "authenticated", "authenticated", Duration::minutes(5), SECRET).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"));
        assert_eq!(
            authenticate(&validator, &headers, Some(&good)),
            Err(AuthError::Malformed)
        );
    }
}
