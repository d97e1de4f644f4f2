//! # 헬스체크(Health Check) 핸들러
//!
//! 서버가 정상적으로 동작하는지 확인하는 엔드포인트입니다.
//!
//! ## 엔드포인트
//! - `GET /health` → `{ "status": "ok", "timestamp": "2026-01-01T00:00:00Z", "sessions": 0 }`
//!
//! 주로 다음 용도로 사용됩니다:
//! - 로드밸런서의 서버 상태 확인
//! - 컨테이너 오케스트레이터(Docker)의 헬스체크
//! - 현재 열린 제안 세션 수 모니터링

use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use super::AppState;

/// `GET /health`: 서버 상태를 확인합니다.
///
/// 세션 수는 레지스트리의 원자적 카운터를 읽기만 하므로 실패하지 않습니다.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        // RFC 3339 형식 (예: "2026-01-01T00:00:00.000Z")
        "timestamp": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "sessions": state.registry.open_sessions(),
    }))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::{
        error::UpstreamError,
        middleware::auth::TokenValidator,
        models::Suggestion,
        routes::{build_router, AppState},
        services::{SessionRegistry, SessionSettings, SuggestionSource},
    };

    struct NoSuggestions;

    #[async_trait]
    impl SuggestionSource for NoSuggestions {
        async fn suggest(&self, _text: &str) -> Result<Vec<Suggestion>, UpstreamError> {
            Ok(Vec::new())
        }
    }

    fn state() -> AppState {
        AppState {
            validator: Arc::new(TokenValidator::new("secret", None)),
            source: Arc::new(NoSuggestions),
            registry: Arc::new(SessionRegistry::new()),
            settings: SessionSettings {
                upstream_timeout: Duration::from_secs(30),
                idle_timeout: Duration::from_secs(600),
                send_timeout: SessionSettings::DEFAULT_SEND_TIMEOUT,
            },
        }
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_status_timestamp_and_sessions() {
        let state = state();
        let _open = state.registry.open();
        let app = build_router(state, None);

        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 1);
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[tokio::test]
    async fn unknown_path_is_json_not_found() {
        let app = build_router(state(), Some("https://app.example.com"));
        let resp = app
            .oneshot(Request::get("/documents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn cors_allows_configured_frontend() {
        let app = build_router(state(), Some("https://app.example.com"));
        let resp = app
            .oneshot(
                Request::get("/health")
                    .header("origin", "https://app.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "https://app.example.com"
        );
    }
}
