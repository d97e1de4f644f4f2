//! # 라우트 모듈
//!
//! HTTP/WebSocket 요청을 처리하는 핸들러와 라우터 구성을 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `suggest`: 실시간 교정 제안 WebSocket 채널
//!
//! ## 엔드포인트
//! - `GET /health`  → `{ "status": "ok", "timestamp": "...", "sessions": n }`
//! - `GET /suggest` → WebSocket 업그레이드 (인증 필요)

pub mod health;
pub mod suggest;

use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer}, // CORS(Cross-Origin Resource Sharing) 설정
    trace::TraceLayer,                    // HTTP 요청/응답 로깅 미들웨어
};

use crate::{
    error::AppError,
    middleware::auth::TokenValidator,
    services::{SessionRegistry, SessionSettings, SuggestionSource},
};

pub use health::health_check;
pub use suggest::ws_handler;

/// 애플리케이션 공유 상태
///
/// 모든 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// 필드는 모두 `Arc`이거나 `Copy`이므로 clone 비용이 작고,
/// 어느 것도 세션별 가변 상태를 갖지 않습니다.
#[derive(Clone)]
pub struct AppState {
    /// 업그레이드 요청의 토큰 검증기 (프로세스 전체에서 하나)
    pub validator: Arc<TokenValidator>,
    /// 교정 제안 소스 (프로세스 전체에서 하나)
    pub source: Arc<dyn SuggestionSource>,
    /// 세션 ID 발급 / 열린 세션 수
    pub registry: Arc<SessionRegistry>,
    /// 세션 시간 제한
    pub settings: SessionSettings,
}

/// 라우터를 구성합니다.
///
/// `frontend_domain`이 주어지면 그 출처만 CORS를 허용하고,
/// 없으면 모든 출처를 허용합니다 (개발 환경).
pub fn build_router(state: AppState, frontend_domain: Option<&str>) -> Router {
    let origin = match frontend_domain.map(str::parse::<HeaderValue>) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(_)) => {
            tracing::warn!(?frontend_domain, "FRONTEND_DOMAIN is not a valid origin, allowing any");
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/suggest", get(ws_handler))
        // 매칭되지 않는 경로는 JSON 404
        .fallback(|| async { AppError::NotFound })
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
