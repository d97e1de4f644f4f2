//! # Askleo 서버 진입점
//!
//! 이 파일은 실시간 교정 제안 서버의 **시작점(entry point)**입니다.
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. 설정 읽기
//! 4. 공유 서비스(토큰 검증기, 제안 소스, 세션 레지스트리) 생성
//! 5. 라우터 설정
//! 6. HTTP/WebSocket 서버 시작

// ── 외부 크레이트 및 모듈에서 필요한 항목 가져오기 ──
// 모듈 선언은 lib.rs에 있고, 여기서는 라이브러리 크레이트 `askleo`를 가져다 씁니다.
use std::sync::Arc;

use anyhow::{Context, Result}; // anyhow::Result: 어떤 에러 타입이든 담을 수 있는 범용 Result 타입
use askleo::{
    config::Config,
    middleware::auth::TokenValidator,
    routes::{build_router, AppState},
    services::{build_source, SessionRegistry, SessionSettings},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt}; // 로깅 초기화 유틸리티

// #[tokio::main]: 비동기 런타임을 시작하는 **어트리뷰트 매크로**
// 이 매크로가 내부적으로 tokio 런타임을 생성하고 main을 그 안에서 실행합니다.
#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅(tracing) 초기화 ──
    // EnvFilter: RUST_LOG 환경변수로 로그 레벨을 제어합니다.
    // 환경변수가 없으면 askleo, tower_http, axum 모듈을 debug 레벨로 설정
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askleo=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    // 필수 값이 없거나 숫자/모드 값이 잘못되면 여기서 바로 종료합니다.
    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(
        mode = ?config.suggestion_mode,
        model = %config.openai_model,
        "Starting Askleo server on {}:{}",
        config.host,
        config.port
    );

    // ── 4단계: 공유 서비스 생성 ──
    // 검증기와 제안 소스는 세션별 상태가 없으므로 프로세스 전체에서 하나씩만 만들어
    // Arc(참조 카운트 스마트 포인터)로 모든 연결이 나눠 씁니다.
    // reqwest::Client도 내부적으로 연결 풀을 Arc로 공유합니다.
    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;

    let state = AppState {
        validator: Arc::new(TokenValidator::new(
            &config.jwt_secret,
            config.jwt_audience.as_deref(),
        )),
        source: build_source(&config, http),
        registry: Arc::new(SessionRegistry::new()),
        settings: SessionSettings {
            upstream_timeout: config.upstream_timeout,
            idle_timeout: config.session_idle_timeout,
            send_timeout: SessionSettings::DEFAULT_SEND_TIMEOUT,
        },
    };

    // ── 5단계: 라우터 설정 ──
    // CORS는 FRONTEND_DOMAIN이 있으면 그 출처만, 없으면 모두 허용합니다.
    if config.frontend_domain.is_none() {
        tracing::warn!("FRONTEND_DOMAIN not set, allowing any origin");
    }
    let app = build_router(state, config.frontend_domain.as_deref());

    // ── 6단계: 서버 시작 ──
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Ctrl+C를 받으면 새 연결을 받지 않고 종료합니다.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                // 신호를 받을 수 없으면 프로세스가 끝날 때까지 계속 서빙합니다.
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
