//! # Askleo 터미널 클라이언트
//!
//! 표준입력의 각 줄을 "현재 문서 전체 텍스트"로 보고 서버에 보냅니다.
//! 편집기와 같은 경로(디바운스 → 요청 → 제안 버퍼)를 거치므로
//! 서버 동작을 손으로 확인할 때 씁니다.
//!
//! 환경변수:
//! - `ASKLEO_URL`: 기본값 `ws://127.0.0.1:3001/suggest`
//! - `ASKLEO_TOKEN`: 필수, Bearer 토큰
//! - `ASKLEO_DOC_ID`: 기본값은 새 UUID

use anyhow::{Context, Result};
use askleo::client::{
    connect, ClientConfig, ClientEvent, CloseReason, ConnectionState, SuggestionBuffer,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 출력은 stdout, 로그는 stderr로 나눕니다.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askleo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let url = std::env::var("ASKLEO_URL").unwrap_or_else(|_| "ws://127.0.0.1:3001/suggest".to_string());
    let token = std::env::var("ASKLEO_TOKEN").context("ASKLEO_TOKEN must be set")?;
    let doc_id = match std::env::var("ASKLEO_DOC_ID") {
        Ok(id) => Uuid::parse_str(id.trim()).context("ASKLEO_DOC_ID must be a UUID")?,
        Err(_) => Uuid::now_v7(),
    };

    let mut client = connect(ClientConfig::new(url, token, doc_id));
    let mut buffer = SuggestionBuffer::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(text) => {
                    let dropped = buffer.apply_edit(&text);
                    if dropped > 0 {
                        println!("  ({dropped} suggestion(s) no longer apply)");
                    }
                    client.edit(text);
                }
                None => stdin_open = false,
            },

            event = client.next_event() => {
                let Some(event) = event else { break };
                match event {
                    ClientEvent::State(ConnectionState::Closed(reason)) => {
                        if reason != CloseReason::Shutdown {
                            println!("closed: {reason:?}");
                        }
                        break;
                    }
                    ClientEvent::State(state) => tracing::info!(?state, "connection"),
                    ClientEvent::Requested(text) => buffer.begin_request(&text),
                    ClientEvent::Suggestion(suggestion) => {
                        if buffer.receive(suggestion) {
                            if let Some(s) = buffer.suggestions().last() {
                                let original = s.range.slice(buffer.text()).unwrap_or_default();
                                println!("  [{}] {original:?} -> {:?}: {}", s.rule, s.replacement, s.explanation);
                            }
                        }
                    }
                    ClientEvent::Complete(message) => {
                        println!("{message} ({} pending)", buffer.suggestions().len());
                    }
                    ClientEvent::Error(message) => println!("error: {message}"),
                    ClientEvent::AuthRejected => println!("credential rejected, get a fresh token"),
                    ClientEvent::ConnectionLost => println!("connection lost, restart to retry"),
                }
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
