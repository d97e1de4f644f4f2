//! # 연결 세션 (Connection Session)
//!
//! 인증을 통과한 WebSocket 연결 하나를 담당합니다.
//!
//! ## 상태 흐름
//! ```text
//! Open ──요청──▶ Analyzing ──결과 전송──▶ Open ... ──연결 종료/유휴──▶ Closed
//! ```
//!
//! ## 동시성 정책: 취소 후 교체
//! 모델 호출이 진행 중일 때 새 요청이 오면, 진행 중인 호출의 future를 버려
//! 업스트림 HTTP 요청을 끊고 새 요청을 시작합니다. 교체된 요청에는 제안 없이
//! `complete("Analysis superseded")` 하나만 보내므로 "요청마다 종료 메시지 정확히 1개"가
//! 유지됩니다. 결과 전송(제안들 + 종료 메시지) 도중에는 다음 프레임을 읽지 않습니다.
//!
//! ## 에러 처리
//! - 형식 오류 / 업스트림 실패: `error` 메시지를 보내고 연결은 유지
//! - 전송이 제한 시간 안에 끝나지 않음: 현재 요청의 전송만 중단
//! - 전송 실패(상대가 닫음): 세션 종료

use std::{fmt::Display, sync::Arc, time::Duration};

use axum::extract::ws::{close_code, CloseFrame, Message};
use futures::{future::BoxFuture, FutureExt, Sink, SinkExt, Stream, StreamExt};
use tokio::time::{sleep_until, timeout, Instant};
use uuid::Uuid;

use super::SuggestionSource;
use crate::{
    error::{ProtocolError, TransportError, UpstreamError},
    middleware::auth::Identity,
    models::{AnalysisRequest, OutgoingMessage, Suggestion},
};

/// 세션 동작 시간 제한
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// 모델 호출 1회 제한 시간
    pub upstream_timeout: Duration,
    /// 요청이 없는 세션을 닫기까지의 시간
    pub idle_timeout: Duration,
    /// 메시지 하나를 보내는 데 허용하는 시간
    pub send_timeout: Duration,
}

impl SessionSettings {
    pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Analyzing,
    Closed,
}

type Analysis = BoxFuture<'static, Result<Vec<Suggestion>, UpstreamError>>;

/// 진행 중인 모델 호출
struct InFlight {
    doc_id: Uuid,
    started: Instant,
    analysis: Analysis,
}

/// 수신 프레임 분류 결과
enum Inbound {
    Request(AnalysisRequest),
    Invalid(ProtocolError),
    Closed,
    Skip,
}

pub struct ConnectionSession<Tx, Rx> {
    tx: Tx,
    rx: Rx,
    identity: Identity,
    source: Arc<dyn SuggestionSource>,
    settings: SessionSettings,
    state: SessionState,
}

impl<Tx, Rx, E> ConnectionSession<Tx, Rx>
where
    Tx: Sink<Message> + Unpin,
    Rx: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    pub fn new(
        tx: Tx,
        rx: Rx,
        identity: Identity,
        source: Arc<dyn SuggestionSource>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            tx,
            rx,
            identity,
            source,
            settings,
            state: SessionState::Open,
        }
    }

    /// 연결이 끝날 때까지 요청을 처리합니다.
    pub async fn run(mut self) {
        tracing::info!(user_id = %self.identity.user_id, role = %self.identity.role, "session open");

        let mut in_flight: Option<InFlight> = None;
        let mut idle_deadline = Instant::now() + self.settings.idle_timeout;

        loop {
            tokio::select! {
                biased;

                result = poll_in_flight(&mut in_flight) => {
                    if let Some(done) = in_flight.take() {
                        tracing::debug!(
                            doc_id = %done.doc_id,
                            elapsed_ms = done.started.elapsed().as_millis() as u64,
                            "analysis finished"
                        );
                    }
                    self.transition(SessionState::Open);
                    if let Err(TransportError::Closed) = self.deliver(result).await {
                        break;
                    }
                    idle_deadline = Instant::now() + self.settings.idle_timeout;
                }

                frame = self.rx.next() => {
                    idle_deadline = Instant::now() + self.settings.idle_timeout;
                    match classify(frame) {
                        Inbound::Closed => break,
                        Inbound::Skip => {}
                        Inbound::Invalid(err) => {
                            tracing::warn!(error = %err, "rejected client message");
                            if self.emit(OutgoingMessage::error(err.peer_message())).await
                                == Err(TransportError::Closed)
                            {
                                break;
                            }
                        }
                        Inbound::Request(request) => {
                            if let Some(previous) = in_flight.take() {
                                // future를 drop하면 업스트림 호출이 끊김
                                drop(previous.analysis);
                                tracing::info!(doc_id = %previous.doc_id, "analysis superseded by newer request");
                                if self.emit(OutgoingMessage::complete(OutgoingMessage::ANALYSIS_SUPERSEDED)).await
                                    == Err(TransportError::Closed)
                                {
                                    break;
                                }
                                self.transition(SessionState::Open);
                            }

                            if request.is_blank() {
                                if self.deliver(Ok(Vec::new())).await == Err(TransportError::Closed) {
                                    break;
                                }
                                continue;
                            }

                            tracing::info!(doc_id = %request.doc_id, chars = request.text.chars().count(), "processing text analysis");
                            in_flight = Some(self.start(request));
                            self.transition(SessionState::Analyzing);
                        }
                    }
                }

                _ = sleep_until(idle_deadline), if in_flight.is_none() => {
                    tracing::info!("closing idle session");
                    let frame = CloseFrame {
                        code: close_code::AWAY,
                        reason: "Idle timeout".into(),
                    };
                    let _ = timeout(self.settings.send_timeout, self.tx.send(Message::Close(Some(frame)))).await;
                    break;
                }
            }
        }

        self.transition(SessionState::Closed);
        tracing::info!(user_id = %self.identity.user_id, "session closed");
    }

    fn start(&self, request: AnalysisRequest) -> InFlight {
        let source = Arc::clone(&self.source);
        let limit = self.settings.upstream_timeout;
        let text = request.text;

        let analysis = async move {
            match timeout(limit, source.suggest(&text)).await {
                Ok(result) => result,
                Err(_) => Err(UpstreamError::Timeout(limit)),
            }
        }
        .boxed();

        InFlight {
            doc_id: request.doc_id,
            started: Instant::now(),
            analysis,
        }
    }

    /// 결과 하나를 보냅니다: 제안 0개 이상 + 종료 메시지 1개.
    async fn deliver(
        &mut self,
        result: Result<Vec<Suggestion>, UpstreamError>,
    ) -> Result<(), TransportError> {
        match result {
            Ok(suggestions) => {
                let count = suggestions.len();
                for suggestion in suggestions {
                    self.emit(OutgoingMessage::Suggestion(suggestion)).await?;
                }
                self.emit(OutgoingMessage::complete(OutgoingMessage::ANALYSIS_COMPLETE))
                    .await?;
                tracing::info!(count, "suggestions delivered");
            }
            Err(err) => {
                // 원본 에러는 로그에만 남기고 클라이언트에는 일반 메시지만 보냅니다.
                tracing::warn!(error = %err, "analysis failed");
                self.emit(OutgoingMessage::error(err.peer_message())).await?;
            }
        }
        Ok(())
    }

    async fn emit(&mut self, message: OutgoingMessage) -> Result<(), TransportError> {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize outgoing message");
                return Ok(());
            }
        };

        match timeout(self.settings.send_timeout, self.tx.send(Message::Text(text.into()))).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => {
                tracing::debug!("peer gone, stopping emission");
                Err(TransportError::Closed)
            }
            Err(_) => {
                tracing::warn!("peer is not reading, dropping the rest of this result");
                Err(TransportError::Stalled)
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "session state");
            self.state = next;
        }
    }
}

async fn poll_in_flight(slot: &mut Option<InFlight>) -> Result<Vec<Suggestion>, UpstreamError> {
    match slot {
        Some(job) => (&mut job.analysis).await,
        None => std::future::pending().await,
    }
}

fn classify<E: Display>(frame: Option<Result<Message, E>>) -> Inbound {
    match frame {
        None => Inbound::Closed,
        Some(Err(e)) => {
            tracing::debug!(error = %e, "transport error");
            Inbound::Closed
        }
        Some(Ok(Message::Text(text))) => match AnalysisRequest::parse(text.as_str()) {
            Ok(request) => Inbound::Request(request),
            Err(err) => Inbound::Invalid(err),
        },
        Some(Ok(Message::Binary(_))) => Inbound::Invalid(ProtocolError::UnsupportedFrame),
        Some(Ok(Message::Close(_))) => Inbound::Closed,
        // ping에는 axum이 직접 응답함
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => Inbound::Skip,
    }
}
