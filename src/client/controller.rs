//! # 연결 컨트롤러 (Reconnect Controller)
//!
//! 편집기 쪽 제안 채널의 연결 수명 주기를 관리합니다.
//!
//! `connect`는 소켓을 소유하는 태스크 하나를 띄웁니다. UI는
//! [`ClientHandle::edit`]로 편집 내용을 넣고 [`ClientEvent`]를 꺼내 읽습니다.
//!
//! ## 상태 흐름
//! - `Connecting` → 성공하면 `Connected`, 실패하면 `Disconnected`
//! - `Connected` → 1008로 닫히면 `Closed(AuthRejected)`, 그 외 닫힘은 `Disconnected`
//! - `Disconnected` → 백오프 후 `Connecting`, 재시도 횟수를 넘기면 `Closed(RetriesExhausted)`
//!
//! ## 요청 규칙
//! - 분석 요청은 `Connected` 상태에서만 보냅니다. 연결 중이거나 끊긴 동안 디바운스 창이
//!   끝난 텍스트는 버립니다. 다음 편집이 전체 텍스트를 다시 보내기 때문입니다.
//! - 서버는 요청마다 종료 메시지(`complete`/`error`)를 정확히 하나 보냅니다. 응답을 기다리는
//!   요청이 둘 이상이면 지금 도착하는 프레임은 이미 대체된 요청의 것이므로 UI에 넘기지 않습니다.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    net::TcpStream,
    sync::mpsc,
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        self,
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue},
        protocol::frame::coding::CloseCode,
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;

use super::{Backoff, ClientEvent, CloseReason, ConnectionState, Debouncer};
use crate::models::{AnalysisRequest, OutgoingMessage};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 핸드셰이크 한 번에 허용하는 시간
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 연결 시도 실패
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),
    #[error("token cannot be sent as a header")]
    InvalidToken(#[from] tungstenite::http::header::InvalidHeaderValue),
    #[error("no handshake within {0:?}")]
    Timeout(Duration),
}

/// 클라이언트 설정
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 예: `ws://127.0.0.1:3001/suggest`
    pub url: String,
    pub token: String,
    pub doc_id: Uuid,
    pub backoff: Backoff,
    pub debounce: Duration,
}

impl ClientConfig {
    /// 기본값: 백오프 1초~30초 / 최대 5회, 디바운스 1초
    pub fn new(url: impl Into<String>, token: impl Into<String>, doc_id: Uuid) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            doc_id,
            backoff: Backoff::default(),
            debounce: Debouncer::DEFAULT_WINDOW,
        }
    }
}

enum Command {
    Edit(String),
    Shutdown,
}

/// UI 쪽에서 쥐는 핸들
pub struct ClientHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedReceiver<ClientEvent>,
    task: JoinHandle<()>,
}

impl ClientHandle {
    /// 편집 후의 문서 전체 텍스트를 전달합니다.
    pub fn edit(&self, text: impl Into<String>) {
        // 태스크는 종료 상태에서만 끝나고, 그때는 편집이 의미 없습니다.
        let _ = self.commands.send(Command::Edit(text.into()));
    }

    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.events.recv().await
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "client task did not stop cleanly");
        }
    }
}

pub fn connect(config: ClientConfig) -> ClientHandle {
    let (commands_tx, commands) = mpsc::unbounded_channel();
    let (events, events_rx) = mpsc::unbounded_channel();

    let controller = ReconnectController {
        debouncer: Debouncer::new(config.debounce),
        backoff: config.backoff.clone(),
        state: ConnectionState::Disconnected,
        outstanding: Outstanding::default(),
        config,
        commands,
        events,
    };

    ClientHandle {
        commands: commands_tx,
        events: events_rx,
        task: tokio::spawn(controller.run()),
    }
}

/// 연결 하나가 끝난 이유
enum Ended {
    Closed(Option<CloseCode>),
    Shutdown,
}

/// 보냈지만 아직 종료 메시지를 받지 못한 요청 수
///
/// 연결이 새로 열릴 때마다 0부터 셉니다.
#[derive(Debug, Default)]
struct Outstanding(usize);

impl Outstanding {
    fn sent(&mut self) {
        self.0 += 1;
    }

    /// 지금 도착하는 프레임이 마지막으로 보낸 요청의 것인지
    fn is_current(&self) -> bool {
        self.0 <= 1
    }

    fn answered(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }
}

struct ReconnectController {
    config: ClientConfig,
    state: ConnectionState,
    backoff: Backoff,
    debouncer: Debouncer,
    outstanding: Outstanding,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl ReconnectController {
    async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            let Some(attempt) = self.connecting().await else {
                self.set_state(ConnectionState::Closed(CloseReason::Shutdown));
                return;
            };

            match attempt {
                Ok(socket) => {
                    self.backoff.reset();
                    self.set_state(ConnectionState::Connected);
                    match self.drive(socket).await {
                        Ended::Shutdown => {
                            self.set_state(ConnectionState::Closed(CloseReason::Shutdown));
                            return;
                        }
                        Ended::Closed(Some(CloseCode::Policy)) => {
                            tracing::warn!("server rejected the credential");
                            self.emit(ClientEvent::AuthRejected);
                            self.set_state(ConnectionState::Closed(CloseReason::AuthRejected));
                            return;
                        }
                        Ended::Closed(code) => {
                            tracing::info!(?code, "connection closed");
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "connect failed"),
            }

            self.set_state(ConnectionState::Disconnected);
            let Some(delay) = self.backoff.next_delay() else {
                tracing::warn!(attempts = self.backoff.attempts(), "giving up on reconnecting");
                self.emit(ClientEvent::ConnectionLost);
                self.set_state(ConnectionState::Closed(CloseReason::RetriesExhausted));
                return;
            };

            tracing::debug!(attempt = self.backoff.attempts(), delay_ms = delay.as_millis() as u64, "reconnecting");
            if !self.wait(delay).await {
                self.set_state(ConnectionState::Closed(CloseReason::Shutdown));
                return;
            }
        }
    }

    /// 핸드셰이크를 기다리는 동안에도 명령과 디바운스를 처리합니다.
    /// 종료 명령을 받으면 `None`을 돌려줍니다.
    async fn connecting(&mut self) -> Option<Result<Socket, ConnectError>> {
        let attempt = open(&self.config);
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                result = &mut attempt => return Some(result),
                command = self.commands.recv() => match command {
                    Some(Command::Edit(text)) => self.debouncer.push(text),
                    Some(Command::Shutdown) | None => return None,
                },
                text = self.debouncer.fired() => drop_request(&text),
            }
        }
    }

    async fn drive(&mut self, socket: Socket) -> Ended {
        let (mut sink, mut stream) = socket.split();
        self.outstanding = Outstanding::default();

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()),
                    Some(Ok(Message::Close(frame))) => return Ended::Closed(frame.map(|f| f.code)),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "socket error");
                        return Ended::Closed(None);
                    }
                    None => return Ended::Closed(None),
                },

                command = self.commands.recv() => match command {
                    Some(Command::Edit(text)) => self.debouncer.push(text),
                    Some(Command::Shutdown) | None => {
                        let _ = sink.send(Message::Close(None)).await;
                        return Ended::Shutdown;
                    }
                },

                text = self.debouncer.fired() => {
                    if text.trim().is_empty() {
                        continue;
                    }
                    let request = AnalysisRequest { doc_id: self.config.doc_id, text };
                    let frame = match serde_json::to_string(&request) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::error!(error = %e, "failed to serialize request");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(frame.into())).await {
                        tracing::debug!(error = %e, "send failed");
                        return Ended::Closed(None);
                    }
                    self.outstanding.sent();
                    self.emit(ClientEvent::Requested(request.text));
                }
            }
        }
    }

    /// 백오프 시간만큼 기다립니다. 종료 명령을 받으면 false.
    async fn wait(&mut self, delay: Duration) -> bool {
        let deadline = sleep(delay);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => return true,
                command = self.commands.recv() => match command {
                    Some(Command::Edit(text)) => self.debouncer.push(text),
                    Some(Command::Shutdown) | None => return false,
                },
                text = self.debouncer.fired() => drop_request(&text),
            }
        }
    }

    fn handle_text(&mut self, frame: &str) {
        let message = match serde_json::from_str::<OutgoingMessage>(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unrecognised server message");
                return;
            }
        };

        let current = self.outstanding.is_current();
        match message {
            OutgoingMessage::Suggestion(suggestion) if current => {
                self.emit(ClientEvent::Suggestion(suggestion));
            }
            OutgoingMessage::Suggestion(_) => {
                tracing::debug!("dropping suggestion for a superseded request");
            }
            OutgoingMessage::Complete(notice) => {
                self.outstanding.answered();
                if current {
                    self.emit(ClientEvent::Complete(notice.message));
                }
            }
            OutgoingMessage::Error(notice) => {
                self.outstanding.answered();
                if current {
                    self.emit(ClientEvent::Error(notice.message));
                }
            }
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "connection state");
            self.state = next;
            self.emit(ClientEvent::State(next));
        }
    }

    fn emit(&self, event: ClientEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("no one is listening for client events");
        }
    }
}

/// 핸드셰이크를 수행합니다.
async fn open(config: &ClientConfig) -> Result<Socket, ConnectError> {
    let request = upgrade_request(config)?;
    let (socket, _response) = timeout(CONNECT_TIMEOUT, connect_async(request))
        .await
        .map_err(|_| ConnectError::Timeout(CONNECT_TIMEOUT))??;
    Ok(socket)
}

/// 업그레이드 요청을 만듭니다.
///
/// 브라우저는 쿼리 파라미터만 쓸 수 있으므로 토큰을 쿼리와 `Authorization` 헤더 양쪽에 싣습니다.
/// 쿼리 쪽은 퍼센트 인코딩합니다.
fn upgrade_request(config: &ClientConfig) -> Result<tungstenite::handshake::client::Request, ConnectError> {
    let separator = if config.url.contains('?') { '&' } else { '?' };
    let url = format!(
        "{}{}token={}",
        config.url,
        separator,
        urlencoding::encode(&config.token)
    );

    let mut request = url.into_client_request()?;
    request.headers_mut().insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", config.token))?,
    );
    Ok(request)
}

/// 연결되지 않은 동안 디바운스 창이 끝난 요청은 쌓아 두지 않고 버립니다.
fn drop_request(text: &str) {
    tracing::debug!(chars = text.chars().count(), "not connected, dropping analysis request");
}
