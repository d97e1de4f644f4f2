//! # 클라이언트 (편집기 쪽)
//!
//! 제안 채널에 붙는 쪽의 구성 요소입니다.
//!
//! - `backoff`: 재연결 대기 시간 계산 (지수 증가 + 상한 + 최대 횟수)
//! - `debounce`: 짧은 시간 안의 연속 편집을 마지막 것 하나로 합침
//! - `buffer`: 편집이 일어나도 제안 구간이 어긋나지 않도록 관리
//! - `controller`: 연결/재연결 상태 머신과 이벤트 스트림
//!
//! ## 닫힘 코드 규칙
//! `1008`(인증 거부)만 재시도하지 않습니다. 그 외 모든 닫힘은 일시적인 것으로 보고
//! 백오프 후 다시 연결합니다.

pub mod backoff;
pub mod buffer;
pub mod controller;
pub mod debounce;

pub use backoff::Backoff;
pub use buffer::SuggestionBuffer;
pub use controller::{connect, ClientConfig, ClientHandle};
pub use debounce::Debouncer;

use crate::models::Suggestion;

/// 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// 종료 상태. 더 이상 재연결하지 않습니다.
    Closed(CloseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// 서버가 1008로 닫음: 토큰을 새로 받아야 함
    AuthRejected,
    /// 재연결 최대 횟수 초과: 수동 새로고침 필요
    RetriesExhausted,
    /// 사용자가 종료
    Shutdown,
}

/// UI로 전달되는 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    State(ConnectionState),
    /// 분석 요청을 보냄. UI는 이 텍스트로 `SuggestionBuffer::begin_request`를 호출합니다.
    Requested(String),
    Suggestion(Suggestion),
    Complete(String),
    /// 일시적 알림 (형식 오류, 분석 실패 등)
    Error(String),
    /// 인증이 거부됨: 자격 증명을 새로 받아야 함
    AuthRejected,
    /// 재연결을 포기함: 지속 알림
    ConnectionLost,
}
