//! # 데이터 모델 모듈
//!
//! 서버와 클라이언트가 함께 쓰는 데이터 구조체들을 정의합니다:
//! - `message`: WebSocket으로 오가는 요청/응답 메시지
//! - `suggestion`: 교정 제안과 문자 구간
//!
//! `pub use X::*;`로 재공개하여 `models::Suggestion`처럼 짧게 쓸 수 있게 합니다.

pub mod message;
pub mod suggestion;

pub use message::*;
pub use suggestion::*;
