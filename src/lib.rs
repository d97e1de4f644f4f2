//! # Askleo
//!
//! 편집 중인 임상 기록 텍스트에 대해 철자/문법/문체 교정 제안을
//! WebSocket으로 실시간 전달하는 서버와, 그 채널에 붙는 클라이언트 구성 요소입니다.
//!
//! 두 실행 파일(`askleo`, `askleo-client`)과 `tests/`의 통합 테스트가
//! 이 라이브러리를 공유합니다.

pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
