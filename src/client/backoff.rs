//! 재연결 대기 시간 계산

use std::time::Duration;

/// 지수 백오프: 상한이 있고 재시도 횟수가 제한됩니다.
///
/// 연속 k번째 재시도는 `min(base * 2^(k-1), cap)`만큼 기다립니다.
/// `max_attempts`번을 모두 쓰면 `next_delay`는 `None`을 돌려줍니다.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl Backoff {
    pub const DEFAULT_BASE: Duration = Duration::from_secs(1);
    pub const DEFAULT_CAP: Duration = Duration::from_secs(30);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
            attempts: 0,
        }
    }

    /// 다음 재시도까지의 대기 시간. 횟수를 다 쓰면 `None`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;

        let factor = 2u32.checked_pow(self.attempts - 1).unwrap_or(u32::MAX);
        let delay = self
            .base
            .checked_mul(factor)
            .map_or(self.cap, |delay| delay.min(self.cap));
        Some(delay)
    }

    /// 연결에 성공하면 호출합니다.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE, Self::DEFAULT_CAP, Self::DEFAULT_MAX_ATTEMPTS)
    }
}
