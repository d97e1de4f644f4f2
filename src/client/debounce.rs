//! # 디바운서
//!
//! 짧은 시간 안의 연속 편집을 합쳐, 조용한 구간(quiet window)이 지난 뒤
//! 마지막 텍스트 하나만 보내도록 합니다.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// 대기 중인 텍스트를 교체하고 구간을 다시 시작합니다.
    pub fn push(&mut self, text: String) {
        self.pending = Some((text, Instant::now() + self.window));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// 구간 동안 새 push가 없으면 마지막 텍스트로 완료됩니다.
    /// 대기 중인 텍스트가 없으면 끝나지 않습니다.
    ///
    /// 취소 안전(cancel safe): 완료 전에 future를 drop해도 텍스트는 남아 있습니다.
    /// 그래서 `tokio::select!`의 분기로 써도 됩니다.
    pub async fn fired(&mut self) -> String {
        let deadline = match &self.pending {
            Some((_, deadline)) => *deadline,
            None => return std::future::pending().await,
        };
        sleep_until(deadline).await;

        match self.pending.take() {
            Some((text, _)) => text,
            None => std::future::pending().await,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_fire_once_with_the_last_text() {
        let mut debouncer = Debouncer::default();
        for text in ["P", "Pt", "Pt h", "Pt hasnt"] {
            debouncer.push(text.to_string());
            advance(Duration::from_millis(300)).await;
        }

        let started = Instant::now();
        assert_eq!(debouncer.fired().await, "Pt hasnt");
        // 마지막 push 후 이미 300ms가 지났음
        assert_eq!(started.elapsed(), Duration::from_millis(700));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fires_without_edits() {
        let mut debouncer = Debouncer::default();
        assert!(timeout(Duration::from_secs(10), debouncer.fired()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_keeps_the_pending_text() {
        let mut debouncer = Debouncer::default();
        debouncer.push("draft".to_string());
        assert!(timeout(Duration::from_millis(500), debouncer.fired()).await.is_err());
        assert!(debouncer.is_pending());
        assert_eq!(debouncer.fired().await, "draft");
    }
}
