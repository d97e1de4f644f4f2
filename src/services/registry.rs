//! # 세션 레지스트리
//!
//! 세션 ID 발급과 열린 세션 수 집계를 담당합니다.
//!
//! 세션끼리는 아무것도 공유하지 않습니다. 레지스트리는 요청이나 제안을 보지 않고
//! ID를 나눠 주고 개수만 셉니다. `/health`가 이 개수를 보고합니다.

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

#[derive(Debug, Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    open: AtomicUsize,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 세션을 등록합니다. 반환된 가드가 drop되면 개수가 다시 줄어듭니다 (RAII).
    pub fn open(self: &Arc<Self>) -> SessionGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.open.fetch_add(1, Ordering::Relaxed);
        SessionGuard {
            id,
            registry: Arc::clone(self),
        }
    }

    pub fn open_sessions(&self) -> usize {
        self.open.load(Ordering::Relaxed)
    }
}

/// 열린 세션 하나를 나타내는 가드
#[derive(Debug)]
pub struct SessionGuard {
    id: u64,
    registry: Arc<SessionRegistry>,
}

impl SessionGuard {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.open.fetch_sub(1, Ordering::Relaxed);
    }
}
