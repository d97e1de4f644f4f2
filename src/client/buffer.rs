//! # 제안 버퍼
//!
//! 계속 바뀌는 문서에 대해 대기 중인 제안의 범위를 유효하게 유지합니다.
//!
//! 서버가 보내는 범위는 요청할 때 보낸 스냅샷 기준의 문자(char) 오프셋입니다.
//! 로컬 편집은 하나의 변경 구간으로 줄여서 처리합니다.
//! - 구간 앞의 범위: 그대로
//! - 구간 뒤의 범위: 길이 변화만큼 이동
//! - 구간과 겹치는 범위: 버림
//!
//! 대체된 요청의 제안은 [`ReconnectController`](super::controller)가 걸러 내므로
//! 여기에 도착하는 제안은 항상 마지막 요청의 것입니다.

use uuid::Uuid;

use crate::models::{char_to_byte, Suggestion, TextRange};

/// 연속된 교체 구간 하나 (문자 오프셋)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edit {
    start: usize,
    removed: usize,
    inserted: usize,
}

impl Edit {
    /// `old`를 `new`로 바꾸는 가장 작은 단일 구간. 공통 접두사/접미사를 제외합니다.
    fn between(old: &str, new: &str) -> Option<Self> {
        if old == new {
            return None;
        }
        let old: Vec<char> = old.chars().collect();
        let new: Vec<char> = new.chars().collect();

        let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
        let max_suffix = old.len().min(new.len()) - prefix;
        let suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();

        Some(Self {
            start: prefix,
            removed: old.len() - prefix - suffix,
            inserted: new.len() - prefix - suffix,
        })
    }

    fn rebase(&self, range: TextRange) -> Option<TextRange> {
        if range.to <= self.start {
            Some(range)
        } else if range.from >= self.start + self.removed {
            range.shifted(self.inserted as isize - self.removed as isize)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct SuggestionBuffer {
    /// 마지막 요청을 보낼 때의 텍스트
    snapshot: String,
    /// 사용자가 지금 보고 있는 텍스트
    current: String,
    pending: Vec<Suggestion>,
    dropped: usize,
}

impl SuggestionBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            snapshot: text.clone(),
            current: text,
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.current
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.pending
    }

    /// 새 요청은 대기 중인 제안을 모두 대체합니다.
    /// 현재 텍스트는 건드리지 않습니다. 요청 이후의 편집이 이미 들어 있기 때문입니다.
    pub fn begin_request(&mut self, text: &str) {
        self.snapshot = text.to_string();
        self.pending.clear();
    }

    /// 마지막 요청에 대한 제안을 추가하고, 그 뒤의 편집만큼 범위를 옮깁니다.
    /// 더 이상 적용할 수 없으면 false.
    pub fn receive(&mut self, suggestion: Suggestion) -> bool {
        if suggestion.range.slice(&self.snapshot).is_none() {
            tracing::warn!(range = ?suggestion.range, "suggestion range outside the requested text");
            self.dropped += 1;
            return false;
        }

        let range = match Edit::between(&self.snapshot, &self.current) {
            None => Some(suggestion.range),
            Some(edit) => edit.rebase(suggestion.range),
        };
        match range {
            Some(range) => {
                self.pending.push(Suggestion { range, ..suggestion });
                true
            }
            None => {
                self.dropped += 1;
                false
            }
        }
    }

    /// 로컬 편집을 기록합니다. 무효가 된 제안 수를 돌려줍니다.
    pub fn apply_edit(&mut self, new_text: &str) -> usize {
        let Some(edit) = Edit::between(&self.current, new_text) else {
            return 0;
        };
        self.current = new_text.to_string();
        self.rebase_all(edit)
    }

    /// 제안 하나를 현재 텍스트에 적용하고 새 텍스트를 돌려줍니다.
    pub fn accept(&mut self, id: Uuid) -> Option<&str> {
        let index = self.pending.iter().position(|s| s.id == id)?;
        let suggestion = self.pending.remove(index);

        let start = char_to_byte(&self.current, suggestion.range.from)?;
        let end = char_to_byte(&self.current, suggestion.range.to)?;
        self.current.replace_range(start..end, &suggestion.replacement);

        self.rebase_all(Edit {
            start: suggestion.range.from,
            removed: suggestion.range.len(),
            inserted: suggestion.replacement.chars().count(),
        });
        Some(&self.current)
    }

    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.pending.len();
        self.pending.retain(|s| s.id != id);
        self.pending.len() != before
    }

    /// 지난 호출 이후 편집으로 무효가 된 제안 수
    pub fn take_dropped(&mut self) -> usize {
        std::mem::take(&mut self.dropped)
    }

    fn rebase_all(&mut self, edit: Edit) -> usize {
        let before = self.pending.len();
        self.pending = std::mem::take(&mut self.pending)
            .into_iter()
            .filter_map(|s| {
                let range = edit.rebase(s.range)?;
                Some(Suggestion { range, ..s })
            })
            .collect();
        let dropped = before - self.pending.len();
        self.dropped += dropped;
        dropped
    }
}
