//! # 교정 제안(Suggestion) 모델
//!
//! 제안 하나는 "제출된 텍스트의 어느 구간을 무엇으로 바꿀지"를 나타냅니다.
//!
//! ## 오프셋 규칙
//! `range`는 **제안을 만든 요청에 실린 바로 그 텍스트**의 문자(char) 인덱스입니다.
//! 이후 편집된 텍스트에는 그대로 쓸 수 없으며, 클라이언트가
//! `client::SuggestionBuffer`로 다시 맞춰야 합니다.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `[from, to)` 문자 구간. 항상 `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub from: usize,
    pub to: usize,
}

impl TextRange {
    /// `from > to`이면 None
    pub fn new(from: usize, to: usize) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    /// 구간을 `delta`만큼 이동합니다. 0 미만으로 내려가면 None.
    pub fn shifted(&self, delta: isize) -> Option<Self> {
        let from = self.from.checked_add_signed(delta)?;
        let to = self.to.checked_add_signed(delta)?;
        Some(Self { from, to })
    }

    /// `text`에서 이 구간의 문자열. 범위를 벗어나면 None.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        let start = char_to_byte(text, self.from)?;
        let end = char_to_byte(text, self.to)?;
        text.get(start..end)
    }
}

/// 문자 인덱스를 바이트 인덱스로 변환합니다. `index == 문자 수`도 허용(끝 위치).
pub fn char_to_byte(text: &str, index: usize) -> Option<usize> {
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .nth(index)
}

/// 제안 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    Spelling,
    Grammar,
    Style,
}

impl FromStr for Rule {
    type Err = String;

    /// 모델은 "spelling", "GRAMMAR" 등 대소문자를 섞어 쓰므로 대소문자를 무시합니다.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spelling" => Ok(Rule::Spelling),
            "grammar" => Ok(Rule::Grammar),
            "style" => Ok(Rule::Style),
            other => Err(format!("unknown rule {other:?}")),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::Spelling => "Spelling",
            Rule::Grammar => "Grammar",
            Rule::Style => "Style",
        };
        f.write_str(name)
    }
}

/// 클라이언트에게 보내는 교정 제안 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// 서버가 발급하는 제안 ID (UUIDv7)
    pub id: Uuid,
    pub range: TextRange,
    pub replacement: String,
    pub rule: Rule,
    pub explanation: String,
}
