//! # 모델 출력 파싱
//!
//! 모델 출력을 검증된 [`Suggestion`] 목록으로 바꿉니다.
//!
//! 모델 출력은 신뢰할 수 없습니다.
//! - 설명 문장이나 마크다운 코드 펜스(```)로 감싸져 올 수 있음
//! - 스트림 도중에 끊길 수 있음
//! - 오프셋이 몇 글자씩 어긋나는 일이 잦음
//!
//! 필드가 빠졌거나 타입이 틀린 레코드가 하나라도 있으면 호출 전체가 실패합니다.
//! 제출된 텍스트 안에 놓을 수 없는 범위의 레코드는 버리므로, 내보내는 모든 범위는
//! `0 <= from <= to <= len`을 만족합니다.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::UpstreamError,
    models::{Rule, Suggestion, TextRange},
};

/// 버퍼에서 아직 완성된 배열을 읽지 못한 이유
#[derive(Debug, PartialEq, Eq)]
pub enum ScanError {
    /// 배열이 열렸지만 닫히지 않음. 토큰이 더 오면 완성될 수 있음
    Incomplete,
    /// 버퍼 어디에도 배열로 파싱되는 부분이 없음
    Invalid(String),
}

/// `buffer`에서 처음으로 완성된 JSON 배열을 찾습니다.
///
/// 앞쪽의 설명 문장과 코드 펜스는 건너뛰고, 닫는 대괄호 뒤의 내용은 무시합니다.
pub fn find_array(buffer: &str) -> Result<Vec<Value>, ScanError> {
    let mut last_error = None;

    for (start, _) in buffer.match_indices('[') {
        let mut values = serde_json::Deserializer::from_str(&buffer[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Array(items))) => return Ok(items),
            Some(Err(e)) if e.is_eof() => return Err(ScanError::Incomplete),
            Some(Err(e)) => last_error = Some(e.to_string()),
            Some(Ok(_)) | None => {}
        }
    }

    Err(ScanError::Invalid(
        last_error.unwrap_or_else(|| "no JSON array in model output".to_string()),
    ))
}

/// 배치 모드 본문 `{"suggestions": [...]}`을 파싱합니다. 코드 펜스와 맨 배열도 허용합니다.
pub fn parse_batch_content(content: &str) -> Result<Vec<Value>, UpstreamError> {
    let body = strip_fences(content);
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(mut object)) => match object.remove("suggestions") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(UpstreamError::Unparseable(format!(
                "`suggestions` is not an array: {other}"
            ))),
        },
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(UpstreamError::Unparseable(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(UpstreamError::Unparseable(e.to_string())),
    }
}

fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // 언어 태그 줄 제거 (예: ```json)
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.trim_end().trim_end_matches("```").trim()
}

#[derive(Deserialize)]
struct RawRange {
    from: i64,
    to: i64,
}

#[derive(Deserialize)]
struct RawSuggestion {
    range: RawRange,
    replacement: String,
    rule: String,
    explanation: String,
    #[serde(default)]
    original: Option<String>,
}

/// 모델 레코드를 그 레코드가 계산된 텍스트 기준으로 검증합니다.
pub fn into_suggestions(text: &str, records: Vec<Value>) -> Result<Vec<Suggestion>, UpstreamError> {
    let char_len = text.chars().count();
    let mut suggestions = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let raw: RawSuggestion = serde_json::from_value(record)
            .map_err(|e| UpstreamError::InvalidSuggestion {
                index,
                reason: e.to_string(),
            })?;
        let rule: Rule = raw
            .rule
            .parse()
            .map_err(|reason| UpstreamError::InvalidSuggestion { index, reason })?;

        let Some(range) = locate(text, char_len, &raw.range, raw.original.as_deref()) else {
            tracing::warn!(
                index,
                from = raw.range.from,
                to = raw.range.to,
                text_len = char_len,
                "dropping suggestion whose range does not fit the submitted text"
            );
            continue;
        };

        if range.slice(text) == Some(raw.replacement.as_str()) {
            tracing::debug!(index, "dropping no-op suggestion");
            continue;
        }

        suggestions.push(Suggestion {
            id: Uuid::now_v7(),
            range,
            replacement: raw.replacement,
            rule,
            explanation: raw.explanation,
        });
    }

    Ok(suggestions)
}

/// 레코드의 범위를 `text` 안에 배치합니다.
///
/// 모델이 `original`(범위가 덮는 텍스트)도 함께 보냈는데 주장한 오프셋과 맞지 않으면,
/// 주장한 위치에서 가장 가까운 `original`의 위치를 씁니다.
fn locate(text: &str, char_len: usize, claimed: &RawRange, original: Option<&str>) -> Option<TextRange> {
    let in_bounds = usize::try_from(claimed.from)
        .ok()
        .zip(usize::try_from(claimed.to).ok())
        .and_then(|(from, to)| TextRange::new(from, to))
        .filter(|range| range.to <= char_len);

    let Some(original) = original.filter(|o| !o.is_empty()) else {
        return in_bounds;
    };

    if let Some(range) = in_bounds {
        if range.slice(text) == Some(original) {
            return Some(range);
        }
    }

    let near = usize::try_from(claimed.from).unwrap_or(0);
    nearest_occurrence(text, original, near)
}

fn nearest_occurrence(text: &str, needle: &str, near: usize) -> Option<TextRange> {
    let needle_len = needle.chars().count();
    text.match_indices(needle)
        .map(|(byte, _)| text[..byte].chars().count())
        .min_by_key(|start| start.abs_diff(near))
        .map(|start| TextRange {
            from: start,
            to: start + needle_len,
        })
}
