//! # WebSocket 메시지 모델
//!
//! 클라이언트 → 서버:
//! ```text
//! { "docId": "<uuid>", "text": "<string>" }
//! ```
//!
//! 서버 → 클라이언트 (셋 중 하나):
//! ```text
//! { "type": "suggestion", "payload": { "id", "range", "replacement", "rule", "explanation" } }
//! { "type": "error",      "payload": { "message": "..." } }
//! { "type": "complete",   "payload": { "message": "..." } }
//! ```
//!
//! 요청 하나당 `suggestion`이 0개 이상 나가고, 그 뒤에 `complete` 또는 `error`가
//! 정확히 한 번 나갑니다.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ProtocolError, models::Suggestion};

/// 분석 요청: 현재 문서 전체 텍스트 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub doc_id: Uuid,
    pub text: String,
}

/// 역직렬화 전용. docId를 문자열로 먼저 받아 UUID 오류를 따로 구분합니다.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysisRequest {
    doc_id: String,
    text: String,
}

impl AnalysisRequest {
    /// 텍스트 프레임 하나를 요청으로 해석합니다.
    ///
    /// 빈 텍스트는 형식 오류가 아닙니다. 세션이 모델 호출 없이 바로 `complete`로 응답합니다.
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let raw: RawAnalysisRequest = serde_json::from_str(frame)?;
        let doc_id = Uuid::parse_str(raw.doc_id.trim())
            .map_err(|_| ProtocolError::InvalidDocId(raw.doc_id.clone()))?;
        Ok(Self {
            doc_id,
            text: raw.text,
        })
    }

    /// 공백뿐인 텍스트인지
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// `error` / `complete` 메시지의 본문
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum OutgoingMessage {
    Suggestion(Suggestion),
    Error(Notice),
    Complete(Notice),
}

impl OutgoingMessage {
    pub const ANALYSIS_COMPLETE: &'static str = "Analysis complete";
    pub const ANALYSIS_SUPERSEDED: &'static str = "Analysis superseded";

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(Notice {
            message: message.into(),
        })
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::Complete(Notice {
            message: message.into(),
        })
    }

    /// 요청 하나의 마지막 메시지인지 (`complete` 또는 `error`)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Suggestion(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rule, TextRange};
    use serde_json::json;

    #[test]
    fn parses_camel_case_request() {
        let id = Uuid::now_v7();
        let frame = json!({ "docId": id.to_string(), "text": "Pt hasnt felt rite today." }).to_string();
        let req = AnalysisRequest::parse(&frame).unwrap();
        assert_eq!(req.doc_id, id);
        assert_eq!(req.text, "Pt hasnt felt rite today.");
    }

    #[test]
    fn rejects_bad_uuid_and_missing_fields() {
        let bad_id = json!({ "docId": "doc-1", "text": "hello" }).to_string();
        assert!(matches!(
            AnalysisRequest::parse(&bad_id),
            Err(ProtocolError::InvalidDocId(_))
        ));

        let missing_text = json!({ "docId": Uuid::now_v7().to_string() }).to_string();
        assert!(matches!(
            AnalysisRequest::parse(&missing_text),
            Err(ProtocolError::InvalidJson(_))
        ));

        assert!(AnalysisRequest::parse("{not json").is_err());
    }

    #[test]
    fn blank_text_is_accepted_but_flagged() {
        let frame = json!({ "docId": Uuid::now_v7().to_string(), "text": "  \n\t" }).to_string();
        assert!(AnalysisRequest::parse(&frame).unwrap().is_blank());
    }

    #[test]
    fn outgoing_messages_use_type_and_payload() {
        let suggestion = Suggestion {
            id: Uuid::nil(),
            range: TextRange::new(3, 8).unwrap(),
            replacement: "hasn't".into(),
            rule: Rule::Spelling,
            explanation: "Missing apostrophe".into(),
        };
        let value = serde_json::to_value(OutgoingMessage::Suggestion(suggestion)).unwrap();
        assert_eq!(value["type"], "suggestion");
        assert_eq!(value["payload"]["range"], json!({ "from": 3, "to": 8 }));
        assert_eq!(value["payload"]["rule"], "Spelling");

        let value = serde_json::to_value(OutgoingMessage::complete("Analysis complete")).unwrap();
        assert_eq!(value, json!({ "type": "complete", "payload": { "message": "Analysis complete" } }));
    }

    #[test]
    fn terminal_messages() {
        assert!(OutgoingMessage::error("x").is_terminal());
        assert!(OutgoingMessage::complete("x").is_terminal());
    }
}
