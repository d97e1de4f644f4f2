//! # SSE 줄 디코더
//!
//! OpenAI 형식의 server-sent events를 줄 단위로 해석합니다.
//!
//! 네트워크 청크는 줄 중간에서도 잘리므로 개행이 올 때까지 바이트를 모아 둡니다.
//! 여기서는 `data:` 필드만 의미가 있고 주석, `event:`, `id:` 줄은 건너뜁니다.
//! 바이트 단위로 모으므로 청크 경계에서 잘린 멀티바이트 문자(한글 등)도 깨지지 않습니다.

/// 해석된 `data:` 페이로드 하나
#[derive(Debug, PartialEq, Eq)]
pub enum SseData {
    Json(String),
    /// `data: [DONE]`
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    /// 청크 하나를 넣고, 이 청크로 완성된 줄들의 페이로드를 돌려줍니다.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseData> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            if let Some(data) = decode_line(&line) {
                events.push(data);
            }
        }
        events
    }

    /// 개행 없이 끝난 마지막 줄을 해석합니다.
    pub fn finish(&mut self) -> Option<SseData> {
        let line = std::mem::take(&mut self.pending);
        decode_line(&line)
    }
}

fn decode_line(line: &[u8]) -> Option<SseData> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);
    let payload = line.strip_prefix("data:")?.trim_start();
    match payload {
        "" => None,
        "[DONE]" => Some(SseData::Done),
        json => Some(SseData::Json(json.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_lines_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        assert_eq!(
            decoder.push(b"1}\n\ndata: [DONE]\n"),
            vec![SseData::Json("{\"a\":1}".into()), SseData::Done]
        );
    }

    #[test]
    fn skips_comments_and_other_fields() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\r\nevent: message\r\ndata: {}\r\n\r\n");
        assert_eq!(events, vec![SseData::Json("{}".into())]);
    }

    #[test]
    fn multibyte_characters_split_mid_chunk_survive() {
        let line = "data: {\"c\":\"환자\"}\n".as_bytes();
        let (head, tail) = line.split_at(14);
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(head).is_empty());
        assert_eq!(decoder.push(tail), vec![SseData::Json("{\"c\":\"환자\"}".into())]);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), Some(SseData::Done));
        assert_eq!(decoder.finish(), None);
    }
}
