//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `JWT_SECRET`: Bearer 토큰 서명 검증에 사용할 비밀키 (필수)
//! - `OPENAI_API_KEY`: 언어 모델 API 키 (필수)
//! - `OPENAI_BASE_URL`: OpenAI 호환 엔드포인트 루트
//! - `OPENAI_MODEL`: 사용할 모델 이름
//! - `SUGGESTION_MODE`: `stream`(토큰 스트리밍) 또는 `batch`(구조화 출력)
//! - `JWT_AUDIENCE`: 설정되면 토큰의 `aud` 클레임이 일치해야 함
//! - `UPSTREAM_TIMEOUT_SECS`: 모델 호출 1회의 제한 시간
//! - `SESSION_IDLE_TIMEOUT_SECS`: 아무 요청 없는 세션을 닫기까지의 시간
//! - `FRONTEND_DOMAIN`: CORS 허용 출처
//! - `HOST` / `PORT`: 서버 바인딩 주소

use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

/// 설정 로딩 실패
///
/// 필수 값이 없거나, 숫자/열거형 값을 해석할 수 없으면 서버를 시작하지 않습니다.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// 제안 소스의 동작 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionMode {
    /// 토큰 스트림을 누적하면서 JSON 배열이 완성되는 순간 결과를 확정
    Stream,
    /// `response_format`으로 구조화된 JSON 객체 하나를 한 번에 받음
    Batch,
}

impl FromStr for SuggestionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" | "streaming" => Ok(Self::Stream),
            "batch" => Ok(Self::Batch),
            _ => Err(()),
        }
    }
}

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// JWT 토큰 서명 검증에 사용하는 비밀키
    pub jwt_secret: String,
    /// 토큰의 `aud` 클레임 기대값 (None이면 검사하지 않음)
    pub jwt_audience: Option<String>,
    /// 언어 모델 API 키
    pub openai_api_key: String,
    /// OpenAI 호환 API 루트 (예: "https://api.openai.com/v1")
    pub openai_base_url: String,
    /// 모델 이름 (기본값: "gpt-4.1-nano")
    pub openai_model: String,
    /// 제안 소스 동작 방식 (기본값: Stream)
    pub suggestion_mode: SuggestionMode,
    /// 모델 호출 1회 제한 시간
    pub upstream_timeout: Duration,
    /// 세션 유휴 제한 시간
    pub session_idle_timeout: Duration,
    /// CORS 허용 출처 (None이면 모든 출처 허용)
    pub frontend_domain: Option<String>,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3001)
    pub port: u16,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `JWT_SECRET`과 `OPENAI_API_KEY`는 필수입니다.
    /// 나머지는 기본값이 있지만, 값이 있는데 해석할 수 없으면 에러입니다.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            jwt_secret: required("JWT_SECRET")?,
            jwt_audience: optional("JWT_AUDIENCE"),
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            openai_model: optional("OPENAI_MODEL").unwrap_or_else(|| "gpt-4.1-nano".to_string()),
            suggestion_mode: parsed("SUGGESTION_MODE", SuggestionMode::Stream)?,
            // 초 단위 정수를 Duration으로 변환합니다.
            upstream_timeout: Duration::from_secs(parsed("UPSTREAM_TIMEOUT_SECS", 30)?),
            session_idle_timeout: Duration::from_secs(parsed("SESSION_IDLE_TIMEOUT_SECS", 600)?),
            frontend_domain: optional("FRONTEND_DOMAIN"),
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed("PORT", 3001)?,
        })
    }
}

/// 필수 환경변수: 없거나 비어 있으면 에러
fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

/// 선택 환경변수: 비어 있는 값은 없는 것으로 취급
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// 선택 환경변수를 `T`로 해석합니다. 없으면 `default`, 해석 실패는 에러.
fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_mode_parses_case_insensitively() {
        assert_eq!("Stream".parse(), Ok(SuggestionMode::Stream));
        assert_eq!(" batch ".parse(), Ok(SuggestionMode::Batch));
        assert_eq!("streaming".parse(), Ok(SuggestionMode::Stream));
        assert!("json".parse::<SuggestionMode>().is_err());
    }

    #[test]
    fn unparseable_number_is_an_error_not_a_default() {
        // 프로세스 환경을 건드리는 유일한 테스트이므로 고유한 이름을 씁니다.
        env::set_var("ASKLEO_TEST_PORT_VALUE", "not-a-port");
        let result: Result<u16, _> = parsed("ASKLEO_TEST_PORT_VALUE", 3001);
        env::remove_var("ASKLEO_TEST_PORT_VALUE");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn missing_optional_number_uses_default() {
        let port: u16 = parsed("ASKLEO_TEST_UNSET_VARIABLE", 3001).unwrap();
        assert_eq!(port, 3001);
    }
}
