use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub aud: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Who the connection belongs to, bound to the session for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: String,
}

/// Failure subtypes are for logs only. The peer always sees one opaque rejection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no bearer credential on the upgrade request")]
    Missing,
    #[error("credential is malformed or carries invalid claims")]
    Malformed,
    #[error("credential has expired")]
    Expired,
    #[error("credential signature does not verify")]
    BadSignature,
}

/// Verifies HS256 bearer credentials against the pre-shared secret.
///
/// Holds no mutable state, so one instance is shared by every connection.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                _ => AuthError::Malformed,
            }
        })?;

        Ok(Identity {
            user_id: token_data.claims.sub,
            role: token_data.claims.role,
        })
    }
}

/// Browsers cannot set headers on a socket upgrade, so the `token` query
/// parameter is accepted as a fallback to `Authorization: Bearer`.
pub fn extract_bearer(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    from_header
        .or_else(|| query_token.map(str::trim).filter(|token| !token.is_empty()))
        .map(str::to_string)
}

/// Mints a credential with the claims the validator expects.
pub fn issue_token(
    user_id: &str,
    audience: &str,
    role: &str,
    ttl: Duration,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        aud: audience.to_string(),
        role: role.to_string(),
        email: None,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    fn token(ttl: Duration) -> String {
        issue_token("user-1", "authenticated", "authenticated", ttl, SECRET).unwrap()
    }

    #[test]
    fn valid_token_yields_identity() {
        let validator = TokenValidator::new(SECRET, None);
        let identity = validator.validate(&token(Duration::minutes(15))).unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.role, "authenticated");
    }

    #[test]
    fn expired_token_is_rejected() {
        let validator = TokenValidator::new(SECRET, None);
        // past the default 60s leeway
        let result = validator.validate(&token(Duration::hours(-1)));
        assert_eq!(result, Err(AuthError::Expired));
    }

    #[test]
    fn wrong_secret_is_bad_signature() {
        let validator = TokenValidator::new("other-secret", None);
        let result = validator.validate(&token(Duration::minutes(15)));
        assert_eq!(result, Err(AuthError::BadSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let validator = TokenValidator::new(SECRET, None);
        assert_eq!(validator.validate("not.a.jwt"), Err(AuthError::Malformed));
        assert_eq!(validator.validate(""), Err(AuthError::Malformed));
    }

    #[test]
    fn audience_is_checked_only_when_configured() {
        let strict = TokenValidator::new(SECRET, Some("authenticated"));
        assert!(strict.validate(&token(Duration::minutes(5))).is_ok());

        let other = TokenValidator::new(SECRET, Some("service_role"));
        assert_eq!(
            other.validate(&token(Duration::minutes(5))),
            Err(AuthError::Malformed)
        );
    }

    #[test]
    fn header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(
            extract_bearer(&headers, Some("from-query")).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn query_is_used_without_header() {
        let headers = HeaderMap::new();
        assert_eq!(
            extract_bearer(&headers, Some("from-query")).as_deref(),
            Some("from-query")
        );
        assert_eq!(extract_bearer(&headers, Some("  ")), None);
        assert_eq!(extract_bearer(&headers, None), None);
    }

    #[test]
    fn non_bearer_header_falls_back_to_query() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_bearer(&headers, None), None);
        assert_eq!(
            extract_bearer(&headers, Some("q")).as_deref(),
            Some("q")
        );
    }
}
