use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pixshrink_core::AppError;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::HttpAppError;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// User id; numeric ids are accepted and kept as text
    #[serde(deserialize_with = "string_or_number")]
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Subject {
        Text(String),
        Number(i64),
    }

    Ok(match Subject::deserialize(deserializer)? {
        Subject::Text(s) => s,
        Subject::Number(n) => n.to_string(),
    })
}

/// Authenticated caller, stored in request extensions by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

impl From<JwtClaims> for AuthUser {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

// Extracted from parts so it can sit next to a Multipart extractor.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("Not authorized".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_accept_numeric_subject() {
        let claims: JwtClaims =
            serde_json::from_str(r#"{"sub": 42, "exp": 2000000000, "iat": 1700000000}"#).unwrap();
        assert_eq!(claims.sub, "42");
        assert!(claims.email.is_none());
    }

    #[test]
    fn test_claims_accept_text_subject() {
        let claims: JwtClaims = serde_json::from_str(
            r#"{"sub": "user-7", "email": "a@b.c", "exp": 2000000000, "iat": 1700000000}"#,
        )
        .unwrap();
        let user = AuthUser::from(claims);
        assert_eq!(user.user_id, "user-7");
        assert_eq!(user.email.as_deref(), Some("a@b.c"));
    }
}
