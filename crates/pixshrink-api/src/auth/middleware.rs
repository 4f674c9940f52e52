use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use pixshrink_core::AppError;

use super::models::{AuthUser, JwtClaims};
use crate::error::HttpAppError;

/// Verification settings shared by every protected route
#[derive(Clone)]
pub struct AuthState {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthState {
    /// HS256 verification with the shared secret
    pub fn new(jwt_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, jsonwebtoken::errors::Error> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map(|data| data.claims)
    }
}

fn unauthorized(message: &str) -> Response {
    HttpAppError(AppError::Unauthorized(message.to_string())).into_response()
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => return unauthorized("No token, authorization denied"),
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return unauthorized("Invalid authorization header format");
    };

    let claims = match auth_state.verify(token.trim()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Token verification failed");
            return unauthorized("Token is not valid");
        }
    };

    tracing::debug!(user_id = %claims.sub, "Request authenticated");
    request.extensions_mut().insert(AuthUser::from(claims));

    next.run(request).await
}
