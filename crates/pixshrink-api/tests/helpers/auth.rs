use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use pixshrink_api::auth::JwtClaims;

/// Secret shared by the test app and the tokens minted here
pub const TEST_JWT_SECRET: &str = "pixshrink-test-secret-at-least-32-characters";

/// HS256 token for `user_id`, valid for an hour
pub fn token_for(user_id: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        email: Some(format!("{}@example.com", user_id)),
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// `Authorization` header value for `user_id`
pub fn bearer(user_id: &str) -> String {
    format!("Bearer {}", token_for(user_id))
}
