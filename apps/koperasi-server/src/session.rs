//! Session token handling.
//!
//! The session is a signed token (HS256) stored in the HTTP-only cookie
//! `koperasi_session`. It carries the public profile of the user so the UI can
//! render without another round trip; the server still reloads the account on
//! every request.

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use koperasi_core::{Role, User};

use crate::config::ServerConfig;
use crate::error::ApiError;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "koperasi_session";

/// Session claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Issues and checks session tokens.
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
    cookie_secure: bool,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl_secs", &self.ttl_secs)
            .field("cookie_secure", &self.cookie_secure)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(secret: &str, ttl_secs: i64, cookie_secure: bool) -> Self {
        SessionManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
            cookie_secure,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        SessionManager::new(&config.session_secret, config.session_ttl_secs, config.cookie_secure)
    }

    /// Signs a session for a freshly authenticated user.
    pub fn issue(&self, user: &User) -> Result<(String, SessionClaims), ApiError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.ttl_secs);

        let claims = SessionClaims {
            user_id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            is_active: user.is_active,
            expires_at,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign session");
            ApiError::internal()
        })?;

        Ok((token, claims))
    }

    /// Validates signature and expiry.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::unauthenticated("Session expired, please log in again")
                }
                _ => ApiError::unauthenticated("Invalid session"),
            })?
            .claims;

        if !claims.is_active {
            return Err(ApiError::unauthenticated("Invalid session"));
        }
        Ok(claims)
    }

    /// `Set-Cookie` value carrying a new session.
    pub fn cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, token, self.ttl_secs
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that removes the session.
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Finds the session token: the cookie first, then `Authorization: Bearer`.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user(is_active: bool) -> User {
        User {
            id: "u-1".to_string(),
            username: "kasir".to_string(),
            email: "kasir@koperasi.local".to_string(),
            full_name: "Kasir Koperasi".to_string(),
            password_hash: String::new(),
            role: Role::Kasir,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let sessions = SessionManager::new("a-test-secret-that-is-long-enough!!", 3600, false);
        let (token, claims) = sessions.issue(&user(true)).unwrap();

        let verified = sessions.verify(&token).unwrap();
        assert_eq!(verified, claims);
        assert_eq!(verified.role, Role::Kasir);
        assert_eq!(verified.exp - verified.iat, 3600);
    }

    #[test]
    fn test_rejects_foreign_and_expired_tokens() {
        let sessions = SessionManager::new("a-test-secret-that-is-long-enough!!", 3600, false);
        let other = SessionManager::new("another-secret-that-is-long-enough!", 3600, false);
        let (token, _) = other.issue(&user(true)).unwrap();
        assert!(sessions.verify(&token).is_err());

        let expired = SessionManager::new("a-test-secret-that-is-long-enough!!", -10, false);
        let (token, _) = expired.issue(&user(true)).unwrap();
        let err = sessions.verify(&token).unwrap_err();
        assert!(err.message.contains("expired"));
    }

    #[test]
    fn test_cookie_attributes() {
        let sessions = SessionManager::new("a-test-secret-that-is-long-enough!!", 60, true);
        let cookie = sessions.cookie("abc");
        assert!(cookie.starts_with("koperasi_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=60"));
        assert!(cookie.ends_with("; Secure"));
        assert!(sessions.clear_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_token_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; koperasi_session=tok123"));
        assert_eq!(token_from_headers(&headers), Some("tok123"));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok456"));
        assert_eq!(token_from_headers(&headers), Some("tok456"));

        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }
}
