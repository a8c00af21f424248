//! Authentication: password hashing, session tokens, cookies and the
//! request guard.
//!
//! A request is authenticated either by `Authorization: Bearer <token>` or by
//! the HttpOnly session cookie. Cookie sessions must echo the CSRF cookie in
//! the `X-CSRF-Token` header on state-changing methods.

pub mod cookies;
pub mod middleware;
pub mod token;

use anyhow::{Result, anyhow};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::http::{HeaderMap, Method, header};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::warn;

use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::types::User;
use token::{Claims, TokenError, TokenSigner};

/// Header carrying the CSRF token on cookie-authenticated requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// The authenticated caller, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
        }
    }
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub csrf_token: String,
}

/// Token issuing and request authentication.
pub struct AuthService {
    signer: TokenSigner,
    config: AuthConfig,
}

impl AuthService {
    /// Build from config. Without a configured secret a random one is used,
    /// so sessions do not survive a restart.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let secret = match config.jwt_secret {
            Some(ref secret) => secret.as_bytes().to_vec(),
            None => {
                warn!("No auth.jwt_secret configured; sessions will not survive a restart");
                random_bytes(32)?
            }
        };
        Ok(Self {
            signer: TokenSigner::new(&secret, config.token_ttl_seconds),
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Issue a session token plus CSRF token for `user`.
    pub fn issue(&self, user: &User) -> Result<Session> {
        let now = chrono::Utc::now().timestamp();
        Ok(Session {
            token: self.signer.issue(&user.id, &user.email, now)?,
            csrf_token: random_token()?,
        })
    }

    /// Verify a bare token.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.signer.verify(token, chrono::Utc::now().timestamp())
    }

    /// Authenticate a request from its headers.
    pub fn authenticate(&self, method: &Method, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
        if let Some(token) = bearer_token(headers) {
            let claims = self
                .verify(token)
                .map_err(|e| ApiError::unauthorized(e.to_string()))?;
            return Ok(claims.into());
        }

        let Some(token) = cookies::get(headers, &self.config.cookie_name) else {
            return Err(ApiError::unauthorized("Authentication required"));
        };
        let claims = self
            .verify(token)
            .map_err(|e| ApiError::unauthorized(e.to_string()))?;

        if is_unsafe(method) {
            let cookie = cookies::get(headers, &self.config.csrf_cookie_name);
            let header = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
            match (cookie, header) {
                (Some(c), Some(h)) if !c.is_empty() && constant_time_eq(c, h) => {}
                _ => return Err(ApiError::csrf_mismatch()),
            }
        }
        Ok(claims.into())
    }

    /// `Set-Cookie` values establishing a session.
    pub fn session_cookies(&self, session: &Session) -> [String; 2] {
        let max_age = self.signer.ttl_seconds();
        [
            cookies::build(
                &self.config.cookie_name,
                &session.token,
                max_age,
                true,
                self.config.cookie_secure,
            ),
            cookies::build(
                &self.config.csrf_cookie_name,
                &session.csrf_token,
                max_age,
                false,
                self.config.cookie_secure,
            ),
        ]
    }

    /// `Set-Cookie` values removing the session.
    pub fn clear_cookies(&self) -> [String; 2] {
        [
            cookies::build(&self.config.cookie_name, "", 0, true, self.config.cookie_secure),
            cookies::build(
                &self.config.csrf_cookie_name,
                "",
                0,
                false,
                self.config.cookie_secure,
            ),
        ]
    }
}

/// Hash a password into an argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("password hashing failed: {}", e))
}

/// Check a password against a stored PHC string. Unparseable hashes never match.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

fn is_unsafe(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| anyhow!("system random source unavailable"))?;
    Ok(buf)
}

/// A random URL-safe token.
pub fn random_token() -> Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(random_bytes(32)?))
}
