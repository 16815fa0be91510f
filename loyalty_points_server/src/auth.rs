//! HS256 token issuing/validation, password hashing and the request extractor that together form
//! the authentication layer.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lpg_common::Secret;
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

/// bcrypt silently truncates everything beyond this many bytes, so longer passwords are rejected
/// up front.
pub const MAX_PASSWORD_LENGTH: usize = 72;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub user_id: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates the bearer tokens handed out on registration and login.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &Secret<String>, lifetime: Duration) -> Self {
        let key = secret.reveal().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            lifetime,
        }
    }

    pub fn issue_token(&self, user_id: i64) -> Result<String, ServerError> {
        let now = Utc::now();
        let claims = JwtClaims { user_id, iat: now.timestamp(), exp: (now + self.lifetime).timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServerError::BackendError(format!("could not sign auth token: {e}")))
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, ServerError> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| ServerError::Unauthorized(e.to_string()))
    }
}

pub fn hash_password(password: &str) -> Result<String, ServerError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| ServerError::BackendError(format!("could not hash password: {e}")))
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// The authenticated caller, extracted from the `Authorization: Bearer` header. Handlers that
/// take this parameter reject unauthenticated requests with 401.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, ServerError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::InitializeError("TokenIssuer is not configured".to_string()))?;
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ServerError::Unauthorized("missing auth token".to_string()))?;
    let token = header_value.strip_prefix("Bearer ").unwrap_or(header_value).trim();
    if token.is_empty() {
        return Err(ServerError::Unauthorized("empty auth token".to_string()));
    }
    let claims = issuer.validate_token(token)?;
    Ok(AuthenticatedUser { user_id: claims.user_id })
}
