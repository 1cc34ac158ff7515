//! JWT access tokens for the dashboard routes.
//!
//! Tokens are HS256-signed with the `JWT_SECRET` and carry the subject id and a single role. Clients present them
//! in the `admin_token` or `seller-auth-token` cookie, or as an `Authorization: Bearer` header.
use std::{
    fmt::Display,
    future::{ready, Ready},
};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mpg_common::Secret;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

pub const ADMIN_COOKIE: &str = "admin_token";
pub const SELLER_COOKIE: &str = "seller-auth-token";
const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Seller,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Seller => write!(f, "seller"),
        }
    }
}

impl Role {
    /// The cookie this role's dashboard stores its token in.
    pub fn cookie_name(&self) -> &'static str {
        match self {
            Role::Admin => ADMIN_COOKIE,
            Role::Seller => SELLER_COOKIE,
        }
    }
}

/// The claims carried in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The admin or seller id.
    pub sub: i64,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req
            .extensions()
            .get::<JwtClaims>()
            .cloned()
            .ok_or(ServerError::AuthenticationError(AuthError::MissingToken));
        ready(claims)
    }
}

/// Issues and validates HS256 access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        Self { encoding_key: EncodingKey::from_secret(secret), decoding_key: DecodingKey::from_secret(secret) }
    }

    pub fn issue_token(&self, sub: i64, role: Role) -> Result<String, ServerError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub,
            role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServerError::AuthenticationError(AuthError::CouldNotSerializeToken(e.to_string())))
    }

    pub fn decode_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}

/// Builds a `TokenIssuer` directly from a secret. Convenience for tests and tooling.
pub fn issuer_from_secret(secret: &str) -> TokenIssuer {
    TokenIssuer::new(&AuthConfig { jwt_secret: Secret::new(secret.to_string()) })
}
