// src/utils/jwt.rs

use chrono::Utc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use uuid::Uuid;

use crate::{config::Config, error::AppError};

/// Roles allowed to see other learners' data.
const EDUCATOR_ROLES: [&str; 2] = ["educator", "admin"];

/// JWT Claims structure, issued by the sign-in bridge.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the learner identifier.
    pub sub: String,
    /// Display name, if the identity provider supplied one.
    #[serde(default)]
    pub name: Option<String>,
    /// 'student', 'educator' or 'admin'.
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Claims of a quiz token: a handle on a quiz kept by the history store.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QuizClaims {
    /// Learner the quiz was generated for.
    pub sub: String,
    /// Quiz id. Also becomes the id of the stored attempt.
    pub jti: Uuid,
    pub exp: usize,
}

fn expires_in(expiration_seconds: u64) -> usize {
    (Utc::now().timestamp().max(0) as u64 + expiration_seconds) as usize
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

fn verify<T: DeserializeOwned>(token: &str, secret: &str, what: &str) -> Result<T, AppError> {
    let token_data = decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError(format!("Invalid {}", what)))?;

    Ok(token_data.claims)
}

/// Signs an identity token. Used by the sign-in bridge and tests.
pub fn sign_jwt(
    learner_id: &str,
    name: Option<&str>,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: learner_id.to_owned(),
        name: name.map(str::to_owned),
        role: role.to_owned(),
        exp: expires_in(expiration_seconds),
    };
    sign(&claims, secret)
}

/// Verifies and decodes an identity token.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    verify(token, secret, "token")
}

/// Signs a token naming quiz `quiz_id` for `learner_id`.
pub fn sign_quiz_token(
    learner_id: &str,
    quiz_id: Uuid,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = QuizClaims {
        sub: learner_id.to_owned(),
        jti: quiz_id,
        exp: expires_in(expiration_seconds),
    };
    sign(&claims, secret)
}

/// Decodes a quiz token and checks it belongs to `learner_id`.
pub fn verify_quiz_token(token: &str, secret: &str, learner_id: &str) -> Result<QuizClaims, AppError> {
    let claims: QuizClaims = verify(token, secret, "quiz token")?;
    if claims.sub != learner_id {
        return Err(AppError::AuthError("Quiz token belongs to another learner".to_string()));
    }
    Ok(claims)
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, validates the 'Authorization: Bearer <token>' header.
/// If valid, injects `Claims` into the request extensions for handlers to use.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    match verify_jwt(token, &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Axum Middleware: Educator Authorization.
///
/// Must be used AFTER `auth_middleware`. Lets educators and admins through.
/// Anyone else gets 403 Forbidden.
pub async fn educator_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::AuthError("Missing identity".to_string()))?;

    if !EDUCATOR_ROLES.contains(&claims.role.as_str()) {
        return Err(AppError::Forbidden("Educator access required".to_string()));
    }

    Ok(next.run(req).await)
}
