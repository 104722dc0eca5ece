//! Bearer-token identity for API routes.
//!
//! The auth collaborator issues tokens carrying the authenticated user id and
//! an admin flag; this module only decodes them. With `ADVENTIDE_JWT_SECRET`
//! set, tokens are fully HS256-verified; without it, claims are decoded
//! unverified (development mode). No credential ever reaches this service.
//!
//! Admin-only routes use the `RequireAdmin` extractor to gate access.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims minted by the auth collaborator.
#[derive(Debug, Deserialize)]
struct IdentityClaims {
    /// Subject — the stable user id, as a decimal string.
    sub: String,
    /// Whether the auth service marked this user as an admin.
    #[serde(default)]
    admin: bool,
}

/// Authenticated caller identity, as extracted from the bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub is_admin: bool,
}

fn jwt_secret() -> Option<String> {
    std::env::var("ADVENTIDE_JWT_SECRET").ok()
}

/// Decode and optionally verify an identity token.
///
/// If `ADVENTIDE_JWT_SECRET` is set, performs full HS256 verification.
/// Otherwise, decodes without signature validation (development mode).
fn decode_token(token: &str) -> Result<IdentityClaims, String> {
    if let Some(secret) = jwt_secret() {
        let key = DecodingKey::from_secret(secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<IdentityClaims>(token, &key, &validation)
            .map_err(|e| format!("token verification failed: {e}"))?;
        Ok(data.claims)
    } else {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        let data = decode::<IdentityClaims>(token, &DecodingKey::from_secret(b""), &validation)
            .map_err(|e| format!("token decode failed: {e}"))?;
        Ok(data.claims)
    }
}

/// Pull the caller's identity out of the Authorization header, if present
/// and well-formed.
fn extract_auth_user(parts: &Parts) -> Option<AuthUser> {
    let auth_header = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_header.strip_prefix("Bearer ")?;
    let claims = decode_token(token).ok()?;
    let user_id = claims.sub.parse().ok()?;
    Some(AuthUser {
        user_id,
        is_admin: claims.admin,
    })
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "Authentication required"})),
    )
        .into_response()
}

/// Axum extractor that requires any authenticated user.
///
/// Returns 401 if no valid identity token is present.
pub struct RequireAuth(pub AuthUser);

impl<S: Send + Sync> FromRequestParts<S> for RequireAuth {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = extract_auth_user(parts).ok_or_else(unauthorized)?;
        Ok(RequireAuth(auth_user))
    }
}

/// Axum extractor that requires an authenticated admin user.
///
/// Returns 401 if no valid identity token is present, 403 if the caller is
/// not an admin.
pub struct RequireAdmin(pub AuthUser);

impl<S: Send + Sync> FromRequestParts<S> for RequireAdmin {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = extract_auth_user(parts).ok_or_else(unauthorized)?;
        if !auth_user.is_admin {
            return Err((
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"error": "Admin access required"})),
            )
                .into_response());
        }
        Ok(RequireAdmin(auth_user))
    }
}
