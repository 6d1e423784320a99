//! Auth routes: session resolution, current profile, sign-out.
//!
//! Sessions are issued by the hosted identity service. The browser holds the
//! access token and presents it either as a bearer header or in the
//! `sb_access_token` cookie; every request resolves it to a profile.

use axum::extract::{FromRef, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use time::Duration;

use crate::state::AppState;
use crate::store::{IdentityProvider, StoreError};
use crate::survey::Profile;

pub(crate) const COOKIE_NAME: &str = "sb_access_token";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("no access token presented")]
    MissingToken,
    #[error("access token not recognised")]
    InvalidToken,
    #[error("identity service unavailable: {0}")]
    Unavailable(#[from] StoreError),
}

pub(crate) fn identity_error_to_status(err: &IdentityError) -> StatusCode {
    match err {
        IdentityError::MissingToken | IdentityError::InvalidToken => StatusCode::UNAUTHORIZED,
        IdentityError::Unavailable(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Bearer header first, then the session cookie. Blank values count as absent.
pub(crate) fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_owned());
    }

    let jar = CookieJar::from_headers(headers);
    jar.get(COOKIE_NAME)
        .map(|c| c.value().trim().to_owned())
        .filter(|t| !t.is_empty())
}

/// Resolve a token to the signed-in profile.
///
/// # Errors
///
/// `InvalidToken` when the identity service does not recognise it,
/// `Unavailable` when the lookup itself failed.
pub async fn resolve(identity: &dyn IdentityProvider, token: &str) -> Result<Profile, IdentityError> {
    identity.profile(token).await?.ok_or(IdentityError::InvalidToken)
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated identity. Use as a handler parameter to require sign-in.
pub struct AuthUser {
    pub profile: Profile,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = access_token(&parts.headers)
            .ok_or_else(|| identity_error_to_status(&IdentityError::MissingToken))?;

        match resolve(app_state.identity.as_ref(), &token).await {
            Ok(profile) => Ok(Self { profile, token }),
            Err(e) => {
                if matches!(e, IdentityError::Unavailable(_)) {
                    tracing::error!(error = %e, "session lookup failed");
                }
                Err(identity_error_to_status(&e))
            }
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub can_view_dashboard: bool,
}

/// `GET /api/auth/me` — return the current profile.
pub async fn me(auth: AuthUser) -> Json<MeResponse> {
    let can_view_dashboard = auth.profile.role.can_view_dashboard();
    Json(MeResponse { profile: auth.profile, can_view_dashboard })
}

/// `POST /api/auth/logout` — end the session, drop the live form, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = state.identity.sign_out(&auth.token).await {
        tracing::warn!(error = %e, user_id = %auth.profile.id, "sign-out at identity service failed");
    }
    state.forms.close(auth.profile.id).await;

    let cookie = Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.cookie_secure)
        .max_age(Duration::ZERO);

    let jar = CookieJar::new().add(cookie);
    (jar, StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
