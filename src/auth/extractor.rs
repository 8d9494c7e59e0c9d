use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::token::hash_token;
use crate::http::cookies::Cookies;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::store::User;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "jwt";

/// Extractor that authenticates the request and provides the user.
///
/// Use this in any handler that requires authentication:
/// ```ignore
/// async fn my_handler(AuthUser(user): AuthUser) -> impl IntoResponse {
///     // user is the authenticated User
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Session token from `Authorization: Bearer` or, failing that, the session
/// cookie.
pub fn session_token(headers: &HeaderMap, cookies: &Cookies) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    cookies
        .get(SESSION_COOKIE)
        .filter(|t| !t.is_empty() && *t != "loggedout")
        .map(String::from)
}

/// Resolve the session token on a request to its user.
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    cookies: &Cookies,
) -> Result<User, ApiError> {
    let token = session_token(headers, cookies).ok_or(ApiError::Unauthenticated)?;

    match state.store.find_user_by_session(&hash_token(&token)).await? {
        Some(user) => Ok(user),
        None => {
            tracing::debug!("Unknown or expired session token");
            Err(ApiError::InvalidToken)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let cookies = parts
            .extensions
            .get::<Cookies>()
            .cloned()
            .unwrap_or_else(|| Cookies::from_headers(&parts.headers));
        let user = authenticate(state, &parts.headers, &cookies).await?;
        Ok(AuthUser(user))
    }
}

/// Middleware that requires a valid session for every route it wraps.
/// The user is stored in request extensions for [`AuthUser`] to pick up.
pub async fn protect(State(state): State<AppState>, mut request: Request<Body>, next: Next) -> Response {
    let cookies = request
        .extensions()
        .get::<Cookies>()
        .cloned()
        .unwrap_or_else(|| Cookies::from_headers(request.headers()));

    let result = authenticate(&state, request.headers(), &cookies).await;
    match result {
        Ok(user) => {
            tracing::debug!(user_id = %user.id, "Authenticated request");
            request.extensions_mut().insert(AuthUser(user));
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}
