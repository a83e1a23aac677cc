//! Authentication middleware
//!
//! Resolves the session once per request and stores it as a request
//! extension. Handlers read it through the [`CurrentUser`] extractor.

use axum::{
    extract::{Request, State},
    http::{header::ACCEPT, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{Deserialize, Serialize};
use shared::Role;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::decode_session_token;
use crate::AppState;

/// Where unauthenticated browser navigations are sent
pub const LOGIN_PATH: &str = "/login";

/// Authenticated user carried by the session token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

/// Authentication middleware that validates the session token.
///
/// The token is read from the session cookie, falling back to an
/// `Authorization: Bearer` header for API clients.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = jar
        .get(&state.config.auth.cookie_name)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| bearer.map(|TypedHeader(auth)| auth.token().to_string()));

    let Some(token) = token else {
        return reject(request.headers(), "Authentication required");
    };

    match decode_session_token(&token, &state.config.auth.session_secret) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(msg) => reject(request.headers(), &msg),
    }
}

/// Browsers get a redirect to the login page, API clients a 401
fn reject(headers: &HeaderMap, message: &str) -> Response {
    if wants_html(headers) {
        return Redirect::to(LOGIN_PATH).into_response();
    }
    unauthorized_response(message)
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized {
        message: message.to_string(),
        message_es: "No autorizado".to_string(),
    }
    .into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub SessionUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| unauthorized_response("Authentication required"))
    }
}
