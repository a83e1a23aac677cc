//! Authentication handlers

use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::{CurrentUser, SessionUser};
use crate::services::AuthService;
use crate::AppState;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: SessionUser,
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Login endpoint handler. Sets the session cookie and returns the token.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    body.validate()?;

    let auth_service = AuthService::new(state.db.clone(), &state.config.auth);
    let session = auth_service.login(&body.username, &body.password).await?;

    let cookie = Cookie::build((state.config.auth.cookie_name.clone(), session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.auth.secure_cookie)
        .build();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            user: session.user,
            token: session.token,
            token_type: "Bearer".to_string(),
            expires_at: session.expires_at,
        }),
    ))
}

/// Logout endpoint handler. Clears the session cookie.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let removal = Cookie::build((state.config.auth.cookie_name.clone(), "")).path("/");
    (
        jar.remove(removal),
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// Current session
pub async fn session(CurrentUser(user): CurrentUser) -> Json<SessionUser> {
    Json(user)
}
