//! Authentication service: credential login and session tokens

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{Role, User};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::SessionUser;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    session_secret: String,
    session_ttl_seconds: i64,
}

/// Session token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // User ID
    pub username: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// A freshly issued session
#[derive(Debug, Serialize)]
pub struct IssuedSession {
    pub user: SessionUser,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &AuthConfig) -> Self {
        Self {
            db,
            session_secret: config.session_secret.clone(),
            session_ttl_seconds: config.session_ttl_seconds,
        }
    }

    /// Check username and password and issue a session
    pub async fn login(&self, username: &str, password: &str) -> AppResult<IssuedSession> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, role, is_active, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            tracing::warn!(username = %user.username, "Login attempt for inactive user");
            return Err(AppError::InvalidCredentials);
        }

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            tracing::warn!(username = %user.username, "Login attempt with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let session_user = SessionUser {
            user_id: user.id,
            username: user.username,
            role: user.role,
        };
        let (token, expires_at) =
            issue_session_token(&session_user, &self.session_secret, self.session_ttl_seconds)?;

        tracing::info!(user_id = %session_user.user_id, role = session_user.role.as_str(), "User logged in");

        Ok(IssuedSession {
            user: session_user,
            token,
            expires_at,
        })
    }
}

/// Sign a session token for the user
pub fn issue_session_token(
    user: &SessionUser,
    secret: &str,
    ttl_seconds: i64,
) -> AppResult<(String, DateTime<Utc>)> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(ttl_seconds);
    let claims = SessionClaims {
        sub: user.user_id.to_string(),
        username: user.username.clone(),
        role: user.role,
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))?;

    Ok((token, expires_at))
}

/// Decode and validate a session token
pub fn decode_session_token(token: &str, secret: &str) -> Result<SessionUser, String> {
    let claims = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid session: {}", e))?;

    let user_id =
        Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in session".to_string())?;

    Ok(SessionUser {
        user_id,
        username: claims.username,
        role: claims.role,
    })
}

/// Hash a password for storage
pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}
