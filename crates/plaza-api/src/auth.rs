use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Duration;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use plaza_core::{SocialError, accounts, stories};
use plaza_db::Database;
use plaza_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::{ApiError, ApiResult, blocking};

pub const PASSWORD_MIN: usize = 8;
pub const DEFAULT_TOKEN_DAYS: i64 = 30;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_days: i64,
    /// Stories older than this are no longer served.
    pub story_ttl: Duration,
    /// Usernames that receive the admin role on registration.
    pub admin_usernames: Vec<String>,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: impl Into<String>) -> Self {
        Self {
            db,
            jwt_secret: jwt_secret.into(),
            token_days: DEFAULT_TOKEN_DAYS,
            story_ttl: stories::default_ttl(),
            admin_usernames: Vec::new(),
        }
    }

    pub fn is_admin_username(&self, username: &str) -> bool {
        self.admin_usernames.iter().any(|name| name == username)
    }
}

pub fn check_password(password: &str) -> ApiResult<()> {
    if password.len() < PASSWORD_MIN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {PASSWORD_MIN} characters"
        )));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, SocialError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| SocialError::Storage(anyhow::anyhow!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    check_password(&req.password)?;

    let make_admin = state.is_admin_username(&req.username);
    let account = blocking(&state, move |db| {
        accounts::validate_username(&req.username)?;
        let password_hash = hash_password(&req.password)?;

        let mut account = accounts::register(db, &req.username, &password_hash)?;
        if make_admin {
            account = accounts::grant_admin(db, account.id)?;
        }
        if req.private {
            account = accounts::set_private(db, account.id, true)?;
        }
        Ok(account)
    })
    .await?;

    let token = create_token(&state.jwt_secret, account.id, &account.username, state.token_days)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: account.id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let username = req.username.clone();
    let verified = blocking(&state, move |db| {
        let Some(row) = db.get_account_by_username(&req.username)? else {
            return Ok(None);
        };
        let parsed_hash = PasswordHash::new(&row.password)
            .map_err(|e| SocialError::Storage(anyhow::anyhow!("stored hash unreadable: {e}")))?;
        if Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Ok(None);
        }
        Ok(Some(row.into_account()?))
    })
    .await?;

    let Some(account) = verified else {
        warn!("Failed login for {}", username);
        return Err(ApiError::Unauthorized);
    };

    let token = create_token(&state.jwt_secret, account.id, &account.username, state.token_days)?;
    info!("{} logged in", account.username);

    Ok(Json(LoginResponse {
        user_id: account.id,
        username: account.username,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str, days: i64) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + Duration::days(days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
