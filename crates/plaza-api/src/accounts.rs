use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use plaza_core::accounts::ProfileUpdate;
use plaza_core::{SocialError, accounts, relationships};
use plaza_types::api::{Claims, ProfileResponse, UpdateProfileRequest};
use plaza_types::models::Account;

use crate::auth::{AppState, check_password, hash_password};
use crate::error::{ApiResult, blocking};

pub async fn list_users(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(blocking(&state, accounts::list).await?))
}

/// GET /users/{user} where `user` is a username.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = blocking(&state, move |db| {
        let account = accounts::find_by_username(db, &username)?.ok_or(SocialError::NotFound("account"))?;
        let (followers, following) = relationships::follow_counts(db, account.id)?;
        Ok(ProfileResponse {
            followed_by_me: relationships::is_following(db, claims.sub, account.id)?,
            request_pending: relationships::has_pending_request(db, claims.sub, account.id)?,
            account,
            followers,
            following,
        })
    })
    .await?;
    Ok(Json(profile))
}

/// PATCH /me. Renames, changes the password or flips privacy; a new
/// username must be free.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Account>> {
    if let Some(password) = &req.password {
        check_password(password)?;
    }

    let account = blocking(&state, move |db| {
        let password_hash = req.password.as_deref().map(hash_password).transpose()?;
        let update = ProfileUpdate {
            username: req.username.as_deref(),
            password_hash: password_hash.as_deref(),
            private: req.private,
        };
        accounts::update_profile(db, claims.sub, &update)
    })
    .await?;
    Ok(Json(account))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(target): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |db| accounts::delete(db, claims.sub, target)).await?;
    Ok(StatusCode::NO_CONTENT)
}
