use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use plaza_core::relationships::{self, FriendRequestOutcome};
use plaza_types::api::{Claims, FriendRequestResponse, FriendRequestResult};
use plaza_types::models::{Account, FriendRequest};

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};

/// POST /users/{user}/follow. Private accounts answer 403; send a friend
/// request instead.
pub async fn follow(
    State(state): State<AppState>,
    Path(target): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |db| relationships::follow_if_public(db, claims.sub, target)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unfollow(
    State(state): State<AppState>,
    Path(target): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |db| relationships::unfollow(db, claims.sub, target)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn followers(
    State(state): State<AppState>,
    Path(account): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(blocking(&state, move |db| relationships::followers(db, account, claims.sub)).await?))
}

pub async fn following(
    State(state): State<AppState>,
    Path(account): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(blocking(&state, move |db| relationships::following(db, account, claims.sub)).await?))
}

/// POST /friend-requests/{id} where `id` is the target account.
pub async fn send_request(
    State(state): State<AppState>,
    Path(target): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let outcome = blocking(&state, move |db| relationships::send_friend_request(db, claims.sub, target)).await?;

    let (status, result, request) = match outcome {
        FriendRequestOutcome::Followed => (StatusCode::OK, FriendRequestResult::Followed, None),
        FriendRequestOutcome::Requested(r) => (StatusCode::CREATED, FriendRequestResult::Requested, Some(r)),
        FriendRequestOutcome::AlreadyPending(r) => (StatusCode::OK, FriendRequestResult::AlreadyPending, Some(r)),
    };
    Ok((status, Json(FriendRequestResponse { result, request })))
}

/// Incoming PENDING requests for the caller.
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<FriendRequest>>> {
    Ok(Json(blocking(&state, move |db| relationships::pending_requests_for(db, claims.sub)).await?))
}

pub async fn accept_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<FriendRequest>> {
    let request =
        blocking(&state, move |db| relationships::accept_friend_request(db, request_id, claims.sub)).await?;
    Ok(Json(request))
}

pub async fn reject_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<FriendRequest>> {
    let request =
        blocking(&state, move |db| relationships::reject_friend_request(db, request_id, claims.sub)).await?;
    Ok(Json(request))
}
