use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use plaza_core::posts::{self, DEFAULT_FEED};
use plaza_types::api::{Claims, CreatePostRequest, FeedItem, ToggleResponse};

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_FEED
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let post = blocking(&state, move |db| {
        posts::create_post(db, claims.sub, req.body.as_deref(), req.image.as_deref())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |db| posts::delete_post(db, post_id, claims.sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ToggleResponse>> {
    let active = blocking(&state, move |db| posts::toggle_like(db, post_id, claims.sub)).await?;
    Ok(Json(ToggleResponse { active }))
}

pub async fn toggle_repost(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ToggleResponse>> {
    let active = blocking(&state, move |db| posts::toggle_repost(db, post_id, claims.sub)).await?;
    Ok(Json(ToggleResponse { active }))
}

pub async fn home_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<FeedItem>>> {
    Ok(Json(blocking(&state, move |db| posts::home_feed(db, claims.sub, query.limit)).await?))
}

pub async fn user_posts(
    State(state): State<AppState>,
    Path(author): Path<Uuid>,
    Query(query): Query<FeedQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<FeedItem>>> {
    Ok(Json(blocking(&state, move |db| posts::posts_by(db, author, claims.sub, query.limit)).await?))
}
