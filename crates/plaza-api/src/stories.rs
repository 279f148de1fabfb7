use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use plaza_core::stories;
use plaza_types::api::{Claims, CreateStoryRequest, StoryAuthor};
use plaza_types::models::Story;

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};

pub async fn create_story(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateStoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let story = blocking(&state, move |db| stories::create_story(db, claims.sub, &req.image)).await?;
    Ok((StatusCode::CREATED, Json(story)))
}

pub async fn list_authors(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<StoryAuthor>>> {
    let ttl = state.story_ttl;
    Ok(Json(blocking(&state, move |db| stories::accounts_with_stories(db, claims.sub, ttl)).await?))
}

/// GET /stories/{key} where `key` is a username.
pub async fn by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Story>>> {
    let ttl = state.story_ttl;
    let stories = blocking(&state, move |db| stories::stories_by_username(db, &username, claims.sub, ttl)).await?;
    Ok(Json(stories))
}

/// DELETE /stories/{key} where `key` is a story id.
pub async fn delete_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<StatusCode> {
    blocking(&state, move |db| stories::delete_story(db, story_id, claims.sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}
