use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use plaza_core::conversations::{self, DEFAULT_PAGE};
use plaza_types::api::{ChatDetail, Claims, ConversationSummary, MarkReadResponse, SendMessageRequest};
use plaza_types::models::{Conversation, Message};

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Id of the oldest message on the previous page.
    pub before: Option<Uuid>,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE
}

/// POST /chats/{id} where `id` is the other account. Returns the existing
/// conversation when there is one.
pub async fn open_chat(
    State(state): State<AppState>,
    Path(other): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Conversation>> {
    let conversation =
        blocking(&state, move |db| conversations::find_or_create_conversation(db, claims.sub, other)).await?;
    Ok(Json(conversation))
}

/// GET /chats/{id} where `id` is a conversation the caller takes part in.
pub async fn get_chat(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ChatDetail>> {
    let detail = blocking(&state, move |db| {
        Ok(ChatDetail {
            conversation: conversations::get(db, conversation_id, claims.sub)?,
            counterpart: conversations::counterpart(db, conversation_id, claims.sub)?,
        })
    })
    .await?;
    Ok(Json(detail))
}

pub async fn list_chats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    Ok(Json(blocking(&state, move |db| conversations::list_conversations(db, claims.sub)).await?))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = blocking(&state, move |db| {
        conversations::messages(db, conversation_id, claims.sub, query.limit, query.before)
    })
    .await?;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message =
        blocking(&state, move |db| conversations::post_message(db, conversation_id, claims.sub, &req.text)).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MarkReadResponse>> {
    let marked = blocking(&state, move |db| conversations::mark_read(db, conversation_id, claims.sub)).await?;
    Ok(Json(MarkReadResponse { marked }))
}
