use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Account, Conversation, FriendRequest, Post};

// -- JWT Claims --

/// JWT claims issued at login and checked by the API middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Accounts --

/// Partial update of the caller's own profile; absent fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub private: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub account: Account,
    pub followers: usize,
    pub following: usize,
    /// Whether the caller follows this account.
    pub followed_by_me: bool,
    /// Whether the caller has a PENDING request to this account.
    pub request_pending: bool,
}

// -- Relationships --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendRequestResult {
    Followed,
    Requested,
    AlreadyPending,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendRequestResponse {
    pub result: FriendRequestResult,
    pub request: Option<FriendRequest>,
}

// -- Chats --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub counterpart: Account,
    pub unread: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatDetail {
    pub conversation: Conversation,
    pub counterpart: Account,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub marked: usize,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub post: Post,
    pub author_username: String,
    pub likes: u32,
    pub reposts: u32,
    pub liked_by_me: bool,
    pub reposted_by_me: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub active: bool,
}

// -- Stories --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateStoryRequest {
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoryAuthor {
    pub id: Uuid,
    pub username: String,
    pub latest: DateTime<Utc>,
}
