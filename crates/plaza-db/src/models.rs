//! Database row types. These map directly to SQLite rows; ids and timestamps
//! stay as TEXT until converted into the `plaza-types` models.

use anyhow::{Result, anyhow};
use uuid::Uuid;

use plaza_types::models::{Account, Conversation, FriendRequest, Message, Post, Story};

use crate::parse_ts;

pub fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse::<Uuid>().map_err(|e| anyhow!("Corrupt id '{}': {}", raw, e))
}

pub struct AccountRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub roles: String,
    pub private: bool,
    pub created_at: String,
}

impl AccountRow {
    pub fn into_account(self) -> Result<Account> {
        let roles: Vec<String> = serde_json::from_str(&self.roles)
            .map_err(|e| anyhow!("Corrupt roles on account '{}': {}", self.id, e))?;
        Ok(Account {
            id: parse_id(&self.id)?,
            username: self.username,
            roles,
            private: self.private,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct FriendRequestRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub status: String,
    pub created_at: String,
}

impl FriendRequestRow {
    pub fn into_friend_request(self) -> Result<FriendRequest> {
        Ok(FriendRequest {
            id: parse_id(&self.id)?,
            sender_id: parse_id(&self.sender_id)?,
            receiver_id: parse_id(&self.receiver_id)?,
            status: self.status.parse()?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct ConversationRow {
    pub id: String,
    pub pair_key: String,
    pub last_activity: String,
    pub created_at: String,
}

impl ConversationRow {
    /// `participants` comes from `conversation_participants`.
    pub fn into_conversation(self, participants: &[String]) -> Result<Conversation> {
        let mut ids = participants
            .iter()
            .map(|p| parse_id(p))
            .collect::<Result<Vec<_>>>()?;
        ids.sort();
        Ok(Conversation {
            id: parse_id(&self.id)?,
            participants: ids,
            last_activity: parse_ts(&self.last_activity)?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

/// A conversation as seen from one participant.
pub struct InboxRow {
    pub conversation: ConversationRow,
    pub counterpart_id: String,
    pub unread: u32,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub author_id: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: parse_id(&self.id)?,
            conversation_id: parse_id(&self.conversation_id)?,
            author_id: parse_id(&self.author_id)?,
            body: self.body,
            read: self.is_read,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub body: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
}

impl PostRow {
    pub fn into_post(self) -> Result<Post> {
        Ok(Post {
            id: parse_id(&self.id)?,
            author_id: parse_id(&self.author_id)?,
            body: self.body,
            image: self.image,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

/// A post joined with its author and counters, relative to one viewer.
pub struct FeedRow {
    pub post: PostRow,
    pub author_username: String,
    pub likes: u32,
    pub reposts: u32,
    pub liked_by_viewer: bool,
    pub reposted_by_viewer: bool,
}

pub struct StoryRow {
    pub id: String,
    pub author_id: String,
    pub image: String,
    pub visible: bool,
    pub created_at: String,
}

impl StoryRow {
    pub fn into_story(self) -> Result<Story> {
        Ok(Story {
            id: parse_id(&self.id)?,
            author_id: parse_id(&self.author_id)?,
            image: self.image,
            visible: self.visible,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct StoryAuthorRow {
    pub id: String,
    pub username: String,
    pub latest: String,
}
