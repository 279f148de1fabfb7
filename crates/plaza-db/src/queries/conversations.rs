use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::Database;
use crate::models::{ConversationRow, InboxRow, MessageRow};

const CONVERSATION_COLUMNS: &str = "c.id, c.pair_key, c.last_activity, c.created_at";

impl Database {
    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| query_conversation(conn, id))
    }

    pub fn get_participants(&self, conversation_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| query_participants(conn, conversation_id))
    }
}

/// Canonical key for an unordered pair of account ids.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b { format!("{a}:{b}") } else { format!("{b}:{a}") }
}

fn map_conversation(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        pair_key: row.get(1)?,
        last_activity: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn query_conversation(conn: &Connection, id: &str) -> Result<Option<ConversationRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = ?1"))?;
    stmt.query_row([id], map_conversation).optional()
}

pub fn query_conversation_by_pair_key(conn: &Connection, key: &str) -> Result<Option<ConversationRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.pair_key = ?1"))?;
    stmt.query_row([key], map_conversation).optional()
}

/// Among the conversations `a` takes part in, the oldest one that has exactly
/// two participants and includes `b`.
pub fn query_pair_conversation(conn: &Connection, a: &str, b: &str) -> Result<Option<ConversationRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONVERSATION_COLUMNS}
         FROM conversations c
         JOIN conversation_participants pa ON pa.conversation_id = c.id AND pa.account_id = ?1
         JOIN conversation_participants pb ON pb.conversation_id = c.id AND pb.account_id = ?2
         WHERE (SELECT COUNT(*) FROM conversation_participants p WHERE p.conversation_id = c.id) = 2
         ORDER BY c.created_at
         LIMIT 1"
    ))?;
    stmt.query_row((a, b), map_conversation).optional()
}

/// Returns `false` if a conversation with this pair key already exists.
pub fn insert_conversation(conn: &Connection, id: &str, pair_key: &str, now: &str) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO conversations (id, pair_key, last_activity, created_at) VALUES (?1, ?2, ?3, ?3)",
        (id, pair_key, now),
    )?;
    Ok(changed == 1)
}

pub fn insert_participant(conn: &Connection, conversation_id: &str, account_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO conversation_participants (conversation_id, account_id) VALUES (?1, ?2)",
        (conversation_id, account_id),
    )?;
    Ok(())
}

pub fn query_participants(conn: &Connection, conversation_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT account_id FROM conversation_participants WHERE conversation_id = ?1 ORDER BY account_id",
    )?;
    let ids = stmt
        .query_map([conversation_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

pub fn is_participant(conn: &Connection, conversation_id: &str, account_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM conversation_participants WHERE conversation_id = ?1 AND account_id = ?2)",
        (conversation_id, account_id),
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn touch_conversation(conn: &Connection, id: &str, ts: &str) -> Result<()> {
    conn.execute("UPDATE conversations SET last_activity = ?2 WHERE id = ?1", (id, ts))?;
    Ok(())
}

/// Conversations of `account_id`, most recent activity first, each paired
/// with the other participant and the number of unread messages from them.
pub fn query_inbox(conn: &Connection, account_id: &str) -> Result<Vec<InboxRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONVERSATION_COLUMNS}, other.account_id,
            (SELECT COUNT(*) FROM messages m
             WHERE m.conversation_id = c.id AND m.author_id <> ?1 AND m.is_read = 0)
         FROM conversations c
         JOIN conversation_participants me ON me.conversation_id = c.id AND me.account_id = ?1
         JOIN conversation_participants other ON other.conversation_id = c.id AND other.account_id <> ?1
         ORDER BY c.last_activity DESC"
    ))?;
    let rows = stmt
        .query_map([account_id], |row| {
            Ok(InboxRow {
                conversation: map_conversation(row)?,
                counterpart_id: row.get(4)?,
                unread: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Messages --

pub fn insert_message(
    conn: &Connection,
    id: &str,
    conversation_id: &str,
    author_id: &str,
    body: &str,
    now: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, conversation_id, author_id, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        (id, conversation_id, author_id, body, now),
    )?;
    Ok(())
}

pub fn message_in_conversation(conn: &Connection, conversation_id: &str, message_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM messages WHERE id = ?1 AND conversation_id = ?2)",
        (message_id, conversation_id),
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Newest first. `before` is the id of the oldest message on the previous
/// page; ties on `created_at` are broken by insertion order.
pub fn query_messages(
    conn: &Connection,
    conversation_id: &str,
    limit: u32,
    before: Option<&str>,
) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, author_id, body, is_read, created_at
         FROM messages
         WHERE conversation_id = ?1
           AND (?2 IS NULL
                OR (created_at, rowid) < (SELECT created_at, rowid FROM messages WHERE id = ?2))
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?3",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![conversation_id, before, limit], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                author_id: row.get(2)?,
                body: row.get(3)?,
                is_read: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Marks every message in the conversation not written by `reader_id` as read.
pub fn mark_read(conn: &Connection, conversation_id: &str, reader_id: &str) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE messages SET is_read = 1 WHERE conversation_id = ?1 AND author_id <> ?2 AND is_read = 0",
        (conversation_id, reader_id),
    )?;
    Ok(changed)
}
