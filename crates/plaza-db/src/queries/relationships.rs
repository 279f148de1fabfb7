use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use super::accounts::map_account;
use crate::Database;
use crate::models::{AccountRow, FriendRequestRow};

const REQUEST_COLUMNS: &str = "id, sender_id, receiver_id, status, created_at";

impl Database {
    pub fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| follow_exists(conn, follower_id, followee_id))
    }

    pub fn get_friend_request(&self, id: &str) -> Result<Option<FriendRequestRow>> {
        self.with_conn(|conn| query_friend_request(conn, id))
    }
}

// -- Follow edges --

/// Returns `true` if the edge was created, `false` if it already existed.
pub fn insert_follow(conn: &Connection, follower_id: &str, followee_id: &str, now: &str) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)",
        (follower_id, followee_id, now),
    )?;
    Ok(changed == 1)
}

pub fn delete_follow(conn: &Connection, follower_id: &str, followee_id: &str) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
        (follower_id, followee_id),
    )?;
    Ok(changed == 1)
}

pub fn follow_exists(conn: &Connection, follower_id: &str, followee_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2)",
        (follower_id, followee_id),
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn query_followers(conn: &Connection, account_id: &str) -> Result<Vec<AccountRow>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.username, a.password, a.roles, a.private, a.created_at
         FROM follows f
         JOIN accounts a ON a.id = f.follower_id
         WHERE f.followee_id = ?1
         ORDER BY a.username",
    )?;
    let rows = stmt
        .query_map([account_id], map_account)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn query_following(conn: &Connection, account_id: &str) -> Result<Vec<AccountRow>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.username, a.password, a.roles, a.private, a.created_at
         FROM follows f
         JOIN accounts a ON a.id = f.followee_id
         WHERE f.follower_id = ?1
         ORDER BY a.username",
    )?;
    let rows = stmt
        .query_map([account_id], map_account)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// (followers, following) for one account.
pub fn count_follows(conn: &Connection, account_id: &str) -> Result<(usize, usize)> {
    let counts = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM follows WHERE followee_id = ?1),
            (SELECT COUNT(*) FROM follows WHERE follower_id = ?1)",
        [account_id],
        |row| Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)? as usize)),
    )?;
    Ok(counts)
}

// -- Friend requests --

fn map_request(row: &Row<'_>) -> rusqlite::Result<FriendRequestRow> {
    Ok(FriendRequestRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Inserts a PENDING request. Returns `false` when the partial unique index
/// already holds a PENDING request for this (sender, receiver) pair.
pub fn insert_pending_request(
    conn: &Connection,
    id: &str,
    sender_id: &str,
    receiver_id: &str,
    now: &str,
) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO friend_requests (id, sender_id, receiver_id, status, created_at)
         VALUES (?1, ?2, ?3, 'PENDING', ?4)",
        (id, sender_id, receiver_id, now),
    )?;
    Ok(changed == 1)
}

pub fn query_pending_request(
    conn: &Connection,
    sender_id: &str,
    receiver_id: &str,
) -> Result<Option<FriendRequestRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM friend_requests
         WHERE sender_id = ?1 AND receiver_id = ?2 AND status = 'PENDING'"
    ))?;
    stmt.query_row((sender_id, receiver_id), map_request).optional()
}

pub fn query_friend_request(conn: &Connection, id: &str) -> Result<Option<FriendRequestRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = ?1"))?;
    stmt.query_row([id], map_request).optional()
}

pub fn update_request_status(conn: &Connection, id: &str, status: &str) -> Result<bool> {
    let changed = conn.execute("UPDATE friend_requests SET status = ?2 WHERE id = ?1", (id, status))?;
    Ok(changed == 1)
}

/// Requests addressed to `receiver_id` with the given status, newest first.
pub fn query_incoming_requests(conn: &Connection, receiver_id: &str, status: &str) -> Result<Vec<FriendRequestRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM friend_requests
         WHERE receiver_id = ?1 AND status = ?2
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map((receiver_id, status), map_request)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every request sent by `sender_id`, newest first.
pub fn query_outgoing_requests(conn: &Connection, sender_id: &str) -> Result<Vec<FriendRequestRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM friend_requests
         WHERE sender_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map([sender_id], map_request)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
