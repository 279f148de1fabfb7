use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::models::{FeedRow, PostRow};

/// Post columns plus author and counters relative to the viewer bound as ?1.
const FEED_SELECT: &str = "
    SELECT p.id, p.author_id, p.body, p.image, p.created_at, a.username,
        (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id),
        (SELECT COUNT(*) FROM reposts r WHERE r.post_id = p.id),
        EXISTS(SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.account_id = ?1),
        EXISTS(SELECT 1 FROM reposts r WHERE r.post_id = p.id AND r.account_id = ?1)
    FROM posts p
    JOIN accounts a ON a.id = p.author_id";

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        body: row.get(2)?,
        image: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_feed(row: &Row<'_>) -> rusqlite::Result<FeedRow> {
    Ok(FeedRow {
        post: map_post(row)?,
        author_username: row.get(5)?,
        likes: row.get(6)?,
        reposts: row.get(7)?,
        liked_by_viewer: row.get(8)?,
        reposted_by_viewer: row.get(9)?,
    })
}

pub fn insert_post(
    conn: &Connection,
    id: &str,
    author_id: &str,
    body: Option<&str>,
    image: Option<&str>,
    now: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO posts (id, author_id, body, image, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id, author_id, body, image, now],
    )?;
    Ok(())
}

pub fn query_post(conn: &Connection, id: &str) -> Result<Option<PostRow>> {
    let mut stmt = conn.prepare("SELECT id, author_id, body, image, created_at FROM posts WHERE id = ?1")?;
    stmt.query_row([id], map_post).optional()
}

pub fn delete_post(conn: &Connection, id: &str) -> Result<bool> {
    let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
    Ok(changed == 1)
}

/// Toggle membership of `account_id` in a per-post set table: removes if
/// present, inserts if not. Returns `true` when the row now exists.
fn toggle(conn: &Connection, table: &'static str, post_id: &str, account_id: &str, now: &str) -> Result<bool> {
    let removed = conn.execute(
        &format!("DELETE FROM {table} WHERE post_id = ?1 AND account_id = ?2"),
        (post_id, account_id),
    )?;
    if removed > 0 {
        return Ok(false);
    }

    conn.execute(
        &format!("INSERT INTO {table} (post_id, account_id, created_at) VALUES (?1, ?2, ?3)"),
        (post_id, account_id, now),
    )?;
    Ok(true)
}

pub fn toggle_like(conn: &Connection, post_id: &str, account_id: &str, now: &str) -> Result<bool> {
    toggle(conn, "post_likes", post_id, account_id, now)
}

pub fn toggle_repost(conn: &Connection, post_id: &str, account_id: &str, now: &str) -> Result<bool> {
    toggle(conn, "reposts", post_id, account_id, now)
}

/// Posts written by `author_id`, newest first.
pub fn query_posts_by_author(conn: &Connection, viewer_id: &str, author_id: &str, limit: u32) -> Result<Vec<FeedRow>> {
    let mut stmt = conn.prepare(&format!(
        "{FEED_SELECT}
         WHERE p.author_id = ?2
         ORDER BY p.created_at DESC, p.rowid DESC
         LIMIT ?3"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![viewer_id, author_id, limit], map_feed)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The viewer's own posts and those of every account they follow.
pub fn query_home_feed(conn: &Connection, viewer_id: &str, limit: u32) -> Result<Vec<FeedRow>> {
    let mut stmt = conn.prepare(&format!(
        "{FEED_SELECT}
         WHERE p.author_id = ?1
            OR p.author_id IN (SELECT followee_id FROM follows WHERE follower_id = ?1)
         ORDER BY p.created_at DESC, p.rowid DESC
         LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![viewer_id, limit], map_feed)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
