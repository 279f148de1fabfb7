use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::Database;
use crate::models::{StoryAuthorRow, StoryRow};

impl Database {
    pub fn get_story(&self, id: &str) -> Result<Option<StoryRow>> {
        self.with_conn(|conn| query_story(conn, id))
    }
}

fn map_story(row: &Row<'_>) -> rusqlite::Result<StoryRow> {
    Ok(StoryRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        image: row.get(2)?,
        visible: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn insert_story(conn: &Connection, id: &str, author_id: &str, image: &str, now: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO stories (id, author_id, image, visible, created_at) VALUES (?1, ?2, ?3, 1, ?4)",
        (id, author_id, image, now),
    )?;
    Ok(())
}

pub fn query_story(conn: &Connection, id: &str) -> Result<Option<StoryRow>> {
    let mut stmt = conn.prepare("SELECT id, author_id, image, visible, created_at FROM stories WHERE id = ?1")?;
    stmt.query_row([id], map_story).optional()
}

pub fn delete_story(conn: &Connection, id: &str) -> Result<bool> {
    let changed = conn.execute("DELETE FROM stories WHERE id = ?1", [id])?;
    Ok(changed == 1)
}

/// Hides every visible story created before `cutoff`. Returns how many changed.
pub fn hide_stories_before(conn: &Connection, cutoff: &str) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE stories SET visible = 0 WHERE visible = 1 AND created_at < ?1",
        [cutoff],
    )?;
    Ok(changed)
}

/// Authors with at least one visible story newer than `cutoff`, by username.
/// Private authors are only listed for themselves and their followers.
pub fn query_story_authors(conn: &Connection, viewer_id: &str, cutoff: &str) -> Result<Vec<StoryAuthorRow>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.username, MAX(s.created_at)
         FROM stories s
         JOIN accounts a ON a.id = s.author_id
         WHERE s.visible = 1 AND s.created_at >= ?2
           AND (a.private = 0 OR a.id = ?1
                OR EXISTS(SELECT 1 FROM follows f WHERE f.follower_id = ?1 AND f.followee_id = a.id))
         GROUP BY a.id, a.username
         ORDER BY a.username",
    )?;
    let rows = stmt
        .query_map((viewer_id, cutoff), |row| {
            Ok(StoryAuthorRow {
                id: row.get(0)?,
                username: row.get(1)?,
                latest: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Stories still visible and created at or after `cutoff`, newest first.
pub fn query_visible_stories(conn: &Connection, author_id: &str, cutoff: &str) -> Result<Vec<StoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, author_id, image, visible, created_at
         FROM stories
         WHERE author_id = ?1 AND visible = 1 AND created_at >= ?2
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map((author_id, cutoff), map_story)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
