//! Ephemeral image stories. Reads only return stories younger than the
//! time-to-live; `expire_stories` later hides the stale rows for good.

use chrono::{DateTime, Duration, Utc};
use plaza_db::models::parse_id;
use plaza_db::queries::accounts::query_account_by_username;
use plaza_db::queries::stories as q;
use plaza_db::{Database, format_ts, parse_ts};
use plaza_types::api::StoryAuthor;
use plaza_types::models::Story;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Result, SocialError, now, now_ts, require_account, require_visible};

pub const DEFAULT_TTL_HOURS: i64 = 24;

pub fn default_ttl() -> Duration {
    Duration::hours(DEFAULT_TTL_HOURS)
}

pub fn create_story(db: &Database, author: Uuid, image: &str) -> Result<Story> {
    let image = image.trim();
    if image.is_empty() {
        return Err(SocialError::invalid("a story needs an image"));
    }

    db.with_tx(|tx| {
        require_account(tx, author)?;
        let id = Uuid::new_v4().to_string();
        q::insert_story(tx, &id, &author.to_string(), image, &now_ts())?;
        let row = q::query_story(tx, &id)?.ok_or(SocialError::NotFound("story"))?;
        info!("Story {} created by {}", id, author);
        Ok(row.into_story()?)
    })
}

/// Hides every visible story created before `now - ttl`.
pub fn expire_stories(db: &Database, now: DateTime<Utc>, ttl: Duration) -> Result<usize> {
    let cutoff = format_ts(now - ttl);
    let hidden = db.with_conn(|conn| q::hide_stories_before(conn, &cutoff))?;
    if hidden > 0 {
        info!("Expired {} stories older than {}", hidden, cutoff);
    } else {
        debug!("No stories to expire before {}", cutoff);
    }
    Ok(hidden)
}

/// Authors with live stories that `viewer` is allowed to see.
pub fn accounts_with_stories(db: &Database, viewer: Uuid, ttl: Duration) -> Result<Vec<StoryAuthor>> {
    let cutoff = format_ts(now() - ttl);
    let rows = db.with_conn(|conn| q::query_story_authors(conn, &viewer.to_string(), &cutoff))?;
    rows.into_iter()
        .map(|row| -> Result<StoryAuthor> {
            Ok(StoryAuthor {
                id: parse_id(&row.id)?,
                username: row.username,
                latest: parse_ts(&row.latest)?,
            })
        })
        .collect()
}

/// Live stories of `username`, newest first.
pub fn stories_by_username(db: &Database, username: &str, viewer: Uuid, ttl: Duration) -> Result<Vec<Story>> {
    let cutoff = format_ts(now() - ttl);
    db.with_tx(|tx| {
        let author = query_account_by_username(tx, username)?.ok_or(SocialError::NotFound("account"))?;
        require_visible(tx, parse_id(&author.id)?, viewer)?;
        let stories = q::query_visible_stories(tx, &author.id, &cutoff)?
            .into_iter()
            .map(|row| row.into_story())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(stories)
    })
}

pub fn delete_story(db: &Database, story_id: Uuid, actor: Uuid) -> Result<()> {
    db.with_tx(|tx| {
        let actor_account = require_account(tx, actor)?.into_account()?;
        let story = q::query_story(tx, &story_id.to_string())?
            .ok_or(SocialError::NotFound("story"))?
            .into_story()?;
        if story.author_id != actor && !actor_account.is_admin() {
            return Err(SocialError::PermissionDenied);
        }
        q::delete_story(tx, &story_id.to_string())?;
        info!("Story {} deleted by {}", story_id, actor);
        Ok(())
    })
}
