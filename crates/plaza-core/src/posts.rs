use plaza_db::Database;
use plaza_db::models::FeedRow;
use plaza_db::queries::posts as q;
use plaza_types::api::FeedItem;
use plaza_types::models::Post;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Result, SocialError, now_ts, require_account, require_visible};

pub const DEFAULT_FEED: u32 = 50;
pub const MAX_FEED: u32 = 200;

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn feed_item(row: FeedRow) -> anyhow::Result<FeedItem> {
    Ok(FeedItem {
        post: row.post.into_post()?,
        author_username: row.author_username,
        likes: row.likes,
        reposts: row.reposts,
        liked_by_me: row.liked_by_viewer,
        reposted_by_me: row.reposted_by_viewer,
    })
}

fn feed_items(rows: Vec<FeedRow>) -> Result<Vec<FeedItem>> {
    rows.into_iter()
        .map(|row| feed_item(row).map_err(SocialError::from))
        .collect()
}

pub fn create_post(db: &Database, author: Uuid, body: Option<&str>, image: Option<&str>) -> Result<Post> {
    let (body, image) = (non_blank(body), non_blank(image));
    if body.is_none() && image.is_none() {
        return Err(SocialError::invalid("a post needs text or an image"));
    }

    db.with_tx(|tx| {
        require_account(tx, author)?;
        let id = Uuid::new_v4().to_string();
        q::insert_post(tx, &id, &author.to_string(), body, image, &now_ts())?;
        let row = q::query_post(tx, &id)?.ok_or(SocialError::NotFound("post"))?;
        info!("Post {} created by {}", id, author);
        Ok(row.into_post()?)
    })
}

/// Removes a post with its likes and reposts. Author or admin only.
pub fn delete_post(db: &Database, post_id: Uuid, actor: Uuid) -> Result<()> {
    db.with_tx(|tx| {
        let actor_account = require_account(tx, actor)?.into_account()?;
        let post = q::query_post(tx, &post_id.to_string())?
            .ok_or(SocialError::NotFound("post"))?
            .into_post()?;
        if post.author_id != actor && !actor_account.is_admin() {
            return Err(SocialError::PermissionDenied);
        }
        q::delete_post(tx, &post_id.to_string())?;
        info!("Post {} deleted by {}", post_id, actor);
        Ok(())
    })
}

/// Returns `true` when the actor now likes the post. Posts of a private
/// author can only be liked by the author and their followers.
pub fn toggle_like(db: &Database, post_id: Uuid, actor: Uuid) -> Result<bool> {
    db.with_tx(|tx| {
        require_account(tx, actor)?;
        let post = q::query_post(tx, &post_id.to_string())?
            .ok_or(SocialError::NotFound("post"))?
            .into_post()?;
        require_visible(tx, post.author_id, actor)?;
        let liked = q::toggle_like(tx, &post_id.to_string(), &actor.to_string(), &now_ts())?;
        debug!("{} {} post {}", actor, if liked { "liked" } else { "unliked" }, post_id);
        Ok(liked)
    })
}

/// Returns `true` when the actor now reposts the post.
pub fn toggle_repost(db: &Database, post_id: Uuid, actor: Uuid) -> Result<bool> {
    db.with_tx(|tx| {
        require_account(tx, actor)?;
        let post = q::query_post(tx, &post_id.to_string())?
            .ok_or(SocialError::NotFound("post"))?
            .into_post()?;
        require_visible(tx, post.author_id, actor)?;
        let reposted = q::toggle_repost(tx, &post_id.to_string(), &actor.to_string(), &now_ts())?;
        debug!("{} {} post {}", actor, if reposted { "reposted" } else { "unreposted" }, post_id);
        Ok(reposted)
    })
}

/// Posts written by `author` as seen by `viewer`. A private author's posts
/// are only visible to the author and their followers.
pub fn posts_by(db: &Database, author: Uuid, viewer: Uuid, limit: u32) -> Result<Vec<FeedItem>> {
    let rows = db.with_tx(|tx| -> Result<Vec<FeedRow>> {
        require_visible(tx, author, viewer)?;
        Ok(q::query_posts_by_author(
            tx,
            &viewer.to_string(),
            &author.to_string(),
            limit.clamp(1, MAX_FEED),
        )?)
    })?;
    feed_items(rows)
}

/// The viewer's own posts and those of accounts they follow, newest first.
pub fn home_feed(db: &Database, viewer: Uuid, limit: u32) -> Result<Vec<FeedItem>> {
    let rows = db.with_conn(|conn| q::query_home_feed(conn, &viewer.to_string(), limit.clamp(1, MAX_FEED)))?;
    feed_items(rows)
}
