use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (accounts, relationships, chats)");
        conn.execute_batch(
            "
            CREATE TABLE accounts (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                roles       TEXT NOT NULL DEFAULT '[\"ROLE_USER\"]',
                private     INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            -- Single store for follow edges; followers/following are views over it.
            CREATE TABLE follows (
                follower_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                followee_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (follower_id, followee_id),
                CHECK (follower_id <> followee_id)
            );

            CREATE INDEX idx_follows_followee ON follows(followee_id);

            CREATE TABLE friend_requests (
                id          TEXT PRIMARY KEY,
                sender_id   TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                receiver_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                status      TEXT NOT NULL DEFAULT 'PENDING'
                            CHECK (status IN ('PENDING', 'ACCEPTED', 'REJECTED')),
                created_at  TEXT NOT NULL,
                CHECK (sender_id <> receiver_id)
            );

            -- At most one PENDING request per ordered pair
            CREATE UNIQUE INDEX idx_friend_requests_pending
                ON friend_requests(sender_id, receiver_id) WHERE status = 'PENDING';

            CREATE INDEX idx_friend_requests_receiver
                ON friend_requests(receiver_id, status);

            CREATE TABLE conversations (
                id              TEXT PRIMARY KEY,
                pair_key        TEXT NOT NULL UNIQUE,
                last_activity   TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE conversation_participants (
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                account_id      TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                PRIMARY KEY (conversation_id, account_id)
            );

            CREATE INDEX idx_participants_account
                ON conversation_participants(account_id);

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                author_id       TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                body            TEXT NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_conversation
                ON messages(conversation_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (posts, stories)");
        conn.execute_batch(
            "
            CREATE TABLE posts (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                body        TEXT,
                image       TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_posts_author ON posts(author_id, created_at);

            CREATE TABLE post_likes (
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                account_id  TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (post_id, account_id)
            );

            CREATE TABLE reposts (
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                account_id  TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (post_id, account_id)
            );

            CREATE TABLE stories (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                image       TEXT NOT NULL,
                visible     INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_stories_visible ON stories(visible, author_id);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
