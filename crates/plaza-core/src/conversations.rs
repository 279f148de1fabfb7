//! Two-party chat threads: find-or-create by participant pair, and messages
//! appended by participants only.

use anyhow::anyhow;
use plaza_db::queries::conversations as q;
use plaza_db::{Connection, Database, format_ts};
use plaza_types::api::ConversationSummary;
use plaza_types::models::{Account, Conversation, Message};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Result, SocialError, now, now_ts, require_account};

pub const DEFAULT_PAGE: u32 = 50;
pub const MAX_PAGE: u32 = 200;

fn load(conn: &Connection, id: &str) -> Result<Conversation> {
    let row = q::query_conversation(conn, id)?.ok_or(SocialError::NotFound("conversation"))?;
    let participants = q::query_participants(conn, id)?;
    Ok(row.into_conversation(&participants)?)
}

/// Returns the conversation between `a` and `b`, creating it if none exists.
pub fn find_or_create_conversation(db: &Database, a: Uuid, b: Uuid) -> Result<Conversation> {
    if a == b {
        return Err(SocialError::invalid("cannot start a conversation with yourself"));
    }

    db.with_tx(|tx| {
        require_account(tx, a)?;
        require_account(tx, b)?;
        let (a_id, b_id) = (a.to_string(), b.to_string());

        if let Some(existing) = q::query_pair_conversation(tx, &a_id, &b_id)? {
            debug!("Reusing conversation {} for {} and {}", existing.id, a, b);
            return load(tx, &existing.id);
        }

        // A racing creator for the same pair loses on the pair_key constraint
        // and picks up the winner's row below.
        let key = q::pair_key(&a_id, &b_id);
        let id = Uuid::new_v4().to_string();
        if q::insert_conversation(tx, &id, &key, &now_ts())? {
            q::insert_participant(tx, &id, &a_id)?;
            q::insert_participant(tx, &id, &b_id)?;
            info!("Conversation {} opened between {} and {}", id, a, b);
        }

        let row = q::query_conversation_by_pair_key(tx, &key)?
            .ok_or_else(|| anyhow!("conversation for pair {} missing after insert", key))?;
        load(tx, &row.id)
    })
}

pub fn get(db: &Database, conversation_id: Uuid, actor: Uuid) -> Result<Conversation> {
    let id = conversation_id.to_string();
    let row = db.get_conversation(&id)?.ok_or(SocialError::NotFound("conversation"))?;
    let conversation = row.into_conversation(&db.get_participants(&id)?)?;
    if !conversation.has_participant(actor) {
        return Err(SocialError::PermissionDenied);
    }
    Ok(conversation)
}

/// Appends a message from `author` and advances the conversation's
/// `last_activity` to the message timestamp.
pub fn post_message(db: &Database, conversation_id: Uuid, author: Uuid, text: &str) -> Result<Message> {
    db.with_tx(|tx| {
        let id = conversation_id.to_string();
        let author_id = author.to_string();
        if q::query_conversation(tx, &id)?.is_none() {
            return Err(SocialError::NotFound("conversation"));
        }
        if !q::is_participant(tx, &id, &author_id)? {
            return Err(SocialError::PermissionDenied);
        }
        if text.trim().is_empty() {
            return Err(SocialError::invalid("message text is empty"));
        }

        let created = now();
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            author_id: author,
            body: text.to_string(),
            read: false,
            created_at: created,
        };
        let ts = format_ts(created);
        q::insert_message(tx, &message.id.to_string(), &id, &author_id, &message.body, &ts)?;
        q::touch_conversation(tx, &id, &ts)?;
        debug!("Message {} posted to {}", message.id, conversation_id);

        Ok(message)
    })
}

/// Newest first, at most `limit` (capped). `before` is the id of the oldest
/// message already seen; the page continues strictly after it.
pub fn messages(
    db: &Database,
    conversation_id: Uuid,
    actor: Uuid,
    limit: u32,
    before: Option<Uuid>,
) -> Result<Vec<Message>> {
    get(db, conversation_id, actor)?;
    let id = conversation_id.to_string();
    let cursor = before.map(|m| m.to_string());
    let rows = db.with_tx(|tx| {
        let known = match cursor.as_deref() {
            Some(cursor) => q::message_in_conversation(tx, &id, cursor)?,
            None => true,
        };
        if !known {
            return Err(SocialError::NotFound("message"));
        }
        Ok(q::query_messages(tx, &id, limit.clamp(1, MAX_PAGE), cursor.as_deref())?)
    })?;
    rows.into_iter()
        .map(|row| row.into_message().map_err(SocialError::from))
        .collect()
}

/// Marks the counterpart's messages as read by `reader`. Returns the count.
pub fn mark_read(db: &Database, conversation_id: Uuid, reader: Uuid) -> Result<usize> {
    db.with_tx(|tx| {
        let id = conversation_id.to_string();
        if q::query_conversation(tx, &id)?.is_none() {
            return Err(SocialError::NotFound("conversation"));
        }
        if !q::is_participant(tx, &id, &reader.to_string())? {
            return Err(SocialError::PermissionDenied);
        }
        Ok(q::mark_read(tx, &id, &reader.to_string())?)
    })
}

/// The other participant, as seen by `actor`.
pub fn counterpart(db: &Database, conversation_id: Uuid, actor: Uuid) -> Result<Account> {
    let conversation = get(db, conversation_id, actor)?;
    let other = conversation
        .participants
        .iter()
        .copied()
        .find(|p| *p != actor)
        .ok_or(SocialError::NotFound("counterpart"))?;
    crate::accounts::get(db, other)
}

/// Every conversation of `actor`, most recently active first.
pub fn list_conversations(db: &Database, actor: Uuid) -> Result<Vec<ConversationSummary>> {
    db.with_conn(|conn| {
        let inbox = q::query_inbox(conn, &actor.to_string())?;
        let mut summaries = Vec::with_capacity(inbox.len());
        for entry in inbox {
            let participants = q::query_participants(conn, &entry.conversation.id)?;
            let conversation = entry.conversation.into_conversation(&participants)?;
            let counterpart = plaza_db::queries::accounts::query_account_by_id(conn, &entry.counterpart_id)?
                .ok_or_else(|| anyhow!("counterpart {} missing", entry.counterpart_id))?
                .into_account()?;
            summaries.push(ConversationSummary {
                conversation,
                counterpart,
                unread: entry.unread,
            });
        }
        Ok(summaries)
    })
    .map_err(SocialError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn find_or_create_is_stable() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", true);

        let first = find_or_create_conversation(&db, alice.id, bob.id).unwrap();
        let second = find_or_create_conversation(&db, alice.id, bob.id).unwrap();
        let reversed = find_or_create_conversation(&db, bob.id, alice.id).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.id, reversed.id);
        assert_eq!(first.participants.len(), 2);
        assert!(first.has_participant(alice.id) && first.has_participant(bob.id));
    }

    #[test]
    fn distinct_pairs_get_distinct_conversations() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", false);
        let carol = testutil::account(&db, "carol", false);

        let ab = find_or_create_conversation(&db, alice.id, bob.id).unwrap();
        let ac = find_or_create_conversation(&db, alice.id, carol.id).unwrap();
        assert_ne!(ab.id, ac.id);
    }

    #[test]
    fn conversation_with_self_is_invalid() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let err = find_or_create_conversation(&db, alice.id, alice.id).unwrap_err();
        assert!(matches!(err, SocialError::InvalidOperation(_)));
    }

    #[test]
    fn conversation_with_unknown_account_is_not_found() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let err = find_or_create_conversation(&db, alice.id, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, SocialError::NotFound("account")));
    }

    #[test]
    fn posting_rules() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", false);
        let eve = testutil::account(&db, "eve", false);
        let conv = find_or_create_conversation(&db, alice.id, bob.id).unwrap();

        assert!(matches!(
            post_message(&db, conv.id, alice.id, ""),
            Err(SocialError::InvalidOperation(_))
        ));
        assert!(matches!(
            post_message(&db, conv.id, alice.id, "   "),
            Err(SocialError::InvalidOperation(_))
        ));
        assert!(matches!(
            post_message(&db, conv.id, eve.id, "hi"),
            Err(SocialError::PermissionDenied)
        ));
        assert!(matches!(
            post_message(&db, Uuid::new_v4(), alice.id, "hi"),
            Err(SocialError::NotFound("conversation"))
        ));
        assert!(messages(&db, conv.id, alice.id, DEFAULT_PAGE, None).unwrap().is_empty());

        let message = post_message(&db, conv.id, alice.id, "hi").unwrap();
        assert_eq!(message.author_id, alice.id);
        assert_eq!(message.body, "hi");
        assert!(!message.read);

        let stored = messages(&db, conv.id, bob.id, DEFAULT_PAGE, None).unwrap();
        assert_eq!(stored, vec![message.clone()]);

        let updated = get(&db, conv.id, bob.id).unwrap();
        assert!(updated.last_activity >= conv.last_activity);
        assert_eq!(updated.last_activity, message.created_at);
    }

    #[test]
    fn outsiders_cannot_read() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", false);
        let eve = testutil::account(&db, "eve", false);
        let conv = find_or_create_conversation(&db, alice.id, bob.id).unwrap();

        assert!(matches!(get(&db, conv.id, eve.id), Err(SocialError::PermissionDenied)));
        assert!(matches!(
            messages(&db, conv.id, eve.id, DEFAULT_PAGE, None),
            Err(SocialError::PermissionDenied)
        ));
        assert!(matches!(mark_read(&db, conv.id, eve.id), Err(SocialError::PermissionDenied)));
        assert_eq!(counterpart(&db, conv.id, alice.id).unwrap().username, "bob");
    }

    #[test]
    fn paging_by_message_id() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", false);
        let conv = find_or_create_conversation(&db, alice.id, bob.id).unwrap();
        let sent: Vec<Message> = (0..5)
            .map(|i| post_message(&db, conv.id, alice.id, &format!("m{i}")).unwrap())
            .collect();

        let first = messages(&db, conv.id, bob.id, 2, None).unwrap();
        assert_eq!(first.iter().map(|m| m.id).collect::<Vec<_>>(), vec![sent[4].id, sent[3].id]);

        let rest = messages(&db, conv.id, bob.id, 10, Some(first[1].id)).unwrap();
        let bodies: Vec<_> = rest.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["m2", "m1", "m0"]);

        assert!(matches!(
            messages(&db, conv.id, bob.id, 10, Some(Uuid::new_v4())),
            Err(SocialError::NotFound("message"))
        ));
    }

    #[test]
    fn inbox_and_read_tracking() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", false);
        let carol = testutil::account(&db, "carol", false);

        let ab = find_or_create_conversation(&db, alice.id, bob.id).unwrap();
        let ac = find_or_create_conversation(&db, alice.id, carol.id).unwrap();
        post_message(&db, ac.id, carol.id, "hey alice").unwrap();
        post_message(&db, ab.id, bob.id, "one").unwrap();
        post_message(&db, ab.id, bob.id, "two").unwrap();

        let inbox = list_conversations(&db, alice.id).unwrap();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].conversation.id, ab.id);
        assert_eq!(inbox[0].counterpart.username, "bob");
        assert_eq!(inbox[0].unread, 2);
        assert_eq!(inbox[1].counterpart.username, "carol");
        assert_eq!(inbox[1].unread, 1);

        assert_eq!(mark_read(&db, ab.id, alice.id).unwrap(), 2);
        assert_eq!(mark_read(&db, ab.id, bob.id).unwrap(), 0);
        let inbox = list_conversations(&db, alice.id).unwrap();
        assert_eq!(inbox[0].unread, 0);

        let bob_view = list_conversations(&db, bob.id).unwrap();
        assert_eq!(bob_view.len(), 1);
        assert_eq!(bob_view[0].counterpart.username, "alice");
    }
}
