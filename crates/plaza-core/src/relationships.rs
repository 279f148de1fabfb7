//! Follow edges and the friend-request state machine.
//!
//! A public account is followed immediately; a private one must accept a
//! friend request first. Requests move PENDING -> ACCEPTED | REJECTED and
//! never leave a terminal state. Repeating the transition that produced the
//! current state is accepted as a no-op; any other transition out of a
//! terminal state is an `InvalidOperation`.

use anyhow::anyhow;
use plaza_db::Database;
use plaza_db::models::AccountRow;
use plaza_db::queries::relationships as q;
use plaza_types::models::{Account, FriendRequest, FriendRequestStatus};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Result, SocialError, now_ts, require_account, require_visible};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FriendRequestOutcome {
    /// Target is public: the actor now follows it, no request was stored.
    Followed,
    /// A new PENDING request was created.
    Requested(FriendRequest),
    /// A PENDING request for this pair already existed and is returned as-is.
    AlreadyPending(FriendRequest),
}

pub fn send_friend_request(db: &Database, actor: Uuid, target: Uuid) -> Result<FriendRequestOutcome> {
    if actor == target {
        return Err(SocialError::invalid("cannot send a friend request to yourself"));
    }

    db.with_tx(|tx| {
        require_account(tx, actor)?;
        let target_row = require_account(tx, target)?;
        let (actor_id, target_id) = (actor.to_string(), target.to_string());
        let now = now_ts();

        if !target_row.private {
            if q::insert_follow(tx, &actor_id, &target_id, &now)? {
                info!("{} now follows public account {}", actor, target);
            }
            return Ok(FriendRequestOutcome::Followed);
        }

        // The partial unique index decides whether this insert wins; a
        // concurrent or earlier PENDING request is fetched instead.
        let request_id = Uuid::new_v4().to_string();
        let created = q::insert_pending_request(tx, &request_id, &actor_id, &target_id, &now)?;
        let request = q::query_pending_request(tx, &actor_id, &target_id)?
            .ok_or_else(|| anyhow!("pending request {} -> {} missing after insert", actor, target))?
            .into_friend_request()?;

        if created {
            info!("Friend request {} sent: {} -> {}", request.id, actor, target);
            Ok(FriendRequestOutcome::Requested(request))
        } else {
            debug!("Friend request {} -> {} already pending", actor, target);
            Ok(FriendRequestOutcome::AlreadyPending(request))
        }
    })
}

pub fn accept_friend_request(db: &Database, request_id: Uuid, actor: Uuid) -> Result<FriendRequest> {
    resolve(db, request_id, actor, FriendRequestStatus::Accepted)
}

pub fn reject_friend_request(db: &Database, request_id: Uuid, actor: Uuid) -> Result<FriendRequest> {
    resolve(db, request_id, actor, FriendRequestStatus::Rejected)
}

fn resolve(db: &Database, request_id: Uuid, actor: Uuid, outcome: FriendRequestStatus) -> Result<FriendRequest> {
    db.with_tx(|tx| {
        let mut request = q::query_friend_request(tx, &request_id.to_string())?
            .ok_or(SocialError::NotFound("friend request"))?
            .into_friend_request()?;

        if request.receiver_id != actor {
            warn!("{} tried to {} friend request {} addressed to {}", actor, outcome, request.id, request.receiver_id);
            return Err(SocialError::PermissionDenied);
        }

        if request.status.is_terminal() && request.status != outcome {
            return Err(SocialError::invalid(format!(
                "friend request is already {}",
                request.status.as_str().to_lowercase()
            )));
        }

        if request.status == FriendRequestStatus::Pending {
            q::update_request_status(tx, &request_id.to_string(), outcome.as_str())?;
            request.status = outcome;
            info!("Friend request {} {}", request.id, outcome);
        }

        // The sender follows the receiver; the edge is not mutual.
        if outcome == FriendRequestStatus::Accepted {
            q::insert_follow(tx, &request.sender_id.to_string(), &request.receiver_id.to_string(), &now_ts())?;
        }

        Ok(request)
    })
}

/// Adds the edge `actor -> target` directly, bypassing friend requests.
/// Following yourself is a silent no-op.
pub fn follow(db: &Database, actor: Uuid, target: Uuid) -> Result<()> {
    if actor == target {
        return Ok(());
    }
    db.with_tx(|tx| {
        require_account(tx, actor)?;
        require_account(tx, target)?;
        if q::insert_follow(tx, &actor.to_string(), &target.to_string(), &now_ts())? {
            info!("{} followed {}", actor, target);
        }
        Ok(())
    })
}

/// `follow` for callers that must respect privacy: a private target has to
/// go through `send_friend_request`. Already-established edges are kept.
pub fn follow_if_public(db: &Database, actor: Uuid, target: Uuid) -> Result<()> {
    if actor == target {
        return Ok(());
    }
    db.with_tx(|tx| {
        require_account(tx, actor)?;
        let target_row = require_account(tx, target)?;
        let (actor_id, target_id) = (actor.to_string(), target.to_string());
        if target_row.private && !q::follow_exists(tx, &actor_id, &target_id)? {
            return Err(SocialError::PermissionDenied);
        }
        q::insert_follow(tx, &actor_id, &target_id, &now_ts())?;
        Ok(())
    })
}

pub fn unfollow(db: &Database, actor: Uuid, target: Uuid) -> Result<()> {
    if actor == target {
        return Ok(());
    }
    db.with_tx(|tx| {
        require_account(tx, actor)?;
        require_account(tx, target)?;
        if q::delete_follow(tx, &actor.to_string(), &target.to_string())? {
            info!("{} unfollowed {}", actor, target);
        }
        Ok(())
    })
}

/// Accounts following `account`. A private account's graph is visible to
/// itself and its followers only.
pub fn followers(db: &Database, account: Uuid, viewer: Uuid) -> Result<Vec<Account>> {
    let rows = db.with_tx(|tx| -> Result<Vec<AccountRow>> {
        require_visible(tx, account, viewer)?;
        Ok(q::query_followers(tx, &account.to_string())?)
    })?;
    rows.into_iter()
        .map(|row| row.into_account().map_err(SocialError::from))
        .collect()
}

pub fn following(db: &Database, account: Uuid, viewer: Uuid) -> Result<Vec<Account>> {
    let rows = db.with_tx(|tx| -> Result<Vec<AccountRow>> {
        require_visible(tx, account, viewer)?;
        Ok(q::query_following(tx, &account.to_string())?)
    })?;
    rows.into_iter()
        .map(|row| row.into_account().map_err(SocialError::from))
        .collect()
}

pub fn is_following(db: &Database, follower: Uuid, followee: Uuid) -> Result<bool> {
    Ok(db.is_following(&follower.to_string(), &followee.to_string())?)
}

/// (followers, following) counts.
pub fn follow_counts(db: &Database, account: Uuid) -> Result<(usize, usize)> {
    Ok(db.with_conn(|conn| q::count_follows(conn, &account.to_string()))?)
}

/// PENDING requests addressed to `actor`, newest first.
pub fn pending_requests_for(db: &Database, actor: Uuid) -> Result<Vec<FriendRequest>> {
    let rows = db.with_conn(|conn| {
        q::query_incoming_requests(conn, &actor.to_string(), FriendRequestStatus::Pending.as_str())
    })?;
    rows.into_iter()
        .map(|row| row.into_friend_request().map_err(SocialError::from))
        .collect()
}

pub fn sent_requests(db: &Database, actor: Uuid) -> Result<Vec<FriendRequest>> {
    let rows = db.with_conn(|conn| q::query_outgoing_requests(conn, &actor.to_string()))?;
    rows.into_iter()
        .map(|row| row.into_friend_request().map_err(SocialError::from))
        .collect()
}

pub fn has_pending_request(db: &Database, sender: Uuid, receiver: Uuid) -> Result<bool> {
    let row = db.with_conn(|conn| q::query_pending_request(conn, &sender.to_string(), &receiver.to_string()))?;
    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn usernames(accounts: Vec<Account>) -> Vec<String> {
        accounts.into_iter().map(|a| a.username).collect()
    }

    #[test]
    fn request_to_public_account_follows_immediately() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", false);

        let outcome = send_friend_request(&db, bob.id, alice.id).unwrap();
        assert_eq!(outcome, FriendRequestOutcome::Followed);
        assert_eq!(usernames(followers(&db, alice.id, alice.id).unwrap()), vec!["bob"]);
        assert!(sent_requests(&db, bob.id).unwrap().is_empty());

        // Idempotent
        send_friend_request(&db, bob.id, alice.id).unwrap();
        assert_eq!(followers(&db, alice.id, alice.id).unwrap().len(), 1);
    }

    #[test]
    fn request_to_private_account_is_created_once() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", true);

        let first = match send_friend_request(&db, alice.id, bob.id).unwrap() {
            FriendRequestOutcome::Requested(r) => r,
            other => panic!("expected Requested, got {:?}", other),
        };
        assert_eq!(first.status, FriendRequestStatus::Pending);
        assert_eq!(first.sender_id, alice.id);
        assert_eq!(first.receiver_id, bob.id);

        match send_friend_request(&db, alice.id, bob.id).unwrap() {
            FriendRequestOutcome::AlreadyPending(r) => assert_eq!(r.id, first.id),
            other => panic!("expected AlreadyPending, got {:?}", other),
        }

        let pending = pending_requests_for(&db, bob.id).unwrap();
        assert_eq!(pending.len(), 1);
        assert!(followers(&db, bob.id, bob.id).unwrap().is_empty());
        assert!(has_pending_request(&db, alice.id, bob.id).unwrap());
    }

    #[test]
    fn self_request_is_invalid() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", true);
        let err = send_friend_request(&db, alice.id, alice.id).unwrap_err();
        assert!(matches!(err, SocialError::InvalidOperation(_)));
    }

    #[test]
    fn request_to_unknown_account_is_not_found() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let err = send_friend_request(&db, alice.id, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, SocialError::NotFound("account")));
    }

    #[test]
    fn receiver_accepts_and_sender_becomes_follower() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", true);
        let FriendRequestOutcome::Requested(request) = send_friend_request(&db, alice.id, bob.id).unwrap() else {
            panic!("expected a new request");
        };

        let accepted = accept_friend_request(&db, request.id, bob.id).unwrap();
        assert_eq!(accepted.status, FriendRequestStatus::Accepted);
        assert_eq!(usernames(followers(&db, bob.id, bob.id).unwrap()), vec!["alice"]);
        // Not mutual
        assert!(followers(&db, alice.id, alice.id).unwrap().is_empty());
        assert!(pending_requests_for(&db, bob.id).unwrap().is_empty());

        // Re-accepting is a no-op
        let again = accept_friend_request(&db, request.id, bob.id).unwrap();
        assert_eq!(again.status, FriendRequestStatus::Accepted);
        assert_eq!(followers(&db, bob.id, bob.id).unwrap().len(), 1);
    }

    #[test]
    fn only_receiver_may_accept() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", true);
        let mallory = testutil::account(&db, "mallory", false);
        let FriendRequestOutcome::Requested(request) = send_friend_request(&db, alice.id, bob.id).unwrap() else {
            panic!("expected a new request");
        };

        for intruder in [alice.id, mallory.id] {
            let err = accept_friend_request(&db, request.id, intruder).unwrap_err();
            assert!(matches!(err, SocialError::PermissionDenied));
        }

        let stored = db.get_friend_request(&request.id.to_string()).unwrap().unwrap();
        assert_eq!(stored.status, "PENDING");
        assert!(followers(&db, bob.id, bob.id).unwrap().is_empty());
    }

    #[test]
    fn receiver_rejects_without_edge() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", true);
        let carol = testutil::account(&db, "carol", false);
        let FriendRequestOutcome::Requested(request) = send_friend_request(&db, alice.id, bob.id).unwrap() else {
            panic!("expected a new request");
        };

        let err = reject_friend_request(&db, request.id, carol.id).unwrap_err();
        assert!(matches!(err, SocialError::PermissionDenied));

        let rejected = reject_friend_request(&db, request.id, bob.id).unwrap();
        assert_eq!(rejected.status, FriendRequestStatus::Rejected);
        assert!(followers(&db, bob.id, bob.id).unwrap().is_empty());

        // Terminal: cannot be accepted afterwards, re-rejecting is fine.
        let err = accept_friend_request(&db, request.id, bob.id).unwrap_err();
        assert!(matches!(err, SocialError::InvalidOperation(_)));
        assert_eq!(
            reject_friend_request(&db, request.id, bob.id).unwrap().status,
            FriendRequestStatus::Rejected
        );

        // A fresh request may follow a rejected one.
        assert!(matches!(
            send_friend_request(&db, alice.id, bob.id).unwrap(),
            FriendRequestOutcome::Requested(_)
        ));
    }

    #[test]
    fn accepted_request_cannot_be_rejected() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", true);
        let FriendRequestOutcome::Requested(request) = send_friend_request(&db, alice.id, bob.id).unwrap() else {
            panic!("expected a new request");
        };
        accept_friend_request(&db, request.id, bob.id).unwrap();

        let err = reject_friend_request(&db, request.id, bob.id).unwrap_err();
        assert!(matches!(err, SocialError::InvalidOperation(_)));
        assert!(is_following(&db, alice.id, bob.id).unwrap());
    }

    #[test]
    fn unknown_request_is_not_found() {
        let db = testutil::db();
        let bob = testutil::account(&db, "bob", true);
        let err = accept_friend_request(&db, Uuid::new_v4(), bob.id).unwrap_err();
        assert!(matches!(err, SocialError::NotFound("friend request")));
    }

    #[test]
    fn direct_follow_and_unfollow() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", false);

        follow(&db, alice.id, alice.id).unwrap();
        assert!(following(&db, alice.id, alice.id).unwrap().is_empty());

        follow(&db, alice.id, bob.id).unwrap();
        follow(&db, alice.id, bob.id).unwrap();
        assert_eq!(usernames(following(&db, alice.id, alice.id).unwrap()), vec!["bob"]);
        assert_eq!(usernames(followers(&db, bob.id, bob.id).unwrap()), vec!["alice"]);
        assert_eq!(follow_counts(&db, bob.id).unwrap(), (1, 0));

        unfollow(&db, alice.id, bob.id).unwrap();
        unfollow(&db, alice.id, bob.id).unwrap();
        assert!(!is_following(&db, alice.id, bob.id).unwrap());

        assert!(matches!(follow(&db, alice.id, Uuid::new_v4()), Err(SocialError::NotFound(_))));
    }

    #[test]
    fn follow_if_public_respects_privacy() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", true);

        let err = follow_if_public(&db, alice.id, bob.id).unwrap_err();
        assert!(matches!(err, SocialError::PermissionDenied));

        follow_if_public(&db, bob.id, alice.id).unwrap();
        assert!(is_following(&db, bob.id, alice.id).unwrap());
    }

    #[test]
    fn mixed_privacy_scenario() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", false);
        let bob = testutil::account(&db, "bob", true);
        let carol = testutil::account(&db, "carol", true);

        // alice -> bob (private) yields a request, bob -> alice (public) a follow.
        assert!(matches!(
            send_friend_request(&db, alice.id, bob.id).unwrap(),
            FriendRequestOutcome::Requested(_)
        ));
        assert_eq!(send_friend_request(&db, bob.id, alice.id).unwrap(), FriendRequestOutcome::Followed);
        assert_eq!(usernames(followers(&db, alice.id, alice.id).unwrap()), vec!["bob"]);

        let FriendRequestOutcome::Requested(to_carol) = send_friend_request(&db, bob.id, carol.id).unwrap() else {
            panic!("expected a new request");
        };
        assert_eq!(to_carol.sender_id, bob.id);
        assert_eq!(to_carol.receiver_id, carol.id);
        assert_eq!(to_carol.status, FriendRequestStatus::Pending);
    }

    #[test]
    fn private_graph_needs_a_follow() {
        let db = testutil::db();
        let alice = testutil::account(&db, "alice", true);
        let bob = testutil::account(&db, "bob", false);
        let carol = testutil::account(&db, "carol", false);
        follow(&db, bob.id, alice.id).unwrap();

        assert!(matches!(followers(&db, alice.id, carol.id), Err(SocialError::PermissionDenied)));
        assert!(matches!(following(&db, alice.id, carol.id), Err(SocialError::PermissionDenied)));
        assert_eq!(usernames(followers(&db, alice.id, bob.id).unwrap()), vec!["bob"]);
        assert!(following(&db, alice.id, bob.id).unwrap().is_empty());
        assert_eq!(usernames(following(&db, bob.id, carol.id).unwrap()), vec!["alice"]);
        assert!(matches!(
            followers(&db, Uuid::new_v4(), carol.id),
            Err(SocialError::NotFound("account"))
        ));
    }
}
