//! Domain services for Plaza. Every operation takes the acting account
//! explicitly and runs its writes inside one database transaction.

pub mod accounts;
pub mod conversations;
pub mod error;
pub mod posts;
pub mod relationships;
pub mod stories;

pub use error::{Result, SocialError};

use chrono::{DateTime, SubsecRound, Utc};
use plaza_db::models::AccountRow;
use plaza_db::queries::accounts::query_account_by_id;
use plaza_db::queries::relationships::follow_exists;
use plaza_db::{Connection, format_ts};
use uuid::Uuid;

/// Current time at the precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn now_ts() -> String {
    format_ts(now())
}

pub(crate) fn require_account(conn: &Connection, id: Uuid) -> Result<AccountRow> {
    query_account_by_id(conn, &id.to_string())?.ok_or(SocialError::NotFound("account"))
}

/// Loads `owner` if `viewer` may see its content: a private account is
/// visible to itself and its followers only.
pub(crate) fn require_visible(conn: &Connection, owner: Uuid, viewer: Uuid) -> Result<AccountRow> {
    let row = require_account(conn, owner)?;
    if row.private && owner != viewer && !follow_exists(conn, &viewer.to_string(), &owner.to_string())? {
        return Err(SocialError::PermissionDenied);
    }
    Ok(row)
}
