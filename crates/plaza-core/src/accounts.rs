use plaza_db::queries::accounts as q;
use plaza_db::{Connection, Database};
use plaza_types::models::{Account, ROLE_ADMIN};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Result, SocialError, now_ts, require_account};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 32;

pub fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(SocialError::invalid(format!(
            "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return Err(SocialError::invalid("username may only contain letters, digits, '_' and '.'"));
    }
    Ok(())
}

/// Creates a public account with the `ROLE_USER` role. `password_hash` is
/// stored as-is; hashing belongs to the caller.
pub fn register(db: &Database, username: &str, password_hash: &str) -> Result<Account> {
    validate_username(username)?;

    let id = Uuid::new_v4();
    let created = db.with_tx(|tx| -> Result<Option<Account>> {
        if !q::insert_account(tx, &id.to_string(), username, password_hash, &now_ts())? {
            return Ok(None);
        }
        Ok(Some(require_account(tx, id)?.into_account()?))
    })?;

    match created {
        Some(account) => {
            info!("Registered account {} ({})", account.username, account.id);
            Ok(account)
        }
        None => Err(SocialError::Conflict(format!("username '{username}' is taken"))),
    }
}

pub fn find_by_id(db: &Database, id: Uuid) -> Result<Option<Account>> {
    db.get_account_by_id(&id.to_string())?
        .map(|row| row.into_account())
        .transpose()
        .map_err(SocialError::from)
}

pub fn find_by_username(db: &Database, username: &str) -> Result<Option<Account>> {
    db.get_account_by_username(username)?
        .map(|row| row.into_account())
        .transpose()
        .map_err(SocialError::from)
}

pub fn get(db: &Database, id: Uuid) -> Result<Account> {
    find_by_id(db, id)?.ok_or(SocialError::NotFound("account"))
}

pub fn list(db: &Database) -> Result<Vec<Account>> {
    db.list_accounts()?
        .into_iter()
        .map(|row| row.into_account().map_err(SocialError::from))
        .collect()
}

/// Fields of the actor's own profile to change; `None` leaves a field as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileUpdate<'a> {
    pub username: Option<&'a str>,
    /// Already hashed by the caller.
    pub password_hash: Option<&'a str>,
    pub private: Option<bool>,
}

/// Applies `update` to the actor's own account in one transaction. Pending
/// requests are left alone when going public; they can still be answered.
pub fn update_profile(db: &Database, actor: Uuid, update: &ProfileUpdate<'_>) -> Result<Account> {
    if let Some(username) = update.username {
        validate_username(username)?;
    }

    db.with_tx(|tx| {
        require_account(tx, actor)?;
        let id = actor.to_string();

        if let Some(username) = update.username {
            let renamed = q::update_username(tx, &id, username)?;
            if !renamed {
                return Err(SocialError::Conflict(format!("username '{username}' is taken")));
            }
        }
        if let Some(hash) = update.password_hash {
            q::update_password(tx, &id, hash)?;
            info!("Account {} changed its password", actor);
        }
        if let Some(private) = update.private {
            q::update_privacy(tx, &id, private)?;
            info!("Account {} is now {}", actor, if private { "private" } else { "public" });
        }

        Ok(require_account(tx, actor)?.into_account()?)
    })
}

pub fn set_private(db: &Database, actor: Uuid, private: bool) -> Result<Account> {
    update_profile(
        db,
        actor,
        &ProfileUpdate {
            private: Some(private),
            ..ProfileUpdate::default()
        },
    )
}

fn add_admin_role(tx: &Connection, mut account: Account) -> Result<(Account, bool)> {
    if account.is_admin() {
        return Ok((account, false));
    }
    account.roles.push(ROLE_ADMIN.to_string());
    q::update_roles(tx, &account.id.to_string(), &account.roles)?;
    info!("Granted admin role to {} ({})", account.username, account.id);
    Ok((account, true))
}

pub fn grant_admin(db: &Database, target: Uuid) -> Result<Account> {
    db.with_tx(|tx| {
        let account = require_account(tx, target)?.into_account()?;
        Ok(add_admin_role(tx, account)?.0)
    })
}

/// Grants the admin role to every listed username that has an account.
/// Unknown names are skipped. Returns how many accounts gained the role.
pub fn promote_admins(db: &Database, usernames: &[String]) -> Result<usize> {
    db.with_tx(|tx| {
        let mut promoted = 0;
        for username in usernames {
            let Some(row) = q::query_account_by_username(tx, username)? else {
                debug!("Admin account '{}' is not registered yet", username);
                continue;
            };
            if add_admin_role(tx, row.into_account()?)?.1 {
                promoted += 1;
            }
        }
        Ok(promoted)
    })
}

/// Removes `target` and everything it owns. Allowed for the account itself
/// and for administrators.
pub fn delete(db: &Database, actor: Uuid, target: Uuid) -> Result<()> {
    db.with_tx(|tx| {
        let actor_account = require_account(tx, actor)?.into_account()?;
        require_account(tx, target)?;
        if actor != target && !actor_account.is_admin() {
            return Err(SocialError::PermissionDenied);
        }
        q::delete_account(tx, &target.to_string())?;
        info!("Account {} deleted by {}", target, actor);
        Ok(())
    })
}
