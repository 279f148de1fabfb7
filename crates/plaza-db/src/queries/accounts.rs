use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::Database;
use crate::models::AccountRow;

const ACCOUNT_COLUMNS: &str = "id, username, password, roles, private, created_at";

impl Database {
    /// Returns `false` if the username (or id) is already taken.
    pub fn create_account(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| insert_account(conn, id, username, password_hash, created_at))
    }

    pub fn get_account_by_username(&self, username: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account_by_username(conn, username))
    }

    pub fn get_account_by_id(&self, id: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account_by_id(conn, id))
    }

    pub fn list_accounts(&self) -> Result<Vec<AccountRow>> {
        self.with_conn(query_accounts)
    }
}

pub fn insert_account(
    conn: &Connection,
    id: &str,
    username: &str,
    password_hash: &str,
    created_at: &str,
) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO accounts (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)",
        (id, username, password_hash, created_at),
    )?;
    Ok(changed == 1)
}

pub(crate) fn map_account(row: &Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        roles: row.get(3)?,
        private: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn query_account_by_id(conn: &Connection, id: &str) -> Result<Option<AccountRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"))?;
    stmt.query_row([id], map_account).optional()
}

pub fn query_account_by_username(conn: &Connection, username: &str) -> Result<Option<AccountRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"))?;
    stmt.query_row([username], map_account).optional()
}

pub fn query_accounts(conn: &Connection) -> Result<Vec<AccountRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY username"))?;
    let rows = stmt
        .query_map([], map_account)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_privacy(conn: &Connection, id: &str, private: bool) -> Result<bool> {
    let changed = conn.execute("UPDATE accounts SET private = ?2 WHERE id = ?1", rusqlite::params![id, private])?;
    Ok(changed == 1)
}

/// Returns `false` when another account already holds `username`.
pub fn update_username(conn: &Connection, id: &str, username: &str) -> Result<bool> {
    let changed = conn.execute("UPDATE OR IGNORE accounts SET username = ?2 WHERE id = ?1", (id, username))?;
    Ok(changed == 1)
}

pub fn update_password(conn: &Connection, id: &str, password_hash: &str) -> Result<bool> {
    let changed = conn.execute("UPDATE accounts SET password = ?2 WHERE id = ?1", (id, password_hash))?;
    Ok(changed == 1)
}

pub fn update_roles(conn: &Connection, id: &str, roles: &[String]) -> Result<bool> {
    let encoded = serde_json::to_string(roles)?;
    let changed = conn.execute("UPDATE accounts SET roles = ?2 WHERE id = ?1", (id, encoded))?;
    Ok(changed == 1)
}

/// Removes the account and everything it owns. Conversations the account took
/// part in are dropped as a whole so no one-sided thread survives.
pub fn delete_account(conn: &Connection, id: &str) -> Result<bool> {
    conn.execute(
        "DELETE FROM conversations WHERE id IN
            (SELECT conversation_id FROM conversation_participants WHERE account_id = ?1)",
        [id],
    )?;
    let changed = conn.execute("DELETE FROM accounts WHERE id = ?1", [id])?;
    Ok(changed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    #[test]
    fn duplicate_username_is_ignored() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_account("a1", "alice", "h1", "2026-01-01T00:00:00.000000Z").unwrap());
        assert!(!db.create_account("a2", "alice", "h2", "2026-01-01T00:00:00.000000Z").unwrap());

        let row = db.get_account_by_username("alice").unwrap().unwrap();
        assert_eq!(row.id, "a1");
        assert_eq!(row.password, "h1");
        assert_eq!(row.roles, "[\"ROLE_USER\"]");
        assert!(!row.private);
    }

    #[test]
    fn missing_account_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_account_by_id("nope").unwrap().is_none());
        assert!(db.get_account_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn privacy_and_roles_update() {
        let db = Database::open_in_memory().unwrap();
        fixtures::account(&db, "a1", "alice", true);

        db.with_conn(|conn| {
            update_roles(conn, "a1", &["ROLE_USER".to_string(), "ROLE_ADMIN".to_string()])?;
            Ok(())
        })
        .unwrap();

        let row = db.get_account_by_id("a1").unwrap().unwrap();
        assert!(row.private);
        assert_eq!(row.roles, "[\"ROLE_USER\",\"ROLE_ADMIN\"]");
    }

    #[test]
    fn rename_refuses_taken_username() {
        let db = Database::open_in_memory().unwrap();
        fixtures::account(&db, "a1", "alice", false);
        fixtures::account(&db, "b1", "bob", false);

        db.with_conn(|conn| {
            assert!(!update_username(conn, "b1", "alice")?);
            assert!(update_username(conn, "b1", "bobby")?);
            assert!(update_username(conn, "b1", "bobby")?);
            assert!(update_password(conn, "b1", "h2")?);
            Ok(())
        })
        .unwrap();

        let row = db.get_account_by_id("b1").unwrap().unwrap();
        assert_eq!(row.username, "bobby");
        assert_eq!(row.password, "h2");
        assert_eq!(db.get_account_by_id("a1").unwrap().unwrap().username, "alice");
    }

    #[test]
    fn list_is_ordered_by_username() {
        let db = Database::open_in_memory().unwrap();
        fixtures::account(&db, "c", "carol", false);
        fixtures::account(&db, "a", "alice", false);
        fixtures::account(&db, "b", "bob", false);

        let names: Vec<String> = db.list_accounts().unwrap().into_iter().map(|r| r.username).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }
}
