//! Linked-account ledger operations.
//!
//! One row per Telegram identity, upsert-on-conflict keyed by chat_user_id.
//! Timestamps are stored as RFC 3339 text.

use chrono::{DateTime, Utc};
use rusqlite::Result as SqliteResult;
use rusqlite::Row;

use crate::db::Database;
use crate::models::LinkedAccount;

fn parse_timestamp(raw: Option<String>, chat_user_id: &str, column: &str) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => {
            log::warn!(
                "[DB] Invalid {} for account {}: {}",
                column,
                chat_user_id,
                raw
            );
            None
        }
    }
}

fn account_from_row(row: &Row<'_>) -> SqliteResult<LinkedAccount> {
    let chat_user_id: String = row.get(0)?;
    let created_at: Option<String> = row.get(4)?;
    let expires_at: Option<String> = row.get(5)?;
    Ok(LinkedAccount {
        created_at: parse_timestamp(created_at, &chat_user_id, "created_at"),
        expires_at: parse_timestamp(expires_at, &chat_user_id, "expires_at"),
        chat_user_id,
        request_user_id: row.get(1)?,
        media_user_id: row.get(2)?,
        username: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        guild_id: row.get(6)?,
        role_name: row.get(7)?,
    })
}

const ACCOUNT_COLUMNS: &str = "chat_user_id, request_user_id, media_user_id, username, \
                               created_at, expires_at, guild_id, role_name";

impl Database {
    /// Insert or update a linked account, keyed by chat identity.
    /// `created_at` is set on first insert and preserved on update.
    pub fn upsert_linked_account(&self, account: &LinkedAccount) -> SqliteResult<()> {
        let conn = self.conn();
        let created_at = account
            .created_at
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        conn.execute(
            "INSERT INTO linked_accounts
             (chat_user_id, request_user_id, media_user_id, username, created_at, expires_at, guild_id, role_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(chat_user_id) DO UPDATE SET
                request_user_id = excluded.request_user_id,
                media_user_id = excluded.media_user_id,
                username = excluded.username,
                expires_at = excluded.expires_at,
                guild_id = excluded.guild_id,
                role_name = excluded.role_name",
            rusqlite::params![
                account.chat_user_id,
                account.request_user_id,
                account.media_user_id,
                account.username,
                created_at,
                account.expires_at.map(|dt| dt.to_rfc3339()),
                account.guild_id,
                account.role_name,
            ],
        )?;
        Ok(())
    }

    pub fn get_linked_account(&self, chat_user_id: &str) -> SqliteResult<Option<LinkedAccount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM linked_accounts WHERE chat_user_id = ?1",
            ACCOUNT_COLUMNS
        ))?;
        let mut rows = stmt.query_map([chat_user_id], account_from_row)?;
        rows.next().transpose()
    }

    pub fn get_account_by_username(&self, username: &str) -> SqliteResult<Option<LinkedAccount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM linked_accounts WHERE username = ?1",
            ACCOUNT_COLUMNS
        ))?;
        let mut rows = stmt.query_map([username], account_from_row)?;
        rows.next().transpose()
    }

    pub fn delete_linked_account(&self, chat_user_id: &str) -> SqliteResult<usize> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM linked_accounts WHERE chat_user_id = ?1",
            [chat_user_id],
        )
    }

    /// All accounts carrying an expiry. Permanent rows (NULL expires_at) are
    /// never returned, so the sweep never inspects them.
    pub fn list_expiring_accounts(&self) -> SqliteResult<Vec<LinkedAccount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM linked_accounts WHERE expires_at IS NOT NULL",
            ACCOUNT_COLUMNS
        ))?;
        let rows = stmt.query_map([], account_from_row)?;
        rows.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account(chat_user_id: &str, username: &str) -> LinkedAccount {
        LinkedAccount {
            chat_user_id: chat_user_id.to_string(),
            request_user_id: Some("11".to_string()),
            media_user_id: Some("jf-1".to_string()),
            username: username.to_string(),
            created_at: None,
            expires_at: None,
            guild_id: None,
            role_name: None,
        }
    }

    #[test]
    fn test_upsert_and_get_roundtrip() {
        let db = Database::new_in_memory().unwrap();
        db.upsert_linked_account(&account("100", "alice")).unwrap();

        let stored = db.get_linked_account("100").unwrap().unwrap();
        assert_eq!(stored.username, "alice");
        assert_eq!(stored.media_user_id.as_deref(), Some("jf-1"));
        assert!(stored.created_at.is_some());
        assert!(stored.expires_at.is_none());
    }

    #[test]
    fn test_upsert_replaces_on_conflict() {
        let db = Database::new_in_memory().unwrap();
        db.upsert_linked_account(&account("100", "alice")).unwrap();

        let mut relinked = account("100", "alice2");
        relinked.expires_at = Some(Utc::now() + Duration::days(7));
        db.upsert_linked_account(&relinked).unwrap();

        let stored = db.get_linked_account("100").unwrap().unwrap();
        assert_eq!(stored.username, "alice2");
        assert!(stored.expires_at.is_some());
        // Still one row: the second write updated rather than inserted.
        assert_eq!(db.list_expiring_accounts().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_removes_row() {
        let db = Database::new_in_memory().unwrap();
        db.upsert_linked_account(&account("100", "alice")).unwrap();
        assert_eq!(db.delete_linked_account("100").unwrap(), 1);
        assert!(db.get_linked_account("100").unwrap().is_none());
        assert_eq!(db.delete_linked_account("100").unwrap(), 0);
    }

    #[test]
    fn test_list_expiring_skips_permanent_rows() {
        let db = Database::new_in_memory().unwrap();
        db.upsert_linked_account(&account("1", "permanent")).unwrap();

        let mut trial = account("2", "trial");
        trial.expires_at = Some(Utc::now() + Duration::days(7));
        db.upsert_linked_account(&trial).unwrap();

        let expiring = db.list_expiring_accounts().unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].username, "trial");
    }

    #[test]
    fn test_get_by_username() {
        let db = Database::new_in_memory().unwrap();
        db.upsert_linked_account(&account("100", "alice")).unwrap();
        assert!(db.get_account_by_username("alice").unwrap().is_some());
        assert!(db.get_account_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn test_on_disk_database_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.db");
        let db = Database::new(path.to_str().unwrap()).unwrap();
        db.upsert_linked_account(&account("100", "alice")).unwrap();
        assert!(path.exists());
    }
}
