//! Logical contract of the account ledger.
//!
//! The saga, the deprovisioner, and the sweeper only ever see this trait; the
//! SQLite implementation lives in `db/tables/linked_accounts.rs`.

use crate::db::Database;
use crate::error::Error;
use crate::models::LinkedAccount;

pub trait LinkedAccountStore: Send + Sync {
    fn get(&self, chat_user_id: &str) -> Result<Option<LinkedAccount>, Error>;
    fn get_by_username(&self, username: &str) -> Result<Option<LinkedAccount>, Error>;
    /// Insert-or-update keyed by chat identity.
    fn upsert(&self, account: &LinkedAccount) -> Result<(), Error>;
    fn delete(&self, chat_user_id: &str) -> Result<(), Error>;
    /// Only rows with a non-null expiry; permanent accounts are never listed.
    fn list_expiring(&self) -> Result<Vec<LinkedAccount>, Error>;
}

impl LinkedAccountStore for Database {
    fn get(&self, chat_user_id: &str) -> Result<Option<LinkedAccount>, Error> {
        Ok(self.get_linked_account(chat_user_id)?)
    }

    fn get_by_username(&self, username: &str) -> Result<Option<LinkedAccount>, Error> {
        Ok(self.get_account_by_username(username)?)
    }

    fn upsert(&self, account: &LinkedAccount) -> Result<(), Error> {
        Ok(self.upsert_linked_account(account)?)
    }

    fn delete(&self, chat_user_id: &str) -> Result<(), Error> {
        self.delete_linked_account(chat_user_id)?;
        Ok(())
    }

    fn list_expiring(&self) -> Result<Vec<LinkedAccount>, Error> {
        Ok(self.list_expiring_accounts()?)
    }
}
