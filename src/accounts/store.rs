//! Account stores.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{Account, AccountError, AccountStore, SessionEvent};
use crate::storage::JsonFile;

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountFile {
    #[serde(default)]
    accounts: Vec<Account>,
}

fn add_to(accounts: &mut Vec<Account>, account: Account) -> Result<Account, AccountError> {
    if account.username.trim().is_empty() {
        return Err(AccountError::Invalid("username must not be empty".to_string()));
    }
    if accounts.iter().any(|a| a.username == account.username) {
        return Err(AccountError::DuplicateUsername(account.username));
    }
    accounts.push(account.clone());
    Ok(account)
}

fn record_in(accounts: &mut [Account], username: &str, event: &SessionEvent) -> Option<Account> {
    let account = accounts.iter_mut().find(|a| a.username == username)?;
    account.record(event);
    Some(account.clone())
}

fn delete_from(accounts: &mut Vec<Account>, username: &str) -> bool {
    let before = accounts.len();
    accounts.retain(|a| a.username != username);
    accounts.len() < before
}

/// Account store backed by a JSON file
#[derive(Debug)]
pub struct JsonAccountStore {
    file: JsonFile,
}

impl JsonAccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn load(&self) -> Result<Vec<Account>, AccountError> {
        Ok(self.file.read::<AccountFile, AccountError>()?.accounts)
    }
}

impl AccountStore for JsonAccountStore {
    fn get(&self, username: &str) -> Result<Option<Account>, AccountError> {
        Ok(self.load()?.into_iter().find(|a| a.username == username))
    }

    fn list(&self) -> Result<Vec<Account>, AccountError> {
        self.load()
    }

    fn add(&self, account: Account) -> Result<Account, AccountError> {
        self.file
            .modify(|doc: &mut AccountFile| add_to(&mut doc.accounts, account), |_| true)
    }

    fn record(&self, username: &str, event: SessionEvent) -> Result<Option<Account>, AccountError> {
        self.file.modify(
            |doc: &mut AccountFile| Ok(record_in(&mut doc.accounts, username, &event)),
            Option::is_some,
        )
    }

    fn delete(&self, username: &str) -> Result<bool, AccountError> {
        self.file.modify(
            |doc: &mut AccountFile| Ok(delete_from(&mut doc.accounts, username)),
            |removed| *removed,
        )
    }
}

/// In-process account store
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<Vec<Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account, ignoring duplicates
    pub fn with_account(self, username: &str, password: &str) -> Self {
        if let Err(e) = add_to(&mut self.accounts.write(), Account::new(username, password)) {
            tracing::debug!(account = %username, error = %e, "account not seeded");
        }
        self
    }
}

impl AccountStore for MemoryAccountStore {
    fn get(&self, username: &str) -> Result<Option<Account>, AccountError> {
        Ok(self.accounts.read().iter().find(|a| a.username == username).cloned())
    }

    fn list(&self) -> Result<Vec<Account>, AccountError> {
        Ok(self.accounts.read().clone())
    }

    fn add(&self, account: Account) -> Result<Account, AccountError> {
        add_to(&mut self.accounts.write(), account)
    }

    fn record(&self, username: &str, event: SessionEvent) -> Result<Option<Account>, AccountError> {
        Ok(record_in(&mut self.accounts.write(), username, &event))
    }

    fn delete(&self, username: &str) -> Result<bool, AccountError> {
        Ok(delete_from(&mut self.accounts.write(), username))
    }
}
