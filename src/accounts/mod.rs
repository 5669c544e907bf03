//! Platform Accounts
//!
//! Accounts the service can send and poll as. Credentials are kept in a flat
//! JSON file shaped `{"accounts": [...]}`; a new account is only stored once
//! the gateway accepted a login with its password.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channels::MessagingGateway;
use crate::storage::timestamp;

pub use store::{JsonAccountStore, MemoryAccountStore};

/// Errors raised by account stores
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Account store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Account store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Account already exists: {0}")]
    DuplicateUsername(String),

    #[error("Invalid account: {0}")]
    Invalid(String),
}

/// Session state last observed for an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
    /// Never logged in through this service
    #[default]
    Pending,
    /// Last login succeeded
    Active,
    /// Last login failed; see `error_message`
    Failed,
    /// Session closed on request
    LoggedOut,
}

/// Stored platform account
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub login_status: LoginStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

fn default_active() -> bool {
    true
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .field("login_status", &self.login_status)
            .finish()
    }
}

/// Result of a login or logout, recorded on the account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(DateTime<Utc>),
    LoginFailed(String),
    LoggedOut,
}

impl Account {
    /// Fresh, never-logged-in account
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            is_active: true,
            last_login: None,
            login_status: LoginStatus::Pending,
            error_message: None,
        }
    }

    /// Update session fields after a login or logout
    pub fn record(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::LoggedIn(at) => {
                self.last_login = Some(*at);
                self.login_status = LoginStatus::Active;
                self.error_message = None;
            }
            SessionEvent::LoginFailed(error) => {
                self.login_status = LoginStatus::Failed;
                self.error_message = Some(error.clone());
            }
            SessionEvent::LoggedOut => {
                self.login_status = LoginStatus::LoggedOut;
            }
        }
    }

    /// Public view without the password
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            username: self.username.clone(),
            is_active: self.is_active,
            last_login: self.last_login,
            login_status: self.login_status,
            error_message: self.error_message.clone(),
        }
    }
}

/// Account as exposed over the API and CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub username: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub login_status: LoginStatus,
    pub error_message: Option<String>,
}

/// Credentials submitted for a new account
#[derive(Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
}

impl NewAccount {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Trimmed credentials; both must be non-empty
    pub fn validate(self) -> Result<Self, AccountError> {
        let username = self.username.trim().to_string();
        if username.is_empty() {
            return Err(AccountError::Invalid("username must not be empty".to_string()));
        }
        if self.password.trim().is_empty() {
            return Err(AccountError::Invalid(format!(
                "password must not be empty for {username}"
            )));
        }
        Ok(Self {
            username,
            password: self.password,
        })
    }
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Account persistence.
pub trait AccountStore: Send + Sync {
    /// Find an account by username
    fn get(&self, username: &str) -> Result<Option<Account>, AccountError>;

    /// All accounts in insertion order
    fn list(&self) -> Result<Vec<Account>, AccountError>;

    /// Store a new account; fails on a duplicate username
    fn add(&self, account: Account) -> Result<Account, AccountError>;

    /// Record a session event; `None` if the account does not exist
    fn record(&self, username: &str, event: SessionEvent) -> Result<Option<Account>, AccountError>;

    /// Remove an account; false if it did not exist
    fn delete(&self, username: &str) -> Result<bool, AccountError>;
}

/// Why an account could not be registered
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error(transparent)]
    Store(#[from] AccountError),
}

/// Validate credentials, log in through the gateway and store the account.
///
/// Nothing is stored when the login fails or the username is taken; the
/// duplicate check runs before the login attempt.
pub async fn register(
    gateway: &dyn MessagingGateway,
    store: &dyn AccountStore,
    new: NewAccount,
) -> Result<Account, RegisterError> {
    let new = new.validate()?;
    if store.get(&new.username)?.is_some() {
        return Err(AccountError::DuplicateUsername(new.username).into());
    }

    if let Err(e) = gateway.login(&new.username, &new.password).await {
        tracing::warn!(account = %new.username, error = %e, "login failed; account not added");
        return Err(RegisterError::LoginFailed(e.to_string()));
    }

    let mut account = Account::new(new.username, new.password);
    account.record(&SessionEvent::LoggedIn(Utc::now()));
    let account = store.add(account)?;
    tracing::info!(account = %account.username, "account added");
    Ok(account)
}

/// Totals of a bulk registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisterReport {
    pub added: usize,
    pub failed: usize,
}

/// Register accounts one after another, logging each failure
pub async fn register_all(
    gateway: &dyn MessagingGateway,
    store: &dyn AccountStore,
    accounts: Vec<NewAccount>,
) -> RegisterReport {
    let mut report = RegisterReport::default();
    for new in accounts {
        let username = new.username.clone();
        match register(gateway, store, new).await {
            Ok(_) => report.added += 1,
            Err(e) => {
                tracing::error!(account = %username, error = %e, "failed to add account");
                report.failed += 1;
            }
        }
    }
    tracing::info!(added = report.added, failed = report.failed, "bulk account import finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{ChannelError, ChannelResult, DeliveryResult, InboundMessage};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Accepts logins whose password is "secret"
    #[derive(Default)]
    struct Doorman {
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessagingGateway for Doorman {
        async fn poll_unseen(&self, _account_id: &str) -> ChannelResult<Vec<InboundMessage>> {
            Ok(Vec::new())
        }

        async fn send_reply(
            &self,
            _account_id: &str,
            _thread_id: &str,
            _text: &str,
        ) -> ChannelResult<DeliveryResult> {
            Ok(DeliveryResult::delivered(None))
        }

        async fn send_dm(
            &self,
            _account_id: &str,
            _recipient: &str,
            _text: &str,
        ) -> ChannelResult<DeliveryResult> {
            Ok(DeliveryResult::delivered(None))
        }

        async fn login(&self, account_id: &str, password: &str) -> ChannelResult<()> {
            self.attempts.lock().push(account_id.to_string());
            if password == "secret" {
                Ok(())
            } else {
                Err(ChannelError::AuthenticationFailed("bad password".to_string()))
            }
        }
    }

    #[tokio::test]
    async fn test_register_logs_in_then_stores() {
        let gateway = Doorman::default();
        let store = MemoryAccountStore::new();

        let account = register(&gateway, &store, NewAccount::new(" shop ", "secret"))
            .await
            .unwrap();
        assert_eq!(account.username, "shop");
        assert_eq!(account.login_status, LoginStatus::Active);
        assert!(account.last_login.is_some());
        assert_eq!(store.get("shop").unwrap().unwrap(), account);
    }

    #[tokio::test]
    async fn test_register_failed_login_stores_nothing() {
        let gateway = Doorman::default();
        let store = MemoryAccountStore::new();

        let err = register(&gateway, &store, NewAccount::new("shop", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::LoginFailed(_)));
        assert!(err.to_string().contains("bad password"));
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_duplicate_skips_login() {
        let gateway = Doorman::default();
        let store = MemoryAccountStore::new();
        store.add(Account::new("shop", "secret")).unwrap();

        let err = register(&gateway, &store, NewAccount::new("shop", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegisterError::Store(AccountError::DuplicateUsername(ref name)) if name == "shop"
        ));
        assert!(gateway.attempts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_register_all_counts() {
        let gateway = Doorman::default();
        let store = MemoryAccountStore::new();

        let report = register_all(
            &gateway,
            &store,
            vec![
                NewAccount::new("a", "secret"),
                NewAccount::new("b", "nope"),
                NewAccount::new("c", "secret"),
                NewAccount::new("", "secret"),
            ],
        )
        .await;
        assert_eq!(report, RegisterReport { added: 2, failed: 2 });
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_record_session_events() {
        let mut account = Account::new("shop", "pw");
        account.record(&SessionEvent::LoginFailed("checkpoint".to_string()));
        assert_eq!(account.login_status, LoginStatus::Failed);
        assert_eq!(account.error_message.as_deref(), Some("checkpoint"));

        let at = Utc::now();
        account.record(&SessionEvent::LoggedIn(at));
        assert_eq!(account.login_status, LoginStatus::Active);
        assert_eq!(account.last_login, Some(at));
        assert!(account.error_message.is_none());

        account.record(&SessionEvent::LoggedOut);
        assert_eq!(account.login_status, LoginStatus::LoggedOut);
        assert_eq!(account.last_login, Some(at));
    }

    #[test]
    fn test_debug_hides_password() {
        let account = Account::new("shop", "hunter2");
        assert!(!format!("{account:?}").contains("hunter2"));
        assert!(!format!("{:?}", NewAccount::new("shop", "hunter2")).contains("hunter2"));
    }

    #[test]
    fn test_summary_has_no_password() {
        let value = serde_json::to_value(Account::new("shop", "hunter2").summary()).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["login_status"], "pending");
    }

    #[test]
    fn test_reads_older_account_records() {
        let json = r#"{
            "username": "shop",
            "password": "pw",
            "is_active": true,
            "last_login": "2024-05-01 09:30:00.5",
            "login_status": "pending",
            "error_message": null
        }"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert!(account.last_login.is_some());

        let minimal: Account =
            serde_json::from_str(r#"{"username": "x", "password": "y"}"#).unwrap();
        assert!(minimal.is_active);
        assert_eq!(minimal.login_status, LoginStatus::Pending);
    }
}
