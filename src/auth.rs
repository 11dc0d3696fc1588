use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::info;
use ulid::Ulid;

use crate::model::Identity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    UnknownAccount,
    WrongPassword,
    AccountExists,
    InvalidEmail,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::UnknownAccount => write!(f, "no account for this email"),
            AuthError::WrongPassword => write!(f, "wrong password"),
            AuthError::AccountExists => write!(f, "an account with this email already exists"),
            AuthError::InvalidEmail => write!(f, "invalid email"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Source of the signed-in identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in identity, if any.
    fn current(&self) -> Option<Identity>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self);

    /// Notified on every sign-in and sign-out.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;
}

#[derive(Debug)]
struct Account {
    identity: Identity,
    password: String,
}

/// Email/password accounts held in memory, for local runs and tests.
#[derive(Debug)]
pub struct LocalIdentityProvider {
    accounts: DashMap<String, Account>,
    state: watch::Sender<Option<Identity>>,
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            state: watch::Sender::new(None),
        }
    }

    /// Create an account with a fresh uid. Does not sign in.
    pub fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        let key = email.to_lowercase();
        if self.accounts.contains_key(&key) {
            return Err(AuthError::AccountExists);
        }
        let identity = Identity {
            uid: Ulid::new().to_string(),
            email: email.to_string(),
        };
        self.accounts.insert(
            key,
            Account {
                identity: identity.clone(),
                password: password.to_string(),
            },
        );
        Ok(identity)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn current(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let key = email.trim().to_lowercase();
        let identity = {
            let account = self.accounts.get(&key).ok_or(AuthError::UnknownAccount)?;
            if account.password != password {
                return Err(AuthError::WrongPassword);
            }
            account.identity.clone()
        };
        self.state.send_replace(Some(identity.clone()));
        info!(uid = %identity.uid, "signed in");
        Ok(identity)
    }

    async fn sign_out(&self) {
        if let Some(prev) = self.state.send_replace(None) {
            info!(uid = %prev.uid, "signed out");
        }
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.state.subscribe()
    }
}
