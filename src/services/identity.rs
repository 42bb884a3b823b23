//! Identity provider: accounts, sessions and display profile.

use async_trait::async_trait;
use log::info;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::{Display, EnumString};
use thiserror::Error as ThisError;

/// Error codes reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
pub enum AuthErrorCode {
    #[strum(serialize = "auth/invalid-credential")]
    InvalidCredential,
    #[strum(serialize = "auth/user-not-found")]
    UserNotFound,
    #[strum(serialize = "auth/email-already-in-use")]
    EmailAlreadyInUse,
    #[strum(serialize = "auth/weak-password")]
    WeakPassword,
    #[strum(serialize = "auth/invalid-email")]
    InvalidEmail,
    #[strum(default)]
    Other(String),
}

impl AuthErrorCode {
    /// Parse a provider code string; unknown codes are kept verbatim.
    pub fn parse(code: &str) -> Self {
        Self::from_str(code).unwrap_or_else(|_| AuthErrorCode::Other(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuthErrorCode::InvalidCredential => "auth/invalid-credential",
            AuthErrorCode::UserNotFound => "auth/user-not-found",
            AuthErrorCode::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthErrorCode::WeakPassword => "auth/weak-password",
            AuthErrorCode::InvalidEmail => "auth/invalid-email",
            AuthErrorCode::Other(code) => code,
        }
    }
}

/// What the caller was doing when the provider failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AuthOperation {
    #[strum(serialize = "sign-in")]
    SignIn,
    #[strum(serialize = "registration")]
    Register,
    #[strum(serialize = "sign-out")]
    SignOut,
    #[strum(serialize = "profile update")]
    Profile,
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {}", .code.as_str())]
pub struct AuthError {
    pub operation: AuthOperation,
    pub code: AuthErrorCode,
}

impl AuthError {
    pub fn new(operation: AuthOperation, code: AuthErrorCode) -> Self {
        Self { operation, code }
    }

    /// Fixed user-facing message for this failure.
    pub fn user_message(&self) -> String {
        use AuthErrorCode::*;
        let msg = match (self.operation, &self.code) {
            (AuthOperation::SignIn, InvalidCredential) => "Invalid credentials",
            (AuthOperation::SignIn, UserNotFound) => "User not found",
            (AuthOperation::SignIn, _) => "Could not sign in",
            (AuthOperation::Register, EmailAlreadyInUse) => "This email is already in use",
            (AuthOperation::Register, InvalidEmail) => "Invalid email address",
            (AuthOperation::Register, WeakPassword) => "The password is too weak",
            (AuthOperation::Register, _) => "Could not create the account",
            (AuthOperation::SignOut, _) => "Could not sign out",
            (AuthOperation::Profile, _) => "Could not update the profile",
        };
        msg.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Fields to change on the signed-in user's provider profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in.
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Update the signed-in user's display name and/or photo.
    async fn update_profile(&self, update: ProfileUpdate) -> Result<AuthUser, AuthError>;

    fn current_user(&self) -> Option<AuthUser>;
}

/// `x@y.z` with no whitespace and a single `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

struct Account {
    user: AuthUser,
    password: String,
}

/// In-process identity provider.
///
/// Counts every call so tests can assert that validation failures never
/// reach the provider.
#[derive(Default)]
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of provider operations invoked so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        self.count();
        let fail = |code| AuthError::new(AuthOperation::Register, code);

        if !is_valid_email(email) {
            return Err(fail(AuthErrorCode::InvalidEmail));
        }
        if password.len() < 6 {
            return Err(fail(AuthErrorCode::WeakPassword));
        }

        let key = email.to_lowercase();
        let mut accounts = self.accounts.lock();
        if accounts.contains_key(&key) {
            return Err(fail(AuthErrorCode::EmailAlreadyInUse));
        }

        let user = AuthUser {
            uid: uuid::Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            display_name: None,
            photo_url: None,
        };
        accounts.insert(
            key.clone(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        *self.current.lock() = Some(key);

        info!("[Auth] Created account {}", user.uid);
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        self.count();
        let fail = |code| AuthError::new(AuthOperation::SignIn, code);

        let key = email.to_lowercase();
        let accounts = self.accounts.lock();
        let account = accounts
            .get(&key)
            .ok_or_else(|| fail(AuthErrorCode::UserNotFound))?;
        if account.password != password {
            return Err(fail(AuthErrorCode::InvalidCredential));
        }

        *self.current.lock() = Some(key);
        Ok(account.user.clone())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.count();
        *self.current.lock() = None;
        Ok(())
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<AuthUser, AuthError> {
        self.count();
        let no_user = || {
            AuthError::new(
                AuthOperation::Profile,
                AuthErrorCode::Other("auth/no-current-user".into()),
            )
        };

        let Some(key) = self.current.lock().clone() else {
            return Err(no_user());
        };
        let mut accounts = self.accounts.lock();
        let Some(account) = accounts.get_mut(&key) else {
            return Err(no_user());
        };

        if let Some(name) = update.display_name {
            account.user.display_name = Some(name);
        }
        if let Some(url) = update.photo_url {
            account.user.photo_url = Some(url);
        }
        Ok(account.user.clone())
    }

    fn current_user(&self) -> Option<AuthUser> {
        let key = self.current.lock().clone()?;
        self.accounts.lock().get(&key).map(|a| a.user.clone())
    }
}
