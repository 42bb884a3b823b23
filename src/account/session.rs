use super::AccountService;
use crate::error::{Result, ShadowError, ValidationError};
use crate::services::AuthUser;
use log::info;

impl AccountService {
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        let user = self.identity.sign_in(email, password).await?;
        info!("[Account] Signed in {}", user.uid);
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.identity.sign_out().await?;
        info!("[Account] Signed out");
        Ok(())
    }

    /// The signed-in user, or [`ShadowError::NotSignedIn`].
    pub fn current_user(&self) -> Result<AuthUser> {
        self.identity.current_user().ok_or(ShadowError::NotSignedIn)
    }
}
