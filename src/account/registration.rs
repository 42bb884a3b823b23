use super::AccountService;
use super::profile::display_name;
use crate::error::{Result, ValidationError};
use crate::role::Role;
use crate::services::{AuthUser, ProfileUpdate, UserProfile, identity::is_valid_email, timestamped_key};
use chrono::Utc;
use log::{info, warn};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    /// Only checked for parent roles.
    pub family_key: String,
    /// JPEG bytes of the chosen avatar.
    pub avatar: Option<Vec<u8>>,
}

impl RegistrationForm {
    /// Checks run in a fixed order; the first failure is reported.
    pub fn validate(&self, family_key: &str) -> std::result::Result<(), ValidationError> {
        let required = [
            &self.name,
            &self.surname,
            &self.email,
            &self.password,
            &self.confirm_password,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(ValidationError::MissingFields);
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        if !is_valid_email(self.email.trim()) {
            return Err(ValidationError::InvalidEmail);
        }
        if self.role.requires_family_key() && self.family_key.trim() != family_key {
            return Err(ValidationError::InvalidFamilyKey);
        }
        Ok(())
    }
}

impl AccountService {
    /// Create the account, its avatar and its stored profile.
    ///
    /// Steps after account creation are not rolled back: if one fails, the
    /// account exists and the error is returned.
    pub async fn register(&self, form: RegistrationForm) -> Result<AuthUser> {
        form.validate(&self.config.family_key)?;

        let email = form.email.trim();
        let user = self.identity.create_account(email, &form.password).await?;

        let photo_url = match form.avatar {
            Some(bytes) => {
                let key = timestamped_key("avatars", &user.uid);
                self.blobs.upload(&key, bytes).await.inspect_err(|e| {
                    warn!("[Account] Avatar upload failed for {}: {}", user.uid, e)
                })?
            }
            None => self.config.default_avatar_url.clone(),
        };

        let name = form.name.trim().to_string();
        let surname = form.surname.trim().to_string();
        let user = self
            .identity
            .update_profile(ProfileUpdate {
                display_name: Some(display_name(&name, &surname)),
                photo_url: Some(photo_url.clone()),
            })
            .await?;

        let profile = UserProfile {
            name,
            surname,
            email: email.to_string(),
            role: form.role,
            photo_url,
            created_at: Utc::now(),
            bio: String::new(),
        };
        self.documents.put_profile(&user.uid, &profile).await?;

        info!("[Account] Registered {} as {}", user.uid, profile.role);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::testing::backend;
    use crate::error::ShadowError;
    use crate::services::{AuthErrorCode, DocumentStore, IdentityProvider};

    fn form() -> RegistrationForm {
        RegistrationForm {
            name: "Luis".into(),
            surname: "Pérez Gómez".into(),
            email: "luis@casa.com".into(),
            password: "secreto".into(),
            confirm_password: "secreto".into(),
            role: Role::Father,
            family_key: "12345".into(),
            avatar: None,
        }
    }

    #[test]
    fn test_validation_order() {
        let key = "12345";
        assert!(form().validate(key).is_ok());

        let mut f = form();
        f.surname = "  ".into();
        f.password = "x".into();
        assert_eq!(f.validate(key), Err(ValidationError::MissingFields));

        let mut f = form();
        f.confirm_password = "other1".into();
        f.email = "bad".into();
        assert_eq!(f.validate(key), Err(ValidationError::PasswordMismatch));

        let mut f = form();
        f.password = "abc".into();
        f.confirm_password = "abc".into();
        assert_eq!(f.validate(key), Err(ValidationError::PasswordTooShort));

        let mut f = form();
        f.email = "luis@casa".into();
        assert_eq!(f.validate(key), Err(ValidationError::InvalidEmail));

        let mut f = form();
        f.family_key = "99999".into();
        assert_eq!(f.validate(key), Err(ValidationError::InvalidFamilyKey));
    }

    #[test]
    fn test_child_needs_no_family_key() {
        let mut f = form();
        f.role = Role::Child;
        f.family_key.clear();
        assert!(f.validate("12345").is_ok());
    }

    #[tokio::test]
    async fn test_invalid_form_makes_no_provider_calls() {
        let b = backend();
        let mut f = form();
        f.confirm_password = "different".into();

        let err = b.service.register(f).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.dialog().message, "Passwords do not match");
        assert_eq!(b.identity.calls(), 0);
    }

    #[tokio::test]
    async fn test_short_password_makes_no_provider_calls() {
        let b = backend();
        let mut f = form();
        f.password = "abc".into();
        f.confirm_password = "abc".into();

        let err = b.service.register(f).await.unwrap_err();
        assert!(matches!(
            err,
            ShadowError::Validation(ValidationError::PasswordTooShort)
        ));
        assert_eq!(b.identity.calls(), 0);
        assert!(b.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn test_register_stores_profile_and_avatar() {
        let b = backend();
        let mut f = form();
        f.avatar = Some(vec![0xff, 0xd8]);

        let user = b.service.register(f).await.unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Luis Pérez Gómez"));

        let photo = user.photo_url.clone().unwrap();
        assert!(photo.starts_with(&format!("memory://avatars/{}_", user.uid)));
        assert_eq!(b.blobs.keys().len(), 1);

        let profile = b.documents.profile(&user.uid).await.unwrap().unwrap();
        assert_eq!(profile.role, Role::Father);
        assert_eq!(profile.photo_url, photo);
        assert_eq!(profile.email, "luis@casa.com");
    }

    #[tokio::test]
    async fn test_register_without_avatar_uses_default() {
        let b = backend();
        let mut f = form();
        f.role = Role::Child;

        let user = b.service.register(f).await.unwrap();
        assert_eq!(user.photo_url.as_deref(), Some("avatars/unknown.jpg"));
        assert!(b.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_maps_to_message() {
        let b = backend();
        b.identity
            .create_account("luis@casa.com", "secreto")
            .await
            .unwrap();

        let err = b.service.register(form()).await.unwrap_err();
        match &err {
            ShadowError::Auth(e) => assert_eq!(e.code, AuthErrorCode::EmailAlreadyInUse),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.dialog().message, "This email is already in use");
    }
}
