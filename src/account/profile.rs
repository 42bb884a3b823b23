use super::AccountService;
use crate::error::{Result, ValidationError};
use crate::role::Role;
use crate::services::{AuthUser, ProfilePatch, ProfileUpdate, UserProfile, timestamped_key};
use log::{info, warn};

/// Split a full name at the first whitespace: the first token is the name,
/// the rest the surname.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let trimmed = full_name.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_string(), rest.trim().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

pub(super) fn display_name(name: &str, surname: &str) -> String {
    format!("{name} {surname}").trim().to_string()
}

/// Label identifying a member in the entry history.
pub fn actor_label(profile: Option<&UserProfile>, user: Option<&AuthUser>) -> String {
    if let Some(profile) = profile {
        let full = profile.full_name();
        if !full.is_empty() {
            return full;
        }
    }

    let Some(user) = user else {
        return "Unknown".to_string();
    };
    user.display_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .or((!user.email.is_empty()).then_some(user.email.as_str()))
        .unwrap_or("Unknown")
        .to_string()
}

impl AccountService {
    /// Stored profile of the signed-in user.
    pub async fn load_profile(&self) -> Result<Option<UserProfile>> {
        let user = self.current_user()?;
        self.documents.profile(&user.uid).await
    }

    /// Role of the signed-in user; children when no profile is stored.
    pub async fn role(&self) -> Result<Role> {
        Ok(self.load_profile().await?.map(|p| p.role).unwrap_or_default())
    }

    /// Label for the signed-in user, `"Unknown"` when signed out.
    pub async fn actor_label(&self) -> String {
        let user = self.identity.current_user();
        let profile = match &user {
            Some(user) => self.documents.profile(&user.uid).await.unwrap_or_else(|e| {
                warn!("[Account] Could not load profile of {}: {}", user.uid, e);
                None
            }),
            None => None,
        };
        actor_label(profile.as_ref(), user.as_ref())
    }

    pub async fn save_profile(&self, full_name: &str, bio: &str) -> Result<()> {
        let user = self.current_user()?;
        let (name, surname) = split_full_name(full_name);
        if name.is_empty() {
            return Err(ValidationError::MissingFields.into());
        }

        self.identity
            .update_profile(ProfileUpdate {
                display_name: Some(display_name(&name, &surname)),
                photo_url: None,
            })
            .await?;
        self.documents
            .update_profile(
                &user.uid,
                ProfilePatch {
                    name: Some(name),
                    surname: Some(surname),
                    bio: Some(bio.trim().to_string()),
                    photo_url: None,
                },
            )
            .await?;

        info!("[Account] Saved profile of {}", user.uid);
        Ok(())
    }

    /// Upload a new avatar and point the identity and the profile at it.
    pub async fn change_photo(&self, image: Vec<u8>) -> Result<String> {
        let user = self.current_user()?;
        let key = timestamped_key("avatars", &user.uid);
        let url = self.blobs.upload(&key, image).await?;

        self.identity
            .update_profile(ProfileUpdate {
                display_name: None,
                photo_url: Some(url.clone()),
            })
            .await?;
        self.documents
            .update_profile(
                &user.uid,
                ProfilePatch {
                    photo_url: Some(url.clone()),
                    ..Default::default()
                },
            )
            .await?;

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::RegistrationForm;
    use crate::account::testing::backend;
    use crate::error::ShadowError;
    use crate::services::DocumentStore;
    use chrono::Utc;

    fn registration() -> RegistrationForm {
        RegistrationForm {
            name: "Ana".into(),
            surname: "Pérez".into(),
            email: "ana@casa.com".into(),
            password: "secreto".into(),
            confirm_password: "secreto".into(),
            role: Role::Mother,
            family_key: "12345".into(),
            avatar: None,
        }
    }

    fn user(display_name: Option<&str>, email: &str) -> AuthUser {
        AuthUser {
            uid: "u1".into(),
            email: email.into(),
            display_name: display_name.map(str::to_string),
            photo_url: None,
        }
    }

    #[test]
    fn test_split_full_name() {
        assert_eq!(
            split_full_name("  Ana María  López "),
            ("Ana".to_string(), "María  López".to_string())
        );
        assert_eq!(split_full_name("Ana"), ("Ana".to_string(), String::new()));
        assert_eq!(split_full_name(""), (String::new(), String::new()));
    }

    #[test]
    fn test_actor_label_fallbacks() {
        let profile = UserProfile {
            name: "Ana".into(),
            surname: "Pérez".into(),
            email: "ana@casa.com".into(),
            role: Role::Mother,
            photo_url: String::new(),
            created_at: Utc::now(),
            bio: String::new(),
        };
        assert_eq!(actor_label(Some(&profile), None), "Ana Pérez");

        let anon = user(Some("Anita"), "ana@casa.com");
        assert_eq!(actor_label(None, Some(&anon)), "Anita");

        let anon = user(None, "ana@casa.com");
        assert_eq!(actor_label(None, Some(&anon)), "ana@casa.com");

        let anon = user(Some(" "), "");
        assert_eq!(actor_label(None, Some(&anon)), "Unknown");
        assert_eq!(actor_label(None, None), "Unknown");
    }

    #[tokio::test]
    async fn test_save_profile_updates_both_sides() {
        let b = backend();
        let registered = b.service.register(registration()).await.unwrap();

        b.service
            .save_profile("Ana María López", "Likes plants")
            .await
            .unwrap();

        let profile = b.documents.profile(&registered.uid).await.unwrap().unwrap();
        assert_eq!(profile.name, "Ana");
        assert_eq!(profile.surname, "María López");
        assert_eq!(profile.bio, "Likes plants");
        assert_eq!(
            b.service.current_user().unwrap().display_name.as_deref(),
            Some("Ana María López")
        );
        assert_eq!(b.service.actor_label().await, "Ana María López");
        assert_eq!(b.service.role().await.unwrap(), Role::Mother);
    }

    #[tokio::test]
    async fn test_save_profile_requires_name() {
        let b = backend();
        b.service.register(registration()).await.unwrap();
        let err = b.service.save_profile("   ", "").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_change_photo() {
        let b = backend();
        let registered = b.service.register(registration()).await.unwrap();

        let url = b.service.change_photo(vec![1, 2, 3]).await.unwrap();
        assert!(url.starts_with(&format!("memory://avatars/{}_", registered.uid)));

        let profile = b.documents.profile(&registered.uid).await.unwrap().unwrap();
        assert_eq!(profile.photo_url, url);
        assert_eq!(
            b.service.current_user().unwrap().photo_url.as_deref(),
            Some(url.as_str())
        );
    }

    #[tokio::test]
    async fn test_profile_flows_need_session() {
        let b = backend();
        assert!(matches!(
            b.service.load_profile().await,
            Err(ShadowError::NotSignedIn)
        ));
        assert_eq!(b.service.actor_label().await, "Unknown");
    }
}
