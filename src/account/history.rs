use super::AccountService;
use crate::error::{Result, ShadowError, ValidationError};
use crate::services::{EntryRecord, timestamped_key};
use chrono::Utc;
use log::info;

/// An entry added by hand from the history screen.
#[derive(Debug, Clone, Default)]
pub struct ManualEvent {
    pub image: Option<Vec<u8>>,
    pub description: String,
}

impl ManualEvent {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.image.is_none() {
            return Err(ValidationError::MissingImage);
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::MissingDescription);
        }
        Ok(())
    }
}

impl AccountService {
    /// Access attempts and manual events, newest first.
    pub async fn history(&self) -> Result<Vec<EntryRecord>> {
        self.ensure_history_visible().await?;
        self.documents.entries().await
    }

    /// Store a manual event with its photo. Returns the entry id.
    pub async fn add_manual_event(&self, event: ManualEvent) -> Result<String> {
        event.validate()?;
        let user = self.current_user()?;
        self.ensure_history_visible().await?;

        let ManualEvent { image, description } = event;
        let image = image.ok_or(ValidationError::MissingImage)?;
        let key = timestamped_key("manual-events", &user.uid);
        let image_url = self.blobs.upload(&key, image).await?;

        let id = self
            .documents
            .add_entry(EntryRecord {
                id: String::new(),
                image_url,
                description: Some(description.trim().to_string()),
                added_by: self.actor_label().await,
                success: None,
                timestamp: Utc::now(),
            })
            .await?;

        info!("[Account] Manual event {} added by {}", id, user.uid);
        Ok(id)
    }

    async fn ensure_history_visible(&self) -> Result<()> {
        if self.role().await?.can_view_history() {
            Ok(())
        } else {
            Err(ShadowError::HistoryHidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::RegistrationForm;
    use crate::account::testing::backend;
    use crate::role::Role;
    use crate::services::DocumentStore;

    fn registration(role: Role) -> RegistrationForm {
        RegistrationForm {
            name: "Luis".into(),
            surname: "Pérez".into(),
            email: "luis@casa.com".into(),
            password: "secreto".into(),
            confirm_password: "secreto".into(),
            role,
            family_key: "12345".into(),
            avatar: None,
        }
    }

    fn event() -> ManualEvent {
        ManualEvent {
            image: Some(vec![0xff]),
            description: " Package delivered ".into(),
        }
    }

    #[test]
    fn test_manual_event_validation() {
        let mut e = event();
        e.image = None;
        e.description.clear();
        assert_eq!(e.validate(), Err(ValidationError::MissingImage));

        let mut e = event();
        e.description = "   ".into();
        assert_eq!(e.validate(), Err(ValidationError::MissingDescription));
    }

    #[tokio::test]
    async fn test_add_manual_event() {
        let b = backend();
        let user = b.service.register(registration(Role::Father)).await.unwrap();

        let id = b.service.add_manual_event(event()).await.unwrap();
        let entries = b.service.history().await.unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.id, id);
        assert_eq!(entry.success, None);
        assert_eq!(entry.status_text(), "Package delivered");
        assert_eq!(entry.added_by, "Luis Pérez");
        assert!(
            entry
                .image_url
                .starts_with(&format!("memory://manual-events/{}_", user.uid))
        );
    }

    #[tokio::test]
    async fn test_invalid_event_is_not_stored() {
        let b = backend();
        b.service.register(registration(Role::Mother)).await.unwrap();

        let err = b
            .service
            .add_manual_event(ManualEvent {
                image: Some(vec![1]),
                description: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.dialog().message, "Add a description");
        assert_eq!(b.documents.entry_count(), 0);
        assert!(b.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn test_history_hidden_from_children() {
        let b = backend();
        b.service.register(registration(Role::Child)).await.unwrap();

        assert!(matches!(
            b.service.history().await,
            Err(ShadowError::HistoryHidden)
        ));
        assert!(b.service.add_manual_event(event()).await.is_err());
        assert!(b.documents.entries().await.unwrap().is_empty());
    }
}
