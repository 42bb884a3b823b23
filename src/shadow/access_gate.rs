//! PIN-based door access.
//!
//! Each submission picks a photo from the success or failure bucket,
//! records one [`AccessAttempt`] in the entry history and appends one event
//! log line. A correct PIN also sets the access flag in the tree.

use super::event_log::EventLog;
use crate::config::AccessConfig;
use crate::error::{Dialog, Result};
use crate::services::{BlobStore, DocumentStore, EntryRecord};
use crate::tree::{RealtimeTree, TreeLayout};
use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::seq::SliceRandom;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct AccessAttempt {
    /// Download URL of the chosen photo, empty when none was available.
    pub photo: String,
    pub was_successful: bool,
    pub actor_label: String,
    pub created_at: DateTime<Utc>,
}

impl From<AccessAttempt> for EntryRecord {
    fn from(attempt: AccessAttempt) -> Self {
        EntryRecord {
            id: String::new(),
            image_url: attempt.photo,
            description: None,
            added_by: attempt.actor_label,
            success: Some(attempt.was_successful),
            timestamp: attempt.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessOutcome {
    pub granted: bool,
    pub attempt: AccessAttempt,
    /// Id of the stored history entry.
    pub entry_id: String,
}

impl AccessOutcome {
    pub fn dialog(&self) -> Dialog {
        if self.granted {
            Dialog::new("Access granted", "Welcome home")
        } else {
            Dialog::new("Access denied", "Incorrect PIN")
        }
    }
}

pub struct AccessGate {
    tree: Arc<dyn RealtimeTree>,
    log: EventLog,
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    access_path: String,
    config: AccessConfig,
    actor_label: String,
}

impl AccessGate {
    pub fn new(
        tree: Arc<dyn RealtimeTree>,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        layout: &TreeLayout,
        config: AccessConfig,
        actor_label: impl Into<String>,
    ) -> Self {
        Self {
            log: EventLog::new(Arc::clone(&tree), layout.events.clone()),
            tree,
            documents,
            blobs,
            access_path: layout.access.clone(),
            config,
            actor_label: actor_label.into(),
        }
    }

    /// Check `candidate` against the household PIN and record the attempt.
    ///
    /// Fails only when the history entry cannot be stored. Photo lookup,
    /// flag and log failures are logged and do not change the outcome.
    pub async fn submit_pin(&self, candidate: &str) -> Result<AccessOutcome> {
        let granted = candidate == self.config.pin;
        let bucket = if granted {
            &self.config.success_bucket
        } else {
            &self.config.failure_bucket
        };

        let attempt = AccessAttempt {
            photo: self.pick_photo(bucket).await,
            was_successful: granted,
            actor_label: self.actor_label.clone(),
            created_at: Utc::now(),
        };
        let entry_id = self.documents.add_entry(attempt.clone().into()).await?;

        if granted
            && let Err(e) = self.tree.set(&self.access_path, Value::Bool(true)).await
        {
            warn!("[Access] Could not set access flag: {}", e);
        }

        let text = if granted {
            "Access granted"
        } else {
            "Failed access attempt"
        };
        if let Err(e) = self.log.append(text).await {
            warn!("[Access] Could not log attempt: {}", e);
        }

        info!("[Access] {} by {}", text, self.actor_label);
        Ok(AccessOutcome {
            granted,
            attempt,
            entry_id,
        })
    }

    /// URL of a random object in `bucket`, or an empty string.
    async fn pick_photo(&self, bucket: &str) -> String {
        let keys = match self.blobs.list(bucket).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("[Access] Could not list {}: {}", bucket, e);
                return String::new();
            }
        };

        let chosen = {
            let mut rng = rand::thread_rng();
            keys.choose(&mut rng).cloned()
        };
        let Some(key) = chosen else {
            return String::new();
        };

        match self.blobs.download_url(&key).await {
            Ok(url) => url,
            Err(e) => {
                warn!("[Access] Could not resolve {}: {}", key, e);
                String::new()
            }
        }
    }
}
