//! Document store: user profiles and the entry history.

use crate::error::{Result, ShadowError};
use crate::role::Role;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Stored profile of a household member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "photoURL", default)]
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub bio: String,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}

/// Partial profile update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfilePatch {
    fn apply(self, profile: &mut UserProfile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(surname) = self.surname {
            profile.surname = surname;
        }
        if let Some(bio) = self.bio {
            profile.bio = bio;
        }
        if let Some(url) = self.photo_url {
            profile.photo_url = url;
        }
    }
}

/// One record of the entry history.
///
/// Access attempts carry `success`; manual events carry a description and
/// leave `success` empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub added_by: String,
    pub success: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

impl EntryRecord {
    /// Text shown next to the entry in the history list.
    pub fn status_text(&self) -> &str {
        match self.success {
            Some(true) => "Correct PIN",
            Some(false) => "Incorrect PIN",
            None => self.description.as_deref().unwrap_or(""),
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put_profile(&self, uid: &str, profile: &UserProfile) -> Result<()>;

    async fn profile(&self, uid: &str) -> Result<Option<UserProfile>>;

    async fn update_profile(&self, uid: &str, patch: ProfilePatch) -> Result<()>;

    /// Append an entry and return its id. Entries are never changed afterwards.
    async fn add_entry(&self, entry: EntryRecord) -> Result<String>;

    /// All entries, newest first.
    async fn entries(&self) -> Result<Vec<EntryRecord>>;
}

fn assign_id(entry: &mut EntryRecord) {
    if entry.id.is_empty() {
        entry.id = uuid::Uuid::new_v4().simple().to_string();
    }
}

/// Newest first; entries with equal timestamps keep reverse insertion order.
fn newest_first(mut entries: Vec<EntryRecord>) -> Vec<EntryRecord> {
    entries.reverse();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

#[derive(Default)]
pub struct MemoryDocuments {
    profiles: Mutex<HashMap<String, UserProfile>>,
    entries: Mutex<Vec<EntryRecord>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn put_profile(&self, uid: &str, profile: &UserProfile) -> Result<()> {
        self.profiles.lock().insert(uid.to_string(), profile.clone());
        Ok(())
    }

    async fn profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.lock().get(uid).cloned())
    }

    async fn update_profile(&self, uid: &str, patch: ProfilePatch) -> Result<()> {
        let mut profiles = self.profiles.lock();
        let profile = profiles
            .get_mut(uid)
            .ok_or_else(|| ShadowError::Documents(format!("no profile for {uid}")))?;
        patch.apply(profile);
        Ok(())
    }

    async fn add_entry(&self, mut entry: EntryRecord) -> Result<String> {
        assign_id(&mut entry);
        let id = entry.id.clone();
        self.entries.lock().push(entry);
        Ok(id)
    }

    async fn entries(&self) -> Result<Vec<EntryRecord>> {
        Ok(newest_first(self.entries.lock().clone()))
    }
}

/// Documents kept as JSON files under a directory.
///
/// Layout: `profiles/{uid}.json` and one JSON line per entry in
/// `entries.jsonl`.
pub struct FileDocuments {
    root: PathBuf,
}

impl FileDocuments {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn profile_path(&self, uid: &str) -> Result<PathBuf> {
        if uid.is_empty() || uid.contains(['/', '\\', '.']) {
            return Err(ShadowError::Documents(format!("invalid uid '{uid}'")));
        }
        Ok(self.root.join("profiles").join(format!("{uid}.json")))
    }

    fn entries_path(&self) -> PathBuf {
        self.root.join("entries.jsonl")
    }
}

#[async_trait]
impl DocumentStore for FileDocuments {
    async fn put_profile(&self, uid: &str, profile: &UserProfile) -> Result<()> {
        let path = self.profile_path(uid)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_vec_pretty(profile)?).await?;
        debug!("Stored profile {}", path.display());
        Ok(())
    }

    async fn profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        let path = self.profile_path(uid)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_profile(&self, uid: &str, patch: ProfilePatch) -> Result<()> {
        let mut profile = self
            .profile(uid)
            .await?
            .ok_or_else(|| ShadowError::Documents(format!("no profile for {uid}")))?;
        patch.apply(&mut profile);
        self.put_profile(uid, &profile).await
    }

    async fn add_entry(&self, mut entry: EntryRecord) -> Result<String> {
        assign_id(&mut entry);
        tokio::fs::create_dir_all(&self.root).await?;

        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.entries_path())
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(entry.id)
    }

    async fn entries(&self) -> Result<Vec<EntryRecord>> {
        let content = match tokio::fs::read_to_string(self.entries_path()).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            entries.push(serde_json::from_str(line)?);
        }
        Ok(newest_first(entries))
    }
}
