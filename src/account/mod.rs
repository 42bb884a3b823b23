//! Account flows of a household member.
//!
//! [`AccountService`] runs registration, sessions, profile edits and the
//! entry history against the backend services. Form checks run before any
//! provider call, so a rejected form never reaches the backend.

mod history;
mod profile;
mod registration;
mod session;

pub use history::ManualEvent;
pub use profile::{actor_label, split_full_name};
pub use registration::RegistrationForm;

use crate::config::AccountConfig;
use crate::services::{BlobStore, DocumentStore, IdentityProvider};
use std::sync::Arc;

pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    config: AccountConfig,
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        config: AccountConfig,
    ) -> Self {
        Self {
            identity,
            documents,
            blobs,
            config,
        }
    }

    pub fn documents(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.documents)
    }

    pub fn blobs(&self) -> Arc<dyn BlobStore> {
        Arc::clone(&self.blobs)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::Config;
    use crate::services::{MemoryBlobs, MemoryDocuments, MemoryIdentity};

    pub(crate) struct Backend {
        pub identity: Arc<MemoryIdentity>,
        pub documents: Arc<MemoryDocuments>,
        pub blobs: Arc<MemoryBlobs>,
        pub service: AccountService,
    }

    pub(crate) fn backend() -> Backend {
        let identity = Arc::new(MemoryIdentity::new());
        let documents = Arc::new(MemoryDocuments::new());
        let blobs = Arc::new(MemoryBlobs::new());
        let service = AccountService::new(
            identity.clone(),
            documents.clone(),
            blobs.clone(),
            Config::default().account,
        );
        Backend {
            identity,
            documents,
            blobs,
            service,
        }
    }
}
