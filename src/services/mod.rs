//! Managed backend services the app talks to.
//!
//! Each service is a trait so the shadow and the account flows can run
//! against any backend. In-memory backends serve tests and demos; the
//! file backends keep data in a local directory.

pub mod blobs;
pub mod documents;
pub mod identity;

pub use blobs::{BlobStore, DirBlobStore, MemoryBlobs, timestamped_key};
pub use documents::{DocumentStore, EntryRecord, FileDocuments, MemoryDocuments, ProfilePatch, UserProfile};
pub use identity::{AuthError, AuthErrorCode, AuthOperation, AuthUser, IdentityProvider, MemoryIdentity, ProfileUpdate};
