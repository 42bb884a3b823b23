use crate::services::identity::AuthError;
use thiserror::Error as ThisError;

/// Form and input checks that run before any remote call.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,

    #[error("Enter email and password")]
    MissingCredentials,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("The family key is not valid")]
    InvalidFamilyKey,

    #[error("Select an image")]
    MissingImage,

    #[error("Add a description")]
    MissingDescription,

    #[error("Light index {0} does not exist")]
    UnknownLight(usize),
}

#[derive(ThisError, Debug)]
pub enum ShadowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Only the father can control the alarm")]
    AccessDenied,

    #[error("The entry history is not available for this account")]
    HistoryHidden,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Realtime tree error: {0}")]
    Tree(String),

    #[error("Document store error: {0}")]
    Documents(String),

    #[error("Blob storage error: {0}")]
    Blobs(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("MQTT connection failed: {0}")]
    MqttConnectionFailed(String),

    #[error(transparent)]
    MqttClient(#[from] rumqttc::ClientError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

impl ShadowError {
    /// The dismissible message shown for this failure.
    pub fn dialog(&self) -> Dialog {
        match self {
            ShadowError::Validation(e) => Dialog::new("Error", e.to_string()),
            ShadowError::AccessDenied | ShadowError::HistoryHidden => {
                Dialog::new("Access denied", self.to_string())
            }
            ShadowError::Auth(e) => Dialog::new("Error", e.user_message()),
            ShadowError::NotSignedIn => Dialog::new("Error", self.to_string()),
            _ => Dialog::new("Error", "Something went wrong, please try again"),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ShadowError::Validation(_))
    }
}

/// A blocking, dismissible user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub title: String,
    pub message: String,
}

impl Dialog {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShadowError>;
