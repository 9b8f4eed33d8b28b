use thiserror::Error;

/// Errors that are safe to expose to callers of the library module
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("User must be logged in")]
    NotAuthenticated,

    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("{message}")]
    MutationFailed { message: String },

    #[error("{message}")]
    Subscription { message: String },

    #[error("Invalid image: the file is empty or could not be read")]
    EmptyPayload,

    #[error("Image file is too large. Maximum size is {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Failed to upload image")]
    ImageUploadFailed,

    #[error("{message}")]
    Auth { message: String },
}

impl LibraryError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Message suitable for an alert dialog.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<crate::domain::error::DomainError> for LibraryError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            NotAuthenticated => Self::NotAuthenticated,
            Validation { field, message } => Self::Validation { field, message },
            MutationFailed { message } => Self::MutationFailed { message },
            EmptyPayload => Self::EmptyPayload,
            PayloadTooLarge { size, max } => Self::PayloadTooLarge { size, max },
            ImageUploadFailed => Self::ImageUploadFailed,
            Auth { message } => Self::Auth { message },
        }
    }
}
