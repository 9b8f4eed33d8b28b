use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User must be logged in")]
    NotAuthenticated,

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{message}")]
    MutationFailed { message: String },

    #[error("Invalid image: the file is empty or could not be read")]
    EmptyPayload,

    #[error("Image file is too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Failed to upload image")]
    ImageUploadFailed,

    #[error("{message}")]
    Auth { message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn mutation_failed(message: impl Into<String>) -> Self {
        Self::MutationFailed {
            message: message.into(),
        }
    }

    pub fn payload_too_large(size: usize, max: usize) -> Self {
        Self::PayloadTooLarge { size, max }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }
}
