use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contract::error::LibraryError;

/// Opaque, stable identity of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend-assigned document id of a library item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity reported by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: UserId,
    pub email: Option<String>,
}

/// One saved entry of a user's library, as seen in the latest snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryItem {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    /// Empty string means "no link".
    pub read_link: String,
    pub story_image_url: Option<String>,
    /// Server-assigned; `None` only while a backend still has the write pending.
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LibraryItem {
    pub fn read_link(&self) -> Option<&str> {
        if self.read_link.is_empty() {
            None
        } else {
            Some(&self.read_link)
        }
    }

    pub fn cover(&self) -> Cover<'_> {
        match self.story_image_url.as_deref() {
            Some(url) if !url.is_empty() => Cover::Remote(url),
            _ => Cover::Placeholder,
        }
    }
}

/// What to render as the item's cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cover<'a> {
    Remote(&'a str),
    Placeholder,
}

/// Field values for an add or update, already normalized by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemDraft {
    pub title: String,
    pub description: String,
    pub read_link: Option<String>,
    pub story_image_url: Option<String>,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_read_link(mut self, link: impl Into<String>) -> Self {
        self.read_link = Some(link.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.story_image_url = Some(url.into());
        self
    }
}

/// Raw input of the add/edit form, before trimming and validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemForm {
    pub title: String,
    pub description: String,
    pub read_link: String,
    pub image: Option<ImageChoice>,
}

/// Cover chosen on the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChoice {
    /// A local file reference that still has to be uploaded.
    Local(LocalImage),
    /// An already uploaded image; written as-is.
    Uploaded(String),
}

/// Reference to an image on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub uri: String,
    /// Object name override; synthesized when absent.
    pub file_name: Option<String>,
}

impl LocalImage {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            file_name: None,
        }
    }

    pub fn named(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Federated identity providers accepted by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FederatedProvider {
    Google,
}

/// Lifecycle of the live projection for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Unauthenticated,
    Subscribing,
    Synced,
    SubscriptionError,
}

/// Consumer view of the synchronized collection.
#[derive(Debug, Clone)]
pub struct LibraryState {
    pub status: SyncStatus,
    pub owner: Option<UserId>,
    /// Ordered by title, as delivered in the latest snapshot.
    pub items: Arc<[LibraryItem]>,
    pub error: Option<String>,
}

impl LibraryState {
    pub fn unauthenticated() -> Self {
        Self {
            status: SyncStatus::Unauthenticated,
            owner: None,
            items: Arc::from(Vec::new()),
            error: None,
        }
    }

    pub fn loading(&self) -> bool {
        self.status == SyncStatus::Subscribing
    }

    pub fn find(&self, id: &ItemId) -> Option<&LibraryItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Delivery failure of the live query, while the last good items stay listed.
    pub fn subscription_error(&self) -> Option<LibraryError> {
        if self.status != SyncStatus::SubscriptionError {
            return None;
        }
        Some(LibraryError::Subscription {
            message: self.error.clone().unwrap_or_default(),
        })
    }
}

impl Default for LibraryState {
    fn default() -> Self {
        Self::unauthenticated()
    }
}
