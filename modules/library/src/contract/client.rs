use std::sync::Arc;

use async_trait::async_trait;

use crate::contract::{
    error::LibraryError,
    model::{
        AuthUser, Credentials, FederatedProvider, ItemDraft, ItemForm, ItemId, LibraryItem,
        LibraryState, LocalImage, SignUpForm,
    },
};

/// Public API of the library module for screens and other modules
#[async_trait]
pub trait LibraryApi: Send + Sync {
    /// Current projection, including sync status and the last error
    fn state(&self) -> LibraryState;

    /// Items of the latest snapshot, ordered by title
    fn items(&self) -> Arc<[LibraryItem]>;

    /// Signed-in user, if any
    fn current_user(&self) -> Option<AuthUser>;

    async fn add(&self, draft: ItemDraft) -> Result<ItemId, LibraryError>;

    async fn update(&self, id: ItemId, draft: ItemDraft) -> Result<(), LibraryError>;

    async fn delete(&self, id: ItemId) -> Result<(), LibraryError>;

    /// Validate the form, upload a newly picked image and add or update the item
    async fn save_item(&self, existing: Option<ItemId>, form: ItemForm)
        -> Result<ItemId, LibraryError>;

    /// Upload a local image and return its retrieval URL
    async fn upload_image(&self, image: LocalImage) -> Result<String, LibraryError>;

    /// Link to open for an item: the typed one, else the stored one
    fn resolve_read_link(&self, typed: &str, id: Option<&ItemId>) -> Result<String, LibraryError>;

    async fn sign_in(&self, credentials: Credentials) -> Result<AuthUser, LibraryError>;

    async fn sign_up(&self, form: SignUpForm) -> Result<AuthUser, LibraryError>;

    async fn sign_in_federated(
        &self,
        provider: FederatedProvider,
        id_token: String,
    ) -> Result<AuthUser, LibraryError>;

    async fn sign_out(&self) -> Result<(), LibraryError>;
}
