use async_trait::async_trait;
use std::sync::Arc;

use crate::contract::{
    client::LibraryApi,
    error::LibraryError,
    model::{
        AuthUser, Credentials, FederatedProvider, ItemDraft, ItemForm, ItemId, LibraryItem,
        LibraryState, LocalImage, SignUpForm,
    },
};
use crate::domain::service::{self, Service};

/// Local implementation of the LibraryApi trait that delegates to the domain service
pub struct LibraryLocalClient {
    service: Arc<Service>,
}

impl LibraryLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LibraryApi for LibraryLocalClient {
    fn state(&self) -> LibraryState {
        self.service.state()
    }

    fn items(&self) -> Arc<[LibraryItem]> {
        self.service.store().list()
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.service.current_user()
    }

    async fn add(&self, draft: ItemDraft) -> Result<ItemId, LibraryError> {
        self.service.add_item(&draft).await.map_err(Into::into)
    }

    async fn update(&self, id: ItemId, draft: ItemDraft) -> Result<(), LibraryError> {
        self.service
            .update_item(&id, &draft)
            .await
            .map_err(Into::into)
    }

    async fn delete(&self, id: ItemId) -> Result<(), LibraryError> {
        self.service.delete_item(&id).await.map_err(Into::into)
    }

    async fn save_item(
        &self,
        existing: Option<ItemId>,
        form: ItemForm,
    ) -> Result<ItemId, LibraryError> {
        self.service
            .save_item(existing.as_ref(), &form)
            .await
            .map_err(Into::into)
    }

    async fn upload_image(&self, image: LocalImage) -> Result<String, LibraryError> {
        self.service.upload_image(&image).await.map_err(Into::into)
    }

    fn resolve_read_link(&self, typed: &str, id: Option<&ItemId>) -> Result<String, LibraryError> {
        let state = self.service.state();
        let item = id.and_then(|id| state.find(id));
        service::resolve_read_link(typed, item).map_err(Into::into)
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<AuthUser, LibraryError> {
        self.service.sign_in(&credentials).await.map_err(Into::into)
    }

    async fn sign_up(&self, form: SignUpForm) -> Result<AuthUser, LibraryError> {
        self.service.sign_up(&form).await.map_err(Into::into)
    }

    async fn sign_in_federated(
        &self,
        provider: FederatedProvider,
        id_token: String,
    ) -> Result<AuthUser, LibraryError> {
        self.service
            .sign_in_federated(provider, &id_token)
            .await
            .map_err(Into::into)
    }

    async fn sign_out(&self) -> Result<(), LibraryError> {
        self.service.sign_out().await.map_err(Into::into)
    }
}
