use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::contract::model::{
    AuthUser, Credentials, FederatedProvider, ImageChoice, ItemDraft, ItemForm, ItemId,
    LibraryItem, LibraryState, LocalImage, SignUpForm,
};
use crate::domain::error::DomainError;
use crate::domain::image::ImagePipeline;
use crate::domain::ports::AuthPort;
use crate::domain::store::LibraryStore;

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub min_password_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            min_password_length: 6,
        }
    }
}

/// Use cases behind the library screens: sign-in flows, the save form and
/// item actions. Depends only on ports and the two core components.
#[derive(Clone)]
pub struct Service {
    auth: Arc<dyn AuthPort>,
    store: LibraryStore,
    images: ImagePipeline,
    config: ServiceConfig,
}

impl Service {
    pub fn new(
        auth: Arc<dyn AuthPort>,
        store: LibraryStore,
        images: ImagePipeline,
        config: ServiceConfig,
    ) -> Self {
        Self {
            auth,
            store,
            images,
            config,
        }
    }

    pub fn store(&self) -> &LibraryStore {
        &self.store
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.auth.current_user()
    }

    pub fn state(&self) -> LibraryState {
        self.store.state()
    }

    // --- auth flows ---

    #[instrument(name = "library.service.sign_in", skip_all, fields(email = %credentials.email))]
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<AuthUser, DomainError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(DomainError::validation("form", "Please fill in all fields"));
        }
        let user = self
            .auth
            .sign_in(credentials.email.trim(), &credentials.password)
            .await
            .map_err(auth_error("Failed to sign in"))?;
        info!(uid = %user.uid, "signed in");
        Ok(user)
    }

    #[instrument(name = "library.service.sign_up", skip_all, fields(email = %form.email))]
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<AuthUser, DomainError> {
        self.validate_sign_up(form)?;
        let user = self
            .auth
            .sign_up(form.email.trim(), &form.password)
            .await
            .map_err(auth_error("Failed to create account"))?;
        info!(uid = %user.uid, "account created");
        Ok(user)
    }

    #[instrument(name = "library.service.sign_in_federated", skip(self, id_token))]
    pub async fn sign_in_federated(
        &self,
        provider: FederatedProvider,
        id_token: &str,
    ) -> Result<AuthUser, DomainError> {
        if id_token.trim().is_empty() {
            return Err(DomainError::auth("Missing identity token"));
        }
        self.auth
            .sign_in_with_id_token(provider, id_token)
            .await
            .map_err(auth_error("Failed to initiate Google Sign-In"))
    }

    /// Sign out and tear the projection down before returning.
    #[instrument(name = "library.service.sign_out", skip(self))]
    pub async fn sign_out(&self) -> Result<(), DomainError> {
        self.auth
            .sign_out()
            .await
            .map_err(auth_error("Failed to logout"))?;
        self.store.deactivate();
        info!("signed out");
        Ok(())
    }

    // --- items ---

    /// Validate the form, upload a newly chosen image, then add (no `existing`)
    /// or update the item.
    #[instrument(name = "library.service.save_item", skip_all, fields(existing = ?existing))]
    pub async fn save_item(
        &self,
        existing: Option<&ItemId>,
        form: &ItemForm,
    ) -> Result<ItemId, DomainError> {
        let mut draft = normalize_form(form)?;
        let owner = self
            .auth
            .current_user()
            .ok_or(DomainError::NotAuthenticated)?;

        draft.story_image_url = match &form.image {
            Some(ImageChoice::Local(image)) => Some(self.images.upload(&owner.uid, image).await?),
            Some(ImageChoice::Uploaded(url)) => Some(url.clone()),
            None => None,
        };

        match existing {
            Some(id) => {
                self.store.update(id, &draft).await?;
                Ok(id.clone())
            }
            None => self.store.add(&draft).await,
        }
    }

    pub async fn add_item(&self, draft: &ItemDraft) -> Result<ItemId, DomainError> {
        self.store.add(draft).await
    }

    pub async fn update_item(&self, id: &ItemId, draft: &ItemDraft) -> Result<(), DomainError> {
        self.store.update(id, draft).await
    }

    pub async fn delete_item(&self, id: &ItemId) -> Result<(), DomainError> {
        self.store.delete(id).await
    }

    /// Upload a local image for the signed-in user and return its URL.
    pub async fn upload_image(&self, image: &LocalImage) -> Result<String, DomainError> {
        let owner = self
            .auth
            .current_user()
            .ok_or(DomainError::NotAuthenticated)?;
        self.images.upload(&owner.uid, image).await
    }

    // --- validation helpers ---

    fn validate_sign_up(&self, form: &SignUpForm) -> Result<(), DomainError> {
        if form.email.trim().is_empty()
            || form.password.is_empty()
            || form.confirm_password.is_empty()
        {
            return Err(DomainError::validation("form", "Please fill in all fields"));
        }
        if form.password != form.confirm_password {
            return Err(DomainError::validation(
                "confirmPassword",
                "Passwords do not match",
            ));
        }
        if form.password.chars().count() < self.config.min_password_length {
            return Err(DomainError::validation(
                "password",
                format!(
                    "Password must be at least {} characters",
                    self.config.min_password_length
                ),
            ));
        }
        Ok(())
    }
}

fn auth_error(fallback: &'static str) -> impl Fn(anyhow::Error) -> DomainError {
    move |e| {
        warn!("auth request failed: {e:#}");
        let message = e.to_string();
        if message.trim().is_empty() {
            DomainError::auth(fallback)
        } else {
            DomainError::auth(message)
        }
    }
}

/// Trim the form fields; the title is required and an empty link means none.
pub fn normalize_form(form: &ItemForm) -> Result<ItemDraft, DomainError> {
    let title = form.title.trim();
    if title.is_empty() {
        return Err(DomainError::validation("title", "Title is required"));
    }
    let read_link = form.read_link.trim();
    Ok(ItemDraft {
        title: title.to_string(),
        description: form.description.trim().to_string(),
        read_link: (!read_link.is_empty()).then(|| read_link.to_string()),
        story_image_url: None,
    })
}

/// Link to open for an item: the form's link if filled in, else the stored one.
pub fn resolve_read_link(
    form_link: &str,
    item: Option<&LibraryItem>,
) -> Result<String, DomainError> {
    let typed = form_link.trim();
    if !typed.is_empty() {
        return Ok(typed.to_string());
    }
    match item.and_then(LibraryItem::read_link) {
        Some(link) => {
            debug!("using stored read link");
            Ok(link.to_string())
        }
        None => Err(DomainError::validation("readLink", "No read link available")),
    }
}
