use async_trait::async_trait;
use tokio::sync::watch;

use crate::contract::model::{AuthUser, FederatedProvider};

/// Identity provider the library core depends on.
///
/// `watch` yields the current identity and every later change; `None` means
/// signed out.
#[async_trait]
pub trait AuthPort: Send + Sync {
    fn current_user(&self) -> Option<AuthUser>;
    fn watch(&self) -> watch::Receiver<Option<AuthUser>>;

    async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<AuthUser>;
    async fn sign_up(&self, email: &str, password: &str) -> anyhow::Result<AuthUser>;
    /// Exchange a federated id token (e.g. from a Google consent flow) for a session.
    async fn sign_in_with_id_token(
        &self,
        provider: FederatedProvider,
        id_token: &str,
    ) -> anyhow::Result<AuthUser>;
    async fn sign_out(&self) -> anyhow::Result<()>;
}
