use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::contract::model::{AuthUser, FederatedProvider, UserId};
use crate::domain::ports::AuthPort;

struct Account {
    uid: UserId,
    /// hex(sha256(uid ":" password)); `None` for federated-only accounts.
    password_digest: Option<String>,
}

#[derive(Default)]
struct Directory {
    by_email: HashMap<String, Account>,
    id_tokens: HashMap<(FederatedProvider, String), String>,
}

/// In-process identity provider with email/password accounts and
/// pre-registered federated tokens.
#[derive(Clone)]
pub struct MemoryAuth {
    directory: Arc<Mutex<Directory>>,
    current: Arc<watch::Sender<Option<AuthUser>>>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

fn digest(uid: &UserId, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uid.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(Mutex::new(Directory::default())),
            current: Arc::new(watch::Sender::new(None)),
        }
    }

    /// Accept `id_token` from `provider` as proof of `email`.
    pub fn register_id_token(
        &self,
        provider: FederatedProvider,
        id_token: impl Into<String>,
        email: impl Into<String>,
    ) {
        self.directory
            .lock()
            .id_tokens
            .insert((provider, id_token.into()), normalize_email(&email.into()));
    }

    fn publish(&self, user: Option<AuthUser>) {
        self.current.send_replace(user);
    }
}

#[async_trait]
impl AuthPort for MemoryAuth {
    fn current_user(&self) -> Option<AuthUser> {
        self.current.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<AuthUser> {
        let email = normalize_email(email);
        let user = {
            let directory = self.directory.lock();
            let account = directory
                .by_email
                .get(&email)
                .ok_or_else(|| anyhow!("auth/invalid-credential"))?;
            let expected = account
                .password_digest
                .as_deref()
                .ok_or_else(|| anyhow!("auth/invalid-credential"))?;
            if digest(&account.uid, password) != expected {
                bail!("auth/invalid-credential");
            }
            AuthUser {
                uid: account.uid.clone(),
                email: Some(email),
            }
        };
        debug!(uid = %user.uid, "password sign-in");
        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> anyhow::Result<AuthUser> {
        let email = normalize_email(email);
        if !email.contains('@') {
            bail!("auth/invalid-email");
        }
        let user = {
            let mut directory = self.directory.lock();
            if directory.by_email.contains_key(&email) {
                bail!("auth/email-already-in-use");
            }
            let uid = UserId::new(Uuid::new_v4().simple().to_string());
            directory.by_email.insert(
                email.clone(),
                Account {
                    password_digest: Some(digest(&uid, password)),
                    uid: uid.clone(),
                },
            );
            AuthUser {
                uid,
                email: Some(email),
            }
        };
        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in_with_id_token(
        &self,
        provider: FederatedProvider,
        id_token: &str,
    ) -> anyhow::Result<AuthUser> {
        let user = {
            let mut directory = self.directory.lock();
            let email = directory
                .id_tokens
                .get(&(provider, id_token.to_string()))
                .cloned()
                .ok_or_else(|| anyhow!("auth/invalid-credential"))?;
            let account = directory
                .by_email
                .entry(email.clone())
                .or_insert_with(|| Account {
                    uid: UserId::new(Uuid::new_v4().simple().to_string()),
                    password_digest: None,
                });
            AuthUser {
                uid: account.uid.clone(),
                email: Some(email),
            }
        };
        debug!(uid = %user.uid, ?provider, "federated sign-in");
        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> anyhow::Result<()> {
        self.publish(None);
        Ok(())
    }
}
