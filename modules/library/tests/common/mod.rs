#![allow(dead_code)]

use std::time::Duration;

use library::config::LibraryConfig;
use library::contract::model::{AuthUser, LibraryState, SignUpForm, SyncStatus};
use library::{LibraryContext, MemoryBackends};

pub const WAIT: Duration = Duration::from_secs(5);

pub struct Harness {
    pub fakes: MemoryBackends,
    pub ctx: LibraryContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(LibraryConfig::default())
    }

    pub fn with_config(config: LibraryConfig) -> Self {
        let fakes = MemoryBackends::new();
        let ctx = LibraryContext::new(config, fakes.backends());
        Self { fakes, ctx }
    }

    /// Create an account through the service and wait for the first snapshot.
    pub async fn sign_up(&self, email: &str) -> AuthUser {
        let user = self
            .ctx
            .service()
            .sign_up(&SignUpForm {
                email: email.to_string(),
                password: "secret1".to_string(),
                confirm_password: "secret1".to_string(),
            })
            .await
            .expect("sign up");
        let uid = user.uid.clone();
        self.wait_for(move |s| s.status == SyncStatus::Synced && s.owner.as_ref() == Some(&uid))
            .await;
        user
    }

    pub async fn wait_for<F>(&self, predicate: F) -> LibraryState
    where
        F: FnMut(&LibraryState) -> bool,
    {
        let mut watcher = self.ctx.store().watch();
        tokio::time::timeout(WAIT, watcher.wait_for(predicate))
            .await
            .expect("timed out waiting for library state")
            .expect("store dropped")
    }

    pub async fn wait_for_titles(&self, titles: &[&str]) -> LibraryState {
        let expected: Vec<String> = titles.iter().map(|t| t.to_string()).collect();
        self.wait_for(move |s| {
            s.items.iter().map(|i| i.title.clone()).collect::<Vec<_>>() == expected
        })
        .await
    }
}
