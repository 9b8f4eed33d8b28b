use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::contract::model::UserId;

/// Owned handle of a live listener task.
///
/// Releasing it (explicitly or by drop) cancels the token and aborts the task.
/// Callbacks already past the cancellation point are fenced off by the store's
/// session counter, so nothing lands after release.
pub struct Subscription {
    owner: UserId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(owner: UserId, cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            owner,
            cancel,
            task,
        }
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }

    pub fn unsubscribe(self) {
        debug!(owner = %self.owner, "releasing collection subscription");
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsubscribe_cancels_token_and_task() {
        let cancel = CancellationToken::new();
        let observed = cancel.clone();
        let task = tokio::spawn(async move {
            std::future::pending::<()>().await;
        });
        let sub = Subscription::new(UserId::new("u"), cancel, task);
        assert!(sub.is_active());

        sub.unsubscribe();
        assert!(observed.is_cancelled());
    }
}
