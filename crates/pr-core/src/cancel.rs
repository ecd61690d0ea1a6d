//! A minimal cooperative cancellation token ("context-like").
//!
//! The workspace doesn't depend on `tokio-util`, so this is the shared
//! primitive every stage deadline, subprocess, and channel send selects
//! against: cloning a [`CancellationToken`] is cheap (it's a thin wrapper
    //! over a `tokio::sync::watch` channel) and every clone observes the same
//! cancellation.

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`CancellationToken::cancel`] has been called on any
    /// clone. Resolves immediately if already cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// A child token derived from this one: cancelling the child does not
    /// propagate to the parent, but cancelling the parent also cancels the
    /// child. Used to scope a stage's own deadline without affecting its
    /// siblings.
    #[must_use]
    pub fn child(&self) -> Self {
        let child = Self::new();
        let parent_rx = self.rx.clone();
        let child_tx = child.tx.clone();
        tokio::spawn(async move {
                let mut parent_rx = parent_rx;
                if parent_rx.wait_for(|c| *c).await.is_ok() {
                    let _ = child_tx.send(true);
                }
            });
        child
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            clone.cancel();
        });
        token.cancelled().await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_if_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(50), token.cancelled())
            .await
            .expect("should resolve immediately");
    }

    #[tokio::test]
    async fn parent_cancellation_propagates_to_child() {
        let parent = CancellationToken::new();
        let child = parent.child();
        parent.cancel();
        tokio::time::timeout(Duration::from_millis(200), child.cancelled())
            .await
            .expect("child should observe parent cancellation");
    }
}
