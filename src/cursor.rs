//! The observable `since` cursor
//!
//! `None` is the sentinel for "uninitialized or rebuilding". Once a value is
//! published, later publishes never move it backwards; only [`Cursor::reset`]
//! (called at the start of a rebuild) returns it to `None`.

use tokio::sync::watch;

use crate::log::Seq;

#[derive(Debug)]
pub struct Cursor {
    tx: watch::Sender<Option<Seq>>,
}

impl Cursor {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Current value.
    pub fn get(&self) -> Option<Seq> {
        *self.tx.borrow()
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<Option<Seq>> {
        self.tx.subscribe()
    }

    /// Wait until the view has indexed the log up to at least `seq`.
    ///
    /// Resolves immediately when the cursor is already there.
    pub async fn wait_for(&self, seq: Seq) -> Seq {
        let mut rx = self.tx.subscribe();
        let reached = rx
            .wait_for(|since| since.is_some_and(|s| s >= seq))
            .await
            .ok()
            .and_then(|since| *since);
        // The sender lives as long as `self`, so the wait cannot fail.
        reached.unwrap_or(seq)
    }

    /// Publish progress. Values below the current one are ignored.
    pub(crate) fn publish(&self, seq: Seq) {
        self.tx.send_if_modified(|since| match *since {
            Some(current) if current >= seq => false,
            _ => {
                *since = Some(seq);
                true
            }
        });
    }

    /// Return to the sentinel.
    pub(crate) fn reset(&self) {
        self.tx.send_if_modified(|since| since.take().is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_publish_is_monotonic() {
        let cursor = Cursor::new();
        assert_eq!(cursor.get(), None);

        cursor.publish(5);
        cursor.publish(3);
        assert_eq!(cursor.get(), Some(5));

        cursor.publish(9);
        assert_eq!(cursor.get(), Some(9));
    }

    #[test]
    fn test_reset_returns_to_sentinel() {
        let cursor = Cursor::new();
        cursor.publish(4);
        cursor.reset();
        assert_eq!(cursor.get(), None);

        // After a reset lower values are accepted again
        cursor.publish(0);
        assert_eq!(cursor.get(), Some(0));
    }

    #[tokio::test]
    async fn test_wait_for_resolves_on_publish() {
        let cursor = Arc::new(Cursor::new());
        let waiter = {
            let cursor = Arc::clone(&cursor);
            tokio::spawn(async move { cursor.wait_for(10).await })
        };

        cursor.publish(4);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        cursor.publish(12);
        assert_eq!(waiter.await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_wait_for_already_reached() {
        let cursor = Cursor::new();
        cursor.publish(3);
        assert_eq!(cursor.wait_for(2).await, 3);
    }

    #[test]
    fn test_subscribers_observe_changes() {
        let cursor = Cursor::new();
        let mut rx = cursor.subscribe();
        cursor.publish(1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(1));

        cursor.publish(1);
        assert!(!rx.has_changed().unwrap());
    }
}
