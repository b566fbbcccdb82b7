use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Shared "is a user signed in" signal.
///
/// Cloning shares the underlying channel. Subscribers see every transition
/// through [`watch::Receiver::changed`].
#[derive(Debug, Clone)]
pub struct AuthSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl AuthSignal {
    pub fn new(authenticated: bool) -> Self {
        let (sender, _) = watch::channel(authenticated);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        *self.sender.borrow()
    }

    /// Returns true if the value actually changed
    pub fn set_authenticated(&self, authenticated: bool) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == authenticated {
                return false;
            }
            *current = authenticated;
            true
        });
        if changed {
            info!(authenticated, "Auth state changed");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_changes_only() {
        let signal = AuthSignal::new(false);
        assert!(!signal.is_authenticated());
        assert!(signal.set_authenticated(true));
        assert!(!signal.set_authenticated(true));
        assert!(signal.is_authenticated());
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let signal = AuthSignal::new(false);
        let mut receiver = signal.subscribe();

        let clone = signal.clone();
        clone.set_authenticated(true);
        receiver.changed().await.unwrap();
        assert!(*receiver.borrow_and_update());
    }
}
