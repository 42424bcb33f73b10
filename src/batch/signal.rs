use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative stop request shared between the host and a running batch.
///
/// Raising it prevents further dispatches; the request already in flight is
/// left to finish.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn raise(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_raised(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal is raised.
    pub async fn raised(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot error.
        let _ = rx.wait_for(|raised| *raised).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
