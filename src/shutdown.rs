use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Ctrl-C flag shared between `main` and long-running walks. The walker polls it
/// between profiles so that whatever was already collected still gets written.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn request(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            tracing::info!("Shutdown requested, finishing the current profile");
        }
    }

    /// Resolves once a shutdown was requested a second time, i.e. the user
    /// insists on aborting instead of waiting for a clean stop.
    pub async fn forced(&self) {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("Unable to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            if self.is_requested() {
                tracing::warn!("Second Ctrl-C received, aborting");
                return;
            }
            self.request();
        }
    }
}
