// ── Failure notifications ──
//
// Catalog operations report failures to a sink before returning them, so
// an embedding UI can surface them without threading every error back up.

use tracing::error;

use crate::error::CoreError;

/// Fire-and-forget sink for user-visible failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, error: &CoreError);
}

/// Logs notifications as `error` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, title: &str, error: &CoreError) {
        error!(title, %error, "catalog operation failed");
    }
}
