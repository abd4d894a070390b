// Delegated authentication
//
// The request layer never logs in by itself: when the server rejects the
// credential it asks an `Authenticator` for a fresh token. `MessageFlow` is
// the stock implementation of the out-of-process flow (open an entry point,
// wait for one answer from the trusted origin). `SingleFlight` makes sure
// concurrent callers share one flow instead of each starting their own.

use std::sync::Mutex;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::{Origin, Url};

/// Why a delegated authentication flow did not yield a credential.
///
/// `Clone` so a single outcome can be handed to every coalesced waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthFailure {
    /// The flow answered with a failure payload.
    #[error("authentication rejected: {0}")]
    Rejected(String),

    /// The flow went away without answering.
    #[error("authentication flow closed without an answer")]
    Abandoned,

    /// The flow did not answer within the configured timeout.
    #[error("authentication flow timed out after {0:?}")]
    TimedOut(Duration),

    /// The entry point could not be opened.
    #[error("could not open authentication entry point: {0}")]
    Surface(String),
}

/// The single async capability the request layer needs: produce a fresh
/// bearer token.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self) -> BoxFuture<'_, Result<SecretString, AuthFailure>>;
}

// ── Single-flight coalescing ────────────────────────────────────────

/// Runs at most one operation at a time; callers arriving while it is in
/// flight await the same shared future and receive a clone of its output.
pub struct SingleFlight<T: Clone> {
    slot: Mutex<Option<Shared<BoxFuture<'static, T>>>>,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight operation, or start one with `start`.
    pub async fn run<F>(&self, start: F) -> T
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let flight = {
            let mut slot = self.slot.lock().expect("single-flight lock poisoned");
            if let Some(existing) = slot.as_ref() {
                debug!("joining in-flight operation");
                existing.clone()
            } else {
                let fresh = start().shared();
                *slot = Some(fresh.clone());
                fresh
            }
        };

        let output = flight.clone().await;

        let mut slot = self.slot.lock().expect("single-flight lock poisoned");
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&flight)) {
            *slot = None;
        }
        output
    }

    /// Whether an operation is currently in flight.
    pub fn in_flight(&self) -> bool {
        self.slot
            .lock()
            .expect("single-flight lock poisoned")
            .is_some()
    }
}

// ── Message-based delegated flow ────────────────────────────────────

/// What the trusted origin answers with.
#[derive(Debug, Clone)]
pub enum AuthPayload {
    AccessToken(SecretString),
    Failure(String),
}

/// A message posted back by the authentication surface.
#[derive(Debug, Clone)]
pub struct AuthMessage {
    /// Origin of the sender (scheme, host and port), e.g. `https://auth.example.com`.
    pub origin: String,
    pub payload: AuthPayload,
}

/// The embedding that shows the entry point to the user (browser tab,
/// webview, terminal prompt, ...).
pub trait AuthSurface: Send + Sync {
    fn open(&self, entry_point: &Url) -> Result<(), AuthFailure>;

    fn close(&self) {}
}

/// Delegated authentication over a message channel.
///
/// Opens the surface at `entry_point`, then waits for exactly one message
/// from the entry point's origin. Messages from any other origin are
/// logged and ignored. With no timeout the wait is unbounded.
pub struct MessageFlow<S> {
    entry_point: Url,
    origin: Origin,
    surface: S,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<AuthMessage>>,
    timeout: Option<Duration>,
}

impl<S: AuthSurface> MessageFlow<S> {
    /// Create the flow and the sender the surface posts its answer to.
    pub fn new(entry_point: Url, surface: S) -> (Self, mpsc::UnboundedSender<AuthMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let origin = entry_point.origin();
        let flow = Self {
            entry_point,
            origin,
            surface,
            inbox: tokio::sync::Mutex::new(rx),
            timeout: None,
        };
        (flow, tx)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn entry_point(&self) -> &Url {
        &self.entry_point
    }

    fn is_trusted(&self, origin: &str) -> bool {
        Url::parse(origin).is_ok_and(|url| url.origin() == self.origin)
    }

    async fn wait_for_answer(&self) -> Result<SecretString, AuthFailure> {
        let mut inbox = self.inbox.lock().await;
        loop {
            let Some(message) = inbox.recv().await else {
                return Err(AuthFailure::Abandoned);
            };
            if !self.is_trusted(&message.origin) {
                warn!(
                    origin = %message.origin,
                    expected = %self.origin.ascii_serialization(),
                    "ignoring authentication message from untrusted origin"
                );
                continue;
            }
            return match message.payload {
                AuthPayload::AccessToken(token) => Ok(token),
                AuthPayload::Failure(detail) => {
                    warn!(%detail, "authentication flow reported a failure");
                    Err(AuthFailure::Rejected(detail))
                }
            };
        }
    }
}

impl<S: AuthSurface> Authenticator for MessageFlow<S> {
    fn authenticate(&self) -> BoxFuture<'_, Result<SecretString, AuthFailure>> {
        async move {
            debug!(entry_point = %self.entry_point, "starting delegated authentication");
            self.surface.open(&self.entry_point)?;

            let result = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, self.wait_for_answer())
                    .await
                    .unwrap_or(Err(AuthFailure::TimedOut(limit))),
                None => self.wait_for_answer().await,
            };

            self.surface.close();
            result
        }
        .boxed()
    }
}
