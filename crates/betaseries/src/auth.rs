//! Terminal-backed delegated authentication.
//!
//! The "surface" is the user's terminal: opening it prints the login URL,
//! then a background thread reads the token without echo and posts it back
//! as if it came from the login page's origin.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use betaseries_api::{AuthFailure, AuthMessage, AuthPayload, AuthSurface, Authenticator, MessageFlow};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use secrecy::SecretString;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

pub struct TerminalSurface {
    outbox: Arc<OnceLock<UnboundedSender<AuthMessage>>>,
}

impl AuthSurface for TerminalSurface {
    fn open(&self, entry_point: &Url) -> Result<(), AuthFailure> {
        let outbox = self
            .outbox
            .get()
            .cloned()
            .ok_or_else(|| AuthFailure::Surface("terminal prompt is not wired".into()))?;
        let origin = entry_point.origin().ascii_serialization();

        eprintln!("Your BetaSeries session needs to be renewed.");
        eprintln!("Log in at {entry_point} and paste the access token below.");

        std::thread::spawn(move || {
            let payload = match rpassword::prompt_password("Access token: ") {
                Ok(token) if !token.trim().is_empty() => {
                    AuthPayload::AccessToken(SecretString::from(token.trim().to_owned()))
                }
                Ok(_) => AuthPayload::Failure("no token entered".into()),
                Err(e) => AuthPayload::Failure(format!("cannot read token: {e}")),
            };
            let _ = outbox.send(AuthMessage { origin, payload });
        });
        Ok(())
    }
}

/// A delegated flow that prompts on the terminal.
pub fn terminal_flow(entry_point: Url, timeout: Option<Duration>) -> MessageFlow<TerminalSurface> {
    let outbox = Arc::new(OnceLock::new());
    let surface = TerminalSurface {
        outbox: Arc::clone(&outbox),
    };
    let (flow, tx) = MessageFlow::new(entry_point, surface);
    let _ = outbox.set(tx);
    flow.with_timeout(timeout)
}

/// Used when the profile has no `auth_url`: any reauthentication fails.
pub struct Unconfigured;

impl Authenticator for Unconfigured {
    fn authenticate(&self) -> BoxFuture<'_, Result<SecretString, AuthFailure>> {
        async {
            Err(AuthFailure::Rejected(
                "token expired and no auth_url is configured".into(),
            ))
        }
        .boxed()
    }
}
