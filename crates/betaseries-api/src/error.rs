use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::auth::AuthFailure;

/// Named "already done" outcome of a state-changing call.
///
/// The server reports these as errors, but the action already had the
/// desired effect, so callers usually treat them as a no-op success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConflictTag {
    /// Error code 2005: the state change was already applied.
    AlreadyApplied,
    /// HTTP 400 with code 0: the episode is already marked as watched.
    AlreadyWatched,
}

/// Top-level error type for the `betaseries-api` crate.
///
/// Three outcomes escape the request layer: [`Error::UnknownResource`]
/// (programmer error), [`Error::Conflict`] (recoverable alternate
/// outcome), and every other variant, which is a terminal failure.
#[derive(Debug, Error)]
pub enum Error {
    // ── Caller errors ───────────────────────────────────────────────
    /// The resource segment is not one of the API's resource types.
    #[error("Unknown API resource: {resource}")]
    UnknownResource { resource: String },

    // ── Recoverable ─────────────────────────────────────────────────
    /// The server reports the action as already applied.
    #[error("Action already applied ({tag})")]
    Conflict { tag: ConflictTag },

    // ── Authentication ──────────────────────────────────────────────
    /// The delegated authentication flow failed or was abandoned.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The delegated authentication flow did not answer in time.
    #[error("Authentication timed out after {timeout_secs}s")]
    AuthTimeout { timeout_secs: u64 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-2xx status without a structured error body.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// TLS or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// First entry of a non-empty `errors` list. `detail` is the entry
    /// serialized as JSON.
    #[error("API error {code}: {text}")]
    Api {
        code: i64,
        text: String,
        detail: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl From<AuthFailure> for Error {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::TimedOut(limit) => Self::AuthTimeout {
                timeout_secs: limit.as_secs(),
            },
            other => Self::Authentication {
                message: other.to_string(),
            },
        }
    }
}

impl Error {
    /// Returns `true` for the "already applied" alternate outcome.
    pub fn is_recoverable_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if this is a terminal failure (neither a caller
    /// error nor a recoverable conflict).
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::UnknownResource { .. } | Self::Conflict { .. })
    }

    /// The conflict tag, if this is a recoverable conflict.
    pub fn conflict_tag(&self) -> Option<ConflictTag> {
        match self {
            Self::Conflict { tag } => Some(*tag),
            _ => None,
        }
    }

    /// Extract the API error code, if available.
    pub fn api_error_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// The request layer never retries these itself; callers decide.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
