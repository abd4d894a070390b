// ── Core error types ──
//
// User-facing errors from betaseries-core. The `From<betaseries_api::Error>`
// impl folds the request layer's taxonomy into catalog-level variants, so
// consumers match on what went wrong rather than on transport details.

use betaseries_api::ConflictTag;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Caller errors ────────────────────────────────────────────────
    #[error("Unknown API resource: {resource}")]
    UnknownResource { resource: String },

    // ── Recoverable ──────────────────────────────────────────────────
    /// Only surfaces from raw dispatches; catalog mutations turn this
    /// into [`Change::AlreadyApplied`](crate::Change::AlreadyApplied).
    #[error("Action already applied ({tag})")]
    AlreadyApplied { tag: ConflictTag },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the API at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Request to {url} timed out")]
    RequestTimeout { url: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// The BetaSeries error code, when the response carried one.
        code: Option<i64>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Response has no `{key}` object")]
    MissingPayload { key: String },

    #[error("Cannot decode {resource}: {message}")]
    Decode { resource: String, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The BetaSeries error code carried by an API failure.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => *code,
            _ => None,
        }
    }
}

// ── Conversion from request-layer errors ─────────────────────────────

impl From<betaseries_api::Error> for CoreError {
    fn from(err: betaseries_api::Error) -> Self {
        use betaseries_api::Error as ApiError;

        match err {
            ApiError::UnknownResource { resource } => CoreError::UnknownResource { resource },
            ApiError::Conflict { tag } => CoreError::AlreadyApplied { tag },
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::AuthTimeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::Transport(ref e) => {
                let url = e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string);
                if e.is_timeout() {
                    CoreError::RequestTimeout { url }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url,
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Http { status, body } => CoreError::Api {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {body}")
                },
                code: None,
                status: Some(status),
            },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Api { code, text, .. } => CoreError::Api {
                message: text,
                code: Some(code),
                status: None,
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
