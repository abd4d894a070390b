// BetaSeries API request layer
//
// Resolves a `RequestDescriptor` into a payload: cache short-circuit for
// reads, session freshness pre-check for a fixed set of endpoints, dispatch
// with the current credential, classification of the `errors` envelope,
// and a bounded reauthenticate-and-retry when the credential is rejected.
// Writing results back into the cache is left to the caller, which knows
// the identity a payload should be keyed under.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use futures_util::FutureExt;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{AuthFailure, Authenticator, SingleFlight};
use crate::cache::ResourceCache;
use crate::error::{ConflictTag, Error};
use crate::resource::{RequestDescriptor, ResourceType, Verb};
use crate::transport::TransportConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.betaseries.com";
pub const DEFAULT_API_VERSION: &str = "3.0";

const HEADER_VERSION: &str = "X-BetaSeries-Version";
const HEADER_TOKEN: &str = "X-BetaSeries-Token";
const HEADER_KEY: &str = "X-BetaSeries-Key";

/// Error code for an invalid or expired token.
const CODE_CREDENTIAL_EXPIRED: i64 = 2001;
/// Error code for a state change that was already applied.
const CODE_ALREADY_APPLIED: i64 = 2005;
/// Texts sent with HTTP 400 / code 0 when an episode is already watched.
const ALREADY_WATCHED_TEXTS: [&str; 2] = [
    "L'utilisateur a déjà marqué cet épisode comme vu.",
    "episode already marked as watched",
];

/// Injected configuration for [`BetaSeriesClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.betaseries.com`.
    pub base_url: Url,
    /// Sent as `X-BetaSeries-Version`.
    pub api_version: String,
    /// Client identity, sent as `X-BetaSeries-Key`.
    pub client_key: String,
    /// Bearer token at start; may be empty.
    pub token: SecretString,
    /// Whether the caller is a recognized member. Enables the session
    /// freshness pre-check.
    pub identified_user: bool,
    /// Reauthenticate-and-retry rounds allowed per dispatch.
    pub max_auth_retries: u8,
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn new(base_url: Url, client_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_version: DEFAULT_API_VERSION.into(),
            client_key: client_key.into(),
            token: SecretString::from(String::new()),
            identified_user: false,
            max_auth_retries: 1,
            transport: TransportConfig::default(),
        }
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = token;
        self
    }

    pub fn with_identified_user(mut self, identified: bool) -> Self {
        self.identified_user = identified;
        self
    }
}

/// Where a successful payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// Served from the resource cache; the body is the resource itself.
    Cache,
    /// Returned by the API; the body is the full response envelope.
    Network,
}

/// A successfully resolved request.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub body: Value,
    pub source: PayloadSource,
}

impl Payload {
    pub fn is_cached(&self) -> bool {
        self.source == PayloadSource::Cache
    }

    /// The resource object: `body[key]` for network payloads, the body
    /// itself for cached ones.
    pub fn resource(&self, key: &str) -> Option<&Value> {
        match self.source {
            PayloadSource::Cache => Some(&self.body),
            PayloadSource::Network => self.body.get(key),
        }
    }

    pub fn into_resource(self, key: &str) -> Option<Value> {
        match self.source {
            PayloadSource::Cache => Some(self.body),
            PayloadSource::Network => match self.body {
                Value::Object(mut map) => map.remove(key),
                _ => None,
            },
        }
    }
}

/// The credential in use, tagged with how many times it has been replaced.
struct Session {
    token: SecretString,
    generation: u64,
}

type CredentialListener = Arc<dyn Fn(&SecretString) + Send + Sync>;

/// Stateful dispatcher for the BetaSeries API.
///
/// Owns the current credential, the diagnostic request counter, and a
/// shared handle on the process-wide [`ResourceCache`].
pub struct BetaSeriesClient {
    http: reqwest::Client,
    base_url: Url,
    api_version: String,
    client_key: String,
    identified_user: AtomicBool,
    max_auth_retries: u8,
    session: Arc<ArcSwap<Session>>,
    authenticator: Arc<dyn Authenticator>,
    refresh: SingleFlight<Result<u64, AuthFailure>>,
    on_credential: Option<CredentialListener>,
    cache: Arc<ResourceCache>,
    requests: watch::Sender<u64>,
}

impl BetaSeriesClient {
    /// Create a client, building the HTTP transport from `config`.
    pub fn new(config: ClientConfig, authenticator: Arc<dyn Authenticator>) -> Result<Self, Error> {
        let http = config.transport.build_client()?;
        Ok(Self::with_client(http, config, authenticator))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        config: ClientConfig,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let (requests, _) = watch::channel(0);
        Self {
            http,
            base_url: config.base_url,
            api_version: config.api_version,
            client_key: config.client_key,
            identified_user: AtomicBool::new(config.identified_user),
            max_auth_retries: config.max_auth_retries,
            session: Arc::new(ArcSwap::from_pointee(Session {
                token: config.token,
                generation: 0,
            })),
            authenticator,
            refresh: SingleFlight::new(),
            on_credential: None,
            cache: Arc::new(ResourceCache::new()),
            requests,
        }
    }

    /// Share an existing cache instead of the client's own.
    pub fn with_cache(mut self, cache: Arc<ResourceCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Called with every credential obtained by reauthentication.
    pub fn on_credential_refresh(
        mut self,
        listener: impl Fn(&SecretString) + Send + Sync + 'static,
    ) -> Self {
        self.on_credential = Some(Arc::new(listener));
        self
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Credential ───────────────────────────────────────────────────

    /// Replace the credential in place.
    pub fn set_token(&self, token: SecretString) {
        install(&self.session, &token);
    }

    /// How many times the credential has been replaced.
    pub fn token_generation(&self) -> u64 {
        self.session.load().generation
    }

    pub fn is_identified_user(&self) -> bool {
        self.identified_user.load(Ordering::Relaxed)
    }

    pub fn set_identified_user(&self, identified: bool) {
        self.identified_user.store(identified, Ordering::Relaxed);
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    /// Number of API dispatches so far (pre-flight checks excluded).
    pub fn request_count(&self) -> u64 {
        *self.requests.borrow()
    }

    /// Observe the request counter as it changes.
    pub fn subscribe_request_count(&self) -> watch::Receiver<u64> {
        self.requests.subscribe()
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Resolve a request into a payload.
    ///
    /// Fails with [`Error::UnknownResource`] before any I/O for an
    /// unrecognized resource, with [`Error::Conflict`] for "already applied"
    /// outcomes, and with a failure variant otherwise. A rejected credential
    /// never escapes: it triggers reauthentication and a retry, and only
    /// becomes [`Error::Api`] once the retries are used up.
    pub async fn dispatch(&self, request: &RequestDescriptor) -> Result<Payload, Error> {
        let resource: ResourceType =
            request
                .resource
                .parse()
                .map_err(|_| Error::UnknownResource {
                    resource: request.resource.clone(),
                })?;

        if request.verb == Verb::Read && !request.bypass_cache {
            if let Some(body) = request.id().and_then(|id| self.cache.get(resource, id)) {
                debug!(%resource, method = %request.method, "serving from cache");
                return Ok(Payload {
                    body,
                    source: PayloadSource::Cache,
                });
            }
        }

        if self.is_identified_user() && resource.requires_freshness_check(&request.method) {
            self.ensure_fresh_session().await?;
        }

        let mut refreshes = 0;
        loop {
            let session = self.session.load_full();
            match self.send(resource, request, &session).await? {
                Reply::Body(body) => {
                    return Ok(Payload {
                        body,
                        source: PayloadSource::Network,
                    });
                }
                Reply::CredentialExpired(fault) if refreshes < self.max_auth_retries => {
                    refreshes += 1;
                    info!(
                        %resource,
                        method = %request.method,
                        code = fault.code,
                        "credential rejected, reauthenticating"
                    );
                    self.refresh_credential(session.generation).await?;
                }
                Reply::CredentialExpired(fault) => {
                    warn!(
                        %resource,
                        method = %request.method,
                        "credential rejected again after reauthentication"
                    );
                    return Err(fault.into_error());
                }
            }
        }
    }

    // ── Verb shorthands ──────────────────────────────────────────────

    pub async fn get(
        &self,
        resource: &str,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<Payload, Error> {
        self.dispatch(&describe(Verb::Read, resource, method, params))
            .await
    }

    pub async fn post(
        &self,
        resource: &str,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<Payload, Error> {
        self.dispatch(&describe(Verb::Create, resource, method, params))
            .await
    }

    pub async fn put(
        &self,
        resource: &str,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<Payload, Error> {
        self.dispatch(&describe(Verb::Update, resource, method, params))
            .await
    }

    pub async fn delete(
        &self,
        resource: &str,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<Payload, Error> {
        self.dispatch(&describe(Verb::Delete, resource, method, params))
            .await
    }

    /// Ask the API whether the current session is active.
    pub async fn is_session_active(&self) -> Result<bool, Error> {
        let session = self.session.load_full();
        self.check_session(&session).await
    }

    async fn ensure_fresh_session(&self) -> Result<(), Error> {
        let session = self.session.load_full();
        if self.check_session(&session).await? {
            return Ok(());
        }
        info!("session inactive, reauthenticating before dispatch");
        self.refresh_credential(session.generation).await
    }

    async fn check_session(&self, session: &Session) -> Result<bool, Error> {
        let url = self.endpoint_url(ResourceType::Members, "is_active")?;
        debug!(%url, "checking session freshness");
        let resp = self.authorized(self.http.get(url), session).send().await?;
        Ok(resp.status().is_success())
    }

    /// Obtain and install a fresh credential, unless the one observed at
    /// `observed_generation` has already been replaced. Concurrent callers
    /// share a single delegated flow.
    async fn refresh_credential(&self, observed_generation: u64) -> Result<(), Error> {
        if self.token_generation() != observed_generation {
            debug!("credential already refreshed by a concurrent request");
            return Ok(());
        }

        let session = Arc::clone(&self.session);
        let authenticator = Arc::clone(&self.authenticator);
        let listener = self.on_credential.clone();

        let generation = self
            .refresh
            .run(move || {
                async move {
                    let token = authenticator.authenticate().await?;
                    if let Some(listener) = listener {
                        listener(&token);
                    }
                    Ok(install(&session, &token))
                }
                .boxed()
            })
            .await?;

        debug!(generation, "credential installed");
        Ok(())
    }

    async fn send(
        &self,
        resource: ResourceType,
        request: &RequestDescriptor,
        session: &Session,
    ) -> Result<Reply, Error> {
        let mut url = self.endpoint_url(resource, &request.method)?;

        let builder = if request.verb == Verb::Read {
            if !request.params.is_empty() {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in &request.params {
                    pairs.append_pair(key, value);
                }
            }
            self.http.get(url.clone())
        } else {
            let builder = self.http.request(request.verb.method(), url.clone());
            if request.params.is_empty() {
                builder
            } else {
                builder.form(&request.params)
            }
        };

        let count = self.bump_request_count();
        debug!(verb = %request.verb, %url, request = count, "dispatching");

        let resp = self.authorized(builder, session).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!(status = status.as_u16(), %url, "response received");

        classify(status, &body)
    }

    fn bump_request_count(&self) -> u64 {
        self.requests.send_modify(|count| *count += 1);
        *self.requests.borrow()
    }

    fn authorized(
        &self,
        builder: reqwest::RequestBuilder,
        session: &Session,
    ) -> reqwest::RequestBuilder {
        builder
            .header(ACCEPT, "application/json")
            .header(HEADER_VERSION, self.api_version.as_str())
            .header(HEADER_TOKEN, session.token.expose_secret())
            .header(HEADER_KEY, self.client_key.as_str())
    }

    /// `{base}/{resource}/{method}`
    fn endpoint_url(&self, resource: ResourceType, method: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{resource}/{method}"))?)
    }
}

fn describe(verb: Verb, resource: &str, method: &str, params: &[(&str, &str)]) -> RequestDescriptor {
    params
        .iter()
        .fold(RequestDescriptor::new(verb, resource, method), |req, (k, v)| {
            req.param(*k, v)
        })
}

/// Swap in a new credential and return its generation.
fn install(session: &ArcSwap<Session>, token: &SecretString) -> u64 {
    let previous = session.rcu(|current| Session {
        token: token.clone(),
        generation: current.generation + 1,
    });
    previous.generation + 1
}

// ── Response classification ─────────────────────────────────────────

enum Reply {
    Body(Value),
    CredentialExpired(ApiFault),
}

/// First entry of a response's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ApiFault {
    code: i64,
    text: String,
    detail: String,
}

impl ApiFault {
    fn from_body(body: &Value) -> Option<Self> {
        let first = body.get("errors")?.as_array()?.first()?;
        let code = match first.get("code") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .unwrap_or_default();
        let text = first
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Some(Self {
            code,
            text,
            detail: first.to_string(),
        })
    }

    fn into_error(self) -> Error {
        Error::Api {
            code: self.code,
            text: self.text,
            detail: self.detail,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum FaultKind {
    Conflict(ConflictTag),
    CredentialExpired,
    Other,
}

fn fault_kind(status: StatusCode, fault: &ApiFault) -> FaultKind {
    if fault.code == CODE_ALREADY_APPLIED {
        FaultKind::Conflict(ConflictTag::AlreadyApplied)
    } else if status == StatusCode::BAD_REQUEST
        && fault.code == 0
        && ALREADY_WATCHED_TEXTS.contains(&fault.text.as_str())
    {
        FaultKind::Conflict(ConflictTag::AlreadyWatched)
    } else if fault.code == CODE_CREDENTIAL_EXPIRED {
        FaultKind::CredentialExpired
    } else {
        FaultKind::Other
    }
}

fn classify(status: StatusCode, body: &str) -> Result<Reply, Error> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if let Some(fault) = parsed.as_ref().and_then(ApiFault::from_body) {
        return match fault_kind(status, &fault) {
            FaultKind::Conflict(tag) => {
                debug!(%tag, code = fault.code, "action already applied");
                Err(Error::Conflict { tag })
            }
            FaultKind::CredentialExpired => Ok(Reply::CredentialExpired(fault)),
            FaultKind::Other => {
                warn!(code = fault.code, text = %fault.text, "API reported an error");
                Err(fault.into_error())
            }
        };
    }

    if !status.is_success() {
        warn!(status = status.as_u16(), "request failed");
        return Err(Error::Http {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }

    parsed.map(Reply::Body).ok_or_else(|| Error::Deserialization {
        message: "response body is not JSON".into(),
        body: body.to_owned(),
    })
}
