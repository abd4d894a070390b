// betaseries-api: Async Rust client for the BetaSeries API
//
// Request layer with a read-through resource cache, freshness pre-checks,
// coalesced credential refresh, and classification of API error envelopes.

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod resource;
pub mod transport;

pub use auth::{
    AuthFailure, AuthMessage, AuthPayload, AuthSurface, Authenticator, MessageFlow, SingleFlight,
};
pub use cache::ResourceCache;
pub use client::{BetaSeriesClient, ClientConfig, Payload, PayloadSource};
pub use error::{ConflictTag, Error};
pub use resource::{RequestDescriptor, ResourceType, Verb};
pub use transport::TransportConfig;
