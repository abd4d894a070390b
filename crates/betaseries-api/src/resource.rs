// API routing vocabulary
//
// Resource types, verbs, and request descriptors. A resource type is both
// the first URL segment (`<base>/<resource>/<method>`) and a cache
// partition name.

use std::fmt;

use indexmap::IndexMap;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// The closed set of resources exposed by the API.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceType {
    Badges,
    Comments,
    Episodes,
    Friends,
    Members,
    Messages,
    Movies,
    News,
    Oauth,
    Pictures,
    Planning,
    Platforms,
    Polls,
    Reports,
    Search,
    Seasons,
    Shows,
    Subtitles,
    Timeline,
}

impl ResourceType {
    /// Resource types that own a cache partition.
    pub const CACHED: [Self; 4] = [Self::Shows, Self::Episodes, Self::Movies, Self::Members];

    /// Whether this resource type owns a cache partition.
    pub fn is_cached(self) -> bool {
        Self::CACHED.contains(&self)
    }

    /// Methods of this resource that must be preceded by a session
    /// freshness check when the caller is an identified user.
    pub fn freshness_checked_methods(self) -> &'static [&'static str] {
        match self {
            Self::Episodes => &["display", "list", "search"],
            Self::Movies => &["list", "movie", "search", "similars"],
            Self::Search => &["all", "movies", "shows"],
            Self::Shows => &["display", "episodes", "list", "search", "similars"],
            _ => &[],
        }
    }

    /// Whether `(self, method)` is in the freshness-check table.
    pub fn requires_freshness_check(self, method: &str) -> bool {
        self.freshness_checked_methods().contains(&method)
    }
}

impl From<ResourceType> for String {
    fn from(resource: ResourceType) -> Self {
        resource.as_ref().to_owned()
    }
}

/// Transport verb of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Read,
    Create,
    Update,
    Delete,
}

impl Verb {
    pub fn method(self) -> reqwest::Method {
        match self {
            Self::Read => reqwest::Method::GET,
            Self::Create => reqwest::Method::POST,
            Self::Update => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method().as_str())
    }
}

/// A request for one API operation.
///
/// `resource` is kept as a string so that routing mistakes surface as
/// [`Error::UnknownResource`](crate::Error::UnknownResource) at dispatch
/// time rather than being unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub verb: Verb,
    pub resource: String,
    pub method: String,
    pub params: IndexMap<String, String>,
    pub bypass_cache: bool,
}

impl RequestDescriptor {
    pub fn new(verb: Verb, resource: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            verb,
            resource: resource.into(),
            method: method.into(),
            params: IndexMap::new(),
            bypass_cache: false,
        }
    }

    pub fn read(resource: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(Verb::Read, resource, method)
    }

    pub fn create(resource: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(Verb::Create, resource, method)
    }

    pub fn update(resource: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(Verb::Update, resource, method)
    }

    pub fn delete(resource: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(Verb::Delete, resource, method)
    }

    /// Add a scalar parameter. Later values replace earlier ones.
    pub fn param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Skip the cache short-circuit and always hit the network.
    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    /// The `id` parameter, used as the cache key for reads.
    pub fn id(&self) -> Option<&str> {
        self.params.get("id").map(String::as_str)
    }
}
