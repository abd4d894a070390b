// ── Catalog ──
//
// Typed operations on shows, movies, episodes and members. The request
// layer only reads from the cache; the catalog is what writes fresh
// resources into it, keyed by resource id.

use std::sync::Arc;

use betaseries_api::{
    BetaSeriesClient, ConflictTag, Payload, RequestDescriptor, ResourceCache, ResourceType,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::{Episode, Member, Movie, MovieState, Resource, Show};
use crate::notify::{Notifier, TracingNotifier};

/// Outcome of a state-changing call.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    /// The change was made; carries the updated resource.
    Applied(T),
    /// The server says the change had already been made.
    AlreadyApplied(ConflictTag),
}

impl<T> Change<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::AlreadyApplied(_) => None,
        }
    }
}

/// Entry point for catalog operations.
///
/// Cheaply cloneable; clones share the client, and through it the cache
/// and credential.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    client: Arc<BetaSeriesClient>,
    notifier: Arc<dyn Notifier>,
}

impl Catalog {
    pub fn new(client: Arc<BetaSeriesClient>) -> Self {
        Self::with_notifier(client, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(client: Arc<BetaSeriesClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(CatalogInner { client, notifier }),
        }
    }

    pub fn client(&self) -> &Arc<BetaSeriesClient> {
        &self.inner.client
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        self.inner.client.cache()
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// `shows/display`; `force` skips the cache.
    pub async fn show(&self, id: u64, force: bool) -> Result<Show, CoreError> {
        let request = RequestDescriptor::read(ResourceType::Shows, "display")
            .param("id", id)
            .bypass_cache(force);
        self.fetch(&request, "Show lookup").await
    }

    /// `movies/movie`; `force` skips the cache.
    pub async fn movie(&self, id: u64, force: bool) -> Result<Movie, CoreError> {
        let request = RequestDescriptor::read(ResourceType::Movies, "movie")
            .param("id", id)
            .bypass_cache(force);
        self.fetch(&request, "Movie lookup").await
    }

    /// `episodes/display`; `force` skips the cache.
    pub async fn episode(&self, id: u64, force: bool) -> Result<Episode, CoreError> {
        let request = RequestDescriptor::read(ResourceType::Episodes, "display")
            .param("id", id)
            .bypass_cache(force);
        self.fetch(&request, "Episode lookup").await
    }

    /// `members/infos`, always from the network.
    pub async fn member(&self, id: u64) -> Result<Member, CoreError> {
        let request = RequestDescriptor::read(ResourceType::Members, "infos")
            .param("id", id)
            .bypass_cache(true);
        self.fetch(&request, "Member lookup").await
    }

    /// Episodes of one season. Always from the network; each episode is
    /// cached under its own id.
    pub async fn show_episodes(
        &self,
        show_id: u64,
        season: u32,
    ) -> Result<Vec<Episode>, CoreError> {
        const TITLE: &str = "Season episodes";
        let request = RequestDescriptor::read(ResourceType::Shows, "episodes")
            .param("id", show_id)
            .param("season", season)
            .bypass_cache(true);

        let payload = self.send(&request, TITLE).await?;
        let items = list(payload, "episodes").map_err(|e| self.report(TITLE, e))?;

        let mut episodes = Vec::with_capacity(items.len());
        for item in items {
            let episode: Episode = decode(&item).map_err(|e| self.report(TITLE, e))?;
            self.cache()
                .set(ResourceType::Episodes, episode.id.to_string(), item);
            episodes.push(episode);
        }
        debug!(show_id, season, count = episodes.len(), "season episodes cached");
        Ok(episodes)
    }

    /// Shows similar to `show_id`. Not cached.
    pub async fn show_similars(&self, show_id: u64) -> Result<Vec<Show>, CoreError> {
        self.similars(ResourceType::Shows, show_id).await
    }

    /// Movies similar to `movie_id`. Not cached.
    pub async fn movie_similars(&self, movie_id: u64) -> Result<Vec<Movie>, CoreError> {
        self.similars(ResourceType::Movies, movie_id).await
    }

    // ── Show mutations ───────────────────────────────────────────────

    pub async fn add_show(&self, id: u64) -> Result<Change<Show>, CoreError> {
        self.change(
            RequestDescriptor::create(ResourceType::Shows, "show").param("id", id),
            "Add show",
        )
        .await
    }

    pub async fn remove_show(&self, id: u64) -> Result<Change<Show>, CoreError> {
        self.change(
            RequestDescriptor::delete(ResourceType::Shows, "show").param("id", id),
            "Remove show",
        )
        .await
    }

    pub async fn archive_show(&self, id: u64) -> Result<Change<Show>, CoreError> {
        self.change(
            RequestDescriptor::create(ResourceType::Shows, "archive").param("id", id),
            "Archive show",
        )
        .await
    }

    pub async fn unarchive_show(&self, id: u64) -> Result<Change<Show>, CoreError> {
        self.change(
            RequestDescriptor::delete(ResourceType::Shows, "archive").param("id", id),
            "Unarchive show",
        )
        .await
    }

    pub async fn favorite_show(&self, id: u64) -> Result<Change<Show>, CoreError> {
        self.change(
            RequestDescriptor::create(ResourceType::Shows, "favorite").param("id", id),
            "Favorite show",
        )
        .await
    }

    pub async fn unfavorite_show(&self, id: u64) -> Result<Change<Show>, CoreError> {
        self.change(
            RequestDescriptor::delete(ResourceType::Shows, "favorite").param("id", id),
            "Unfavorite show",
        )
        .await
    }

    // ── Movie mutations ──────────────────────────────────────────────

    pub async fn add_movie(&self, id: u64, state: MovieState) -> Result<Change<Movie>, CoreError> {
        self.change(
            RequestDescriptor::create(ResourceType::Movies, "movie")
                .param("id", id)
                .param("state", state.code()),
            "Add movie",
        )
        .await
    }

    pub async fn remove_movie(&self, id: u64) -> Result<Change<Movie>, CoreError> {
        self.change(
            RequestDescriptor::delete(ResourceType::Movies, "movie").param("id", id),
            "Remove movie",
        )
        .await
    }

    // ── Episode mutations ────────────────────────────────────────────

    /// Mark an episode as watched. With `bulk` the server also marks the
    /// earlier episodes of the show.
    pub async fn mark_watched(&self, id: u64, bulk: bool) -> Result<Change<Episode>, CoreError> {
        let mut request =
            RequestDescriptor::create(ResourceType::Episodes, "watched").param("id", id);
        if !bulk {
            request = request.param("bulk", false);
        }
        let change = self.change(request, "Mark episode watched").await?;
        if let Change::Applied(ref episode) = change {
            self.sync_parent_show(episode);
        }
        Ok(change)
    }

    pub async fn unmark_watched(&self, id: u64) -> Result<Change<Episode>, CoreError> {
        self.change(
            RequestDescriptor::delete(ResourceType::Episodes, "watched").param("id", id),
            "Unmark episode watched",
        )
        .await
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn send(&self, request: &RequestDescriptor, title: &str) -> Result<Payload, CoreError> {
        self.inner
            .client
            .dispatch(request)
            .await
            .map_err(|e| self.report(title, e.into()))
    }

    async fn fetch<R: Resource>(
        &self,
        request: &RequestDescriptor,
        title: &str,
    ) -> Result<R, CoreError> {
        let payload = self.send(request, title).await?;
        self.store(payload).map_err(|e| self.report(title, e))
    }

    async fn change<R: Resource>(
        &self,
        request: RequestDescriptor,
        title: &str,
    ) -> Result<Change<R>, CoreError> {
        match self.inner.client.dispatch(&request).await {
            Ok(payload) => self
                .store(payload)
                .map(Change::Applied)
                .map_err(|e| self.report(title, e)),
            Err(err) => match err.conflict_tag() {
                Some(tag) => {
                    info!(title, %tag, "change already applied");
                    Ok(Change::AlreadyApplied(tag))
                }
                None => Err(self.report(title, err.into())),
            },
        }
    }

    async fn similars<R: Resource>(
        &self,
        resource: ResourceType,
        id: u64,
    ) -> Result<Vec<R>, CoreError> {
        const TITLE: &str = "Similar titles";
        let request = RequestDescriptor::read(resource, "similars")
            .param("id", id)
            .param("details", true)
            .bypass_cache(true);

        let payload = self.send(&request, TITLE).await?;
        list(payload, "similars")
            .and_then(|items| {
                items
                    .iter()
                    .map(|item| decode::<R>(item.get(R::KEY).unwrap_or(item)))
                    .collect()
            })
            .map_err(|e| self.report(TITLE, e))
    }

    /// Decode the resource out of a payload, caching it when it came
    /// from the network.
    fn store<R: Resource>(&self, payload: Payload) -> Result<R, CoreError> {
        let from_network = !payload.is_cached();
        let value = payload
            .into_resource(R::KEY)
            .ok_or_else(|| CoreError::MissingPayload { key: R::KEY.into() })?;
        let resource: R = decode(&value)?;
        if from_network {
            self.cache().set(R::TYPE, resource.id().to_string(), value);
        }
        Ok(resource)
    }

    /// Watching an episode of a show outside the account adds the show;
    /// reflect that in the cached show.
    fn sync_parent_show(&self, episode: &Episode) {
        let Some(parent) = episode.show.as_ref().filter(|show| show.in_account) else {
            return;
        };
        let key = parent.id.to_string();
        let Some(mut cached) = self.cache().get(ResourceType::Shows, &key) else {
            return;
        };
        if cached.get("in_account").and_then(Value::as_bool) == Some(true) {
            return;
        }
        if let Some(object) = cached.as_object_mut() {
            object.insert("in_account".into(), Value::Bool(true));
            self.cache().set(ResourceType::Shows, key, cached);
            debug!(show_id = parent.id, "cached show now in account");
        }
    }

    fn report(&self, title: &str, error: CoreError) -> CoreError {
        self.inner.notifier.notify(title, &error);
        error
    }
}

fn decode<R: Resource>(value: &Value) -> Result<R, CoreError> {
    R::deserialize(value).map_err(|e| CoreError::Decode {
        resource: R::KEY.into(),
        message: e.to_string(),
    })
}

fn list(payload: Payload, key: &str) -> Result<Vec<Value>, CoreError> {
    match payload.into_resource(key) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(CoreError::MissingPayload { key: key.into() }),
    }
}
