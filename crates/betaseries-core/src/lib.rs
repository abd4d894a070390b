// betaseries-core: Typed resource model and catalog operations on top of
// the betaseries-api request layer.

pub mod catalog;
pub mod error;
pub mod model;
pub mod notify;

// ── Primary re-exports ──────────────────────────────────────────────
pub use catalog::{Catalog, Change};
pub use error::CoreError;
pub use notify::{Notifier, TracingNotifier};

pub use model::{
    Episode, EpisodeShow, EpisodeUser, Member, MemberStats, Movie, MovieState, MovieUser,
    NextEpisode, Notes, Resource, Show, ShowUser,
};
