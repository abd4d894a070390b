// ── Resource model ──
//
// Typed views of the API's resource objects. Decoding is tolerant: unknown
// fields are ignored, scalars may arrive as numbers or strings, and only
// `id` is required.

pub mod common;

pub mod episode;
pub mod member;
pub mod movie;
pub mod show;

// ── Re-exports ──────────────────────────────────────────────────────

pub use common::{Notes, Resource};
pub use episode::{Episode, EpisodeShow, EpisodeUser};
pub use member::{Member, MemberStats};
pub use movie::{Movie, MovieState, MovieUser};
pub use show::{NextEpisode, Show, ShowUser};
