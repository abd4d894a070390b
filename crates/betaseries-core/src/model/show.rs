// ── Show domain types ──

use betaseries_api::ResourceType;
use serde::{Deserialize, Serialize};

use super::common::{Notes, Resource, flag, lenient, lenient_opt, lenient_or_default, text};

/// A TV show as returned by `shows/display`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    #[serde(deserialize_with = "lenient")]
    pub id: u64,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub thetvdb_id: Option<u64>,
    #[serde(default, deserialize_with = "text")]
    pub imdb_id: String,
    #[serde(default, deserialize_with = "text")]
    pub title: String,
    #[serde(default, deserialize_with = "text")]
    pub description: String,
    /// Number of seasons.
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub seasons: u32,
    /// Number of episodes.
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub episodes: u32,
    /// `Continuing` or `Ended`.
    #[serde(default, deserialize_with = "text")]
    pub status: String,
    #[serde(default, deserialize_with = "text")]
    pub network: String,
    /// First air year.
    #[serde(default, deserialize_with = "lenient_opt")]
    pub creation: Option<u32>,
    #[serde(default)]
    pub notes: Notes,
    #[serde(default, deserialize_with = "flag")]
    pub in_account: bool,
    #[serde(default)]
    pub user: ShowUser,
}

impl Show {
    pub fn is_ended(&self) -> bool {
        self.status.eq_ignore_ascii_case("ended")
    }

    pub fn is_archived(&self) -> bool {
        self.user.archived
    }

    pub fn is_favorited(&self) -> bool {
        self.user.favorited
    }

    /// Everything aired has been watched and the show will not continue.
    pub fn is_complete(&self) -> bool {
        self.in_account && self.is_ended() && self.user.remaining == 0
    }
}

impl Resource for Show {
    const TYPE: ResourceType = ResourceType::Shows;
    const KEY: &'static str = "show";

    fn id(&self) -> u64 {
        self.id
    }
}

/// The member's relationship to a show.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowUser {
    #[serde(default, deserialize_with = "flag")]
    pub archived: bool,
    #[serde(default, deserialize_with = "flag")]
    pub favorited: bool,
    /// Episodes left to watch.
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub remaining: u32,
    /// Watch progress in percent.
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub status: f64,
    /// Code of the last watched episode, e.g. `S02E05`.
    #[serde(default, deserialize_with = "text")]
    pub last: String,
    #[serde(default)]
    pub next: Option<NextEpisode>,
}

/// Next episode to watch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextEpisode {
    /// `None` once the member is up to date.
    #[serde(default, deserialize_with = "lenient_opt")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "text")]
    pub code: String,
    #[serde(default, deserialize_with = "text")]
    pub title: String,
}
