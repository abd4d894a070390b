// ── Movie domain types ──

use betaseries_api::ResourceType;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::common::{Notes, Resource, flag, lenient, lenient_opt, text};

/// Where a movie stands in the member's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(into = "u8", try_from = "u8")]
pub enum MovieState {
    ToSee,
    Seen,
    WontSee,
}

impl MovieState {
    /// Wire value of the `state` parameter.
    pub fn code(self) -> u8 {
        match self {
            Self::ToSee => 0,
            Self::Seen => 1,
            Self::WontSee => 2,
        }
    }
}

impl From<MovieState> for u8 {
    fn from(state: MovieState) -> Self {
        state.code()
    }
}

impl TryFrom<u8> for MovieState {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::ToSee),
            1 => Ok(Self::Seen),
            2 => Ok(Self::WontSee),
            other => Err(format!("unknown movie state {other}")),
        }
    }
}

/// A movie as returned by `movies/movie`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(deserialize_with = "lenient")]
    pub id: u64,
    #[serde(default, deserialize_with = "text")]
    pub title: String,
    #[serde(default, deserialize_with = "text")]
    pub original_title: String,
    #[serde(default, deserialize_with = "text")]
    pub synopsis: String,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub production_year: Option<u32>,
    /// Runtime in seconds.
    #[serde(default, deserialize_with = "lenient_opt")]
    pub length: Option<u32>,
    #[serde(default)]
    pub notes: Notes,
    #[serde(default)]
    pub user: MovieUser,
}

impl Movie {
    pub fn in_account(&self) -> bool {
        self.user.in_account
    }

    pub fn state(&self) -> Option<MovieState> {
        if !self.user.in_account {
            return None;
        }
        self.user.status.and_then(|code| MovieState::try_from(code).ok())
    }
}

impl Resource for Movie {
    const TYPE: ResourceType = ResourceType::Movies;
    const KEY: &'static str = "movie";

    fn id(&self) -> u64 {
        self.id
    }
}

/// The member's relationship to a movie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieUser {
    #[serde(default, deserialize_with = "flag")]
    pub in_account: bool,
    /// Raw [`MovieState`] code.
    #[serde(default, deserialize_with = "lenient_opt")]
    pub status: Option<u8>,
}
