// ── Member domain types ──

use betaseries_api::ResourceType;
use serde::{Deserialize, Serialize};

use super::common::{Resource, lenient, lenient_or_default, text};

/// A BetaSeries member as returned by `members/infos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(deserialize_with = "lenient")]
    pub id: u64,
    #[serde(default, deserialize_with = "text")]
    pub login: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub xp: u64,
    #[serde(default, deserialize_with = "text")]
    pub locale: String,
    #[serde(default, deserialize_with = "text")]
    pub avatar: String,
    #[serde(default)]
    pub stats: MemberStats,
}

impl Resource for Member {
    const TYPE: ResourceType = ResourceType::Members;
    const KEY: &'static str = "member";

    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberStats {
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub shows: u32,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub episodes: u32,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub movies: u32,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub friends: u32,
}
