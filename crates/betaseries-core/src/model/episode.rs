// ── Episode domain types ──

use betaseries_api::ResourceType;
use serde::{Deserialize, Serialize};

use super::common::{Notes, Resource, flag, lenient, lenient_opt, lenient_or_default, text};

/// An episode as returned by `episodes/display` and `shows/episodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(deserialize_with = "lenient")]
    pub id: u64,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub thetvdb_id: Option<u64>,
    #[serde(default, deserialize_with = "text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub season: u32,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub episode: u32,
    /// e.g. `S01E03`
    #[serde(default, deserialize_with = "text")]
    pub code: String,
    #[serde(default, deserialize_with = "text")]
    pub description: String,
    /// Air date, `YYYY-MM-DD`.
    #[serde(default, deserialize_with = "text")]
    pub date: String,
    #[serde(default, alias = "notes")]
    pub note: Notes,
    #[serde(default)]
    pub show: Option<EpisodeShow>,
    #[serde(default)]
    pub user: EpisodeUser,
}

impl Episode {
    pub fn is_seen(&self) -> bool {
        self.user.seen
    }

    pub fn show_id(&self) -> Option<u64> {
        self.show.as_ref().map(|show| show.id)
    }
}

impl Resource for Episode {
    const TYPE: ResourceType = ResourceType::Episodes;
    const KEY: &'static str = "episode";

    fn id(&self) -> u64 {
        self.id
    }
}

/// Reference to the parent show embedded in an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeShow {
    #[serde(deserialize_with = "lenient")]
    pub id: u64,
    #[serde(default, deserialize_with = "text")]
    pub title: String,
    #[serde(default, deserialize_with = "flag")]
    pub in_account: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeUser {
    #[serde(default, deserialize_with = "flag")]
    pub seen: bool,
    #[serde(default, deserialize_with = "flag")]
    pub hidden: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_watched_payload() {
        let episode: Episode = serde_json::from_value(json!({
            "id": 9001,
            "title": "Pilot",
            "season": "1",
            "episode": "1",
            "code": "S01E01",
            "show": { "id": "42", "title": "Severance", "in_account": true },
            "user": { "seen": true, "hidden": false },
            "note": { "total": 12, "mean": 4 }
        }))
        .unwrap();

        assert_eq!(episode.season, 1);
        assert!(episode.is_seen());
        assert_eq!(episode.show_id(), Some(42));
        assert!(episode.show.unwrap().in_account);
        assert_eq!(episode.note.total, 12);
    }
}
