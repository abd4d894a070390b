// ── Common types shared across the resource model ──

use std::fmt::Display;
use std::str::FromStr;

use betaseries_api::ResourceType;
use serde::de::{DeserializeOwned, Error as _, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};

/// A typed API resource that owns a cache partition.
pub trait Resource: DeserializeOwned + Serialize {
    /// Cache partition and routing segment.
    const TYPE: ResourceType;
    /// Key of the resource object in a response envelope (`show`, `movie`, ...).
    const KEY: &'static str;

    fn id(&self) -> u64;
}

/// Community rating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Notes {
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub mean: f64,
    /// The member's own rating, 0 when unrated.
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub user: u64,
}

impl Notes {
    pub fn is_rated(&self) -> bool {
        self.total > 0 && self.mean > 0.0
    }
}

// ── Tolerant decoding ───────────────────────────────────────────────
//
// The API is loose with scalar types: counters and ids arrive as numbers
// or numeric strings, flags as booleans or 0/1, and optional values as
// null or "". Only `lenient` rejects a value; the other decoders fall back.

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText<T> {
    Number(T),
    Text(String),
    Other(IgnoredAny),
}

/// Accept `T` or a string that parses as `T`.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match NumberOrText::<T>::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text.trim().parse().map_err(D::Error::custom),
        NumberOrText::Other(_) => Err(D::Error::custom("expected a number or a numeric string")),
    }
}

/// Like [`lenient`], with null and unparseable text mapped to the default.
pub(crate) fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr + Default,
{
    Ok(
        match Option::<NumberOrText<T>>::deserialize(deserializer)? {
            Some(NumberOrText::Number(value)) => value,
            Some(NumberOrText::Text(text)) => text.trim().parse().unwrap_or_default(),
            Some(NumberOrText::Other(_)) | None => T::default(),
        },
    )
}

/// Optional scalar; null, "" and anything that does not parse as `T`
/// are `None`.
pub(crate) fn lenient_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
{
    Ok(
        match Option::<NumberOrText<T>>::deserialize(deserializer)? {
            Some(NumberOrText::Number(value)) => Some(value),
            Some(NumberOrText::Text(text)) => text.trim().parse().ok(),
            Some(NumberOrText::Other(_)) | None => None,
        },
    )
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Number(i64),
    Text(String),
    Other(IgnoredAny),
}

/// Accept `true`/`false`, `1`/`0`, or their string forms; null is `false`.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => value,
        Some(Flag::Number(n)) => n != 0,
        Some(Flag::Text(text)) => matches!(text.trim(), "1" | "true"),
        Some(Flag::Other(_)) | None => false,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Other(IgnoredAny),
}

/// Numbers are rendered as text; null and non-scalars are the empty string.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Text(text)) => text,
        Some(Scalar::Integer(n)) => n.to_string(),
        Some(Scalar::Float(n)) => n.to_string(),
        Some(Scalar::Other(_)) | None => String::new(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "lenient")]
        id: u64,
        #[serde(default, deserialize_with = "lenient_opt")]
        year: Option<u32>,
        #[serde(default, deserialize_with = "flag")]
        seen: bool,
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        let probe: Probe = serde_json::from_value(json!({ "id": "42", "year": 2019 })).unwrap();
        assert_eq!(probe.id, 42);
        assert_eq!(probe.year, Some(2019));
    }

    #[test]
    fn empty_optional_is_none() {
        let probe: Probe = serde_json::from_value(json!({ "id": 1, "year": "" })).unwrap();
        assert_eq!(probe.year, None);
        let probe: Probe = serde_json::from_value(json!({ "id": 1, "year": null })).unwrap();
        assert_eq!(probe.year, None);
    }

    #[test]
    fn unparseable_optional_is_none() {
        for raw in [json!("inconnue"), json!(-1), json!(true), json!({ "y": 1 })] {
            let probe: Probe = serde_json::from_value(json!({ "id": 1, "year": raw })).unwrap();
            assert_eq!(probe.year, None);
        }
    }

    #[test]
    fn out_of_range_counter_falls_back_to_default() {
        let notes: Notes = serde_json::from_value(json!({ "total": -3, "mean": [] })).unwrap();
        assert_eq!(notes.total, 0);
        assert!(notes.mean.abs() < f64::EPSILON);
    }

    #[test]
    fn missing_or_garbage_id_is_rejected() {
        assert!(serde_json::from_value::<Probe>(json!({ "year": 2019 })).is_err());
        assert!(serde_json::from_value::<Probe>(json!({ "id": "abc" })).is_err());
        assert!(serde_json::from_value::<Probe>(json!({ "id": -5 })).is_err());
    }

    #[test]
    fn flags_accept_several_encodings() {
        for (raw, expected) in [
            (json!(true), true),
            (json!(1), true),
            (json!("1"), true),
            (json!(0), false),
            (json!(null), false),
        ] {
            let probe: Probe = serde_json::from_value(json!({ "id": 1, "seen": raw })).unwrap();
            assert_eq!(probe.seen, expected);
        }
    }

    #[test]
    fn text_accepts_numbers() {
        #[derive(Deserialize)]
        struct Titled {
            #[serde(default, deserialize_with = "text")]
            title: String,
        }
        let titled: Titled = serde_json::from_value(json!({ "title": 1917 })).unwrap();
        assert_eq!(titled.title, "1917");
        let titled: Titled = serde_json::from_value(json!({ "title": ["x"] })).unwrap();
        assert_eq!(titled.title, "");
    }

    #[test]
    fn notes_tolerate_strings_and_nulls() {
        let notes: Notes =
            serde_json::from_value(json!({ "total": "120", "mean": "4.25", "user": null }))
                .unwrap();
        assert_eq!(notes.total, 120);
        assert!((notes.mean - 4.25).abs() < f64::EPSILON);
        assert_eq!(notes.user, 0);
        assert!(notes.is_rated());
    }
}
