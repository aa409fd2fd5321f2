use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contract::Record;

pub const COLLECTION: &str = "stories";

pub mod field {
    pub const SLUG: &str = "slug";
    pub const TITLE: &str = "title";
    pub const IMAGE: &str = "image";
    pub const EXCERPT: &str = "excerpt";
    pub const CONTENT: &str = "content";
    pub const AUTHOR: &str = "author";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const PUBLISHED: &str = "published";
}

/// A story as the rest of the crate sees it. Only ever built from a validated [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Story {
    pub id: String,
    pub slug: String,
    /// Empty only for slug lookups of untitled records; list reads drop those.
    pub title: String,
    pub image: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub published: Option<bool>,
}

/// Partial, loosely-typed shape of a stored document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStory {
    #[serde(default, deserialize_with = "lenient_string")]
    slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    image: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    excerpt: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    content: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    author: Option<String>,
    #[serde(default)]
    created_at: Option<Value>,
    #[serde(default)]
    updated_at: Option<Value>,
    #[serde(default)]
    published: Option<Value>,
}

/// Any non-string value is treated as missing rather than failing the whole record.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Parses a store timestamp: epoch milliseconds or an RFC 3339 string.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

impl Story {
    fn from_raw(id: String, raw: RawStory, slug: String, title: String) -> Self {
        Story {
            id,
            slug,
            title,
            image: non_empty(raw.image),
            excerpt: non_empty(raw.excerpt),
            content: raw.content,
            author: non_empty(raw.author),
            created_at: raw.created_at.as_ref().and_then(parse_timestamp),
            updated_at: raw.updated_at.as_ref().and_then(parse_timestamp),
            published: raw.published.as_ref().and_then(Value::as_bool),
        }
    }

    fn raw(record: &Record) -> RawStory {
        RawStory::deserialize(Value::Object(record.fields.clone())).unwrap_or_default()
    }

    /// Strict conversion used for lists: both `slug` and `title` must be present and non-empty.
    pub fn from_record(record: &Record) -> Option<Story> {
        let raw = Self::raw(record);
        let slug = non_empty(raw.slug.clone())?;
        let title = non_empty(raw.title.clone())?;
        Some(Self::from_raw(record.id.clone(), raw, slug, title))
    }

    /// Conversion used for slug lookups: the record already matched on `slug`, so only the
    /// slug must be readable; a missing title becomes empty and is derived at display time.
    pub fn from_lookup(record: &Record) -> Option<Story> {
        let raw = Self::raw(record);
        let slug = non_empty(raw.slug.clone())?;
        let title = raw.title.clone().unwrap_or_default();
        Some(Self::from_raw(record.id.clone(), raw, slug, title))
    }
}
