use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

use super::{Listing, MoreChildren, Thing};

/// A comment on a submission, as returned inside a comment listing
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    /// Fullname of this comment (ex: t1_c0b75sp)
    pub name: String,
    /// Fullname of the comment or submission this comment replies to
    pub parent_id: String,
    /// Fullname of the submission this comment belongs to
    #[serde(default)]
    pub link_id: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: Option<f64>,

    /// Nested replies. Reddit sends an empty string or null when there are none.
    #[serde(default, deserialize_with = "deserialize_replies")]
    pub replies: Vec<Reply>,

    // Additional fields we don't explicitly model
    #[serde(flatten)]
    pub additional_fields: HashMap<String, Value>,
}

impl Comment {
    pub fn fullname(&self) -> &str {
        &self.name
    }

    /// Format the creation time in the given timezone, or "unknown" if the API omitted it
    pub fn format_timestamp<Tz: chrono::TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        use chrono::{TimeZone, Utc};

        match self
            .created_utc
            .and_then(|created| Utc.timestamp_opt(created as i64, 0).single())
        {
            Some(timestamp) => timestamp
                .with_timezone(tz)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// A typed child of a comment listing: either a comment or a placeholder for more comments
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Comment(Box<Comment>),
    More(MoreChildren),
}

impl<'de> Deserialize<'de> for Reply {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Thing::deserialize(deserializer)?
            .into_reply()
            .map_err(D::Error::custom)
    }
}

fn deserialize_replies<'de, D>(deserializer: D) -> Result<Vec<Reply>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) if s.is_empty() => Ok(Vec::new()),
        Some(value) => {
            let listing: Listing<Reply> = serde_json::from_value(value).map_err(D::Error::custom)?;
            Ok(listing.data.children)
        }
    }
}
