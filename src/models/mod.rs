use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use std::collections::BTreeMap;

use crate::error::{NotesError, NotesResult};

/// Every persisted note, keyed by the page URL it belongs to.
pub type NotesByUrl = BTreeMap<String, Vec<Note>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", try_from = "StoredNote")]
pub struct Note {
    /// Note ID, unique within its page
    pub id: String,
    /// Note content
    pub content: String,
    /// Creation time
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Time of the last content change
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(id: String, content: String, now: DateTime<Utc>) -> NotesResult<Self> {
        validate_content(&content)?;

        Ok(Self {
            id,
            content,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces the content and moves `updated_at` forward.
    ///
    /// `updated_at` always advances by at least one millisecond, even when
    /// the clock reports a time at or before the previous update.
    pub fn revise(&mut self, content: String, now: DateTime<Utc>) -> NotesResult<()> {
        validate_content(&content)?;

        let floor = self.updated_at + Duration::milliseconds(1);
        self.content = content;
        self.updated_at = now.max(floor);

        Ok(())
    }
}

/// A note as read back from storage, before it is checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredNote {
    id: String,
    content: String,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    updated_at: DateTime<Utc>,
}

impl TryFrom<StoredNote> for Note {
    type Error = NotesError;

    fn try_from(stored: StoredNote) -> NotesResult<Self> {
        if stored.id.is_empty() {
            return Err(NotesError::Validation("note id must not be empty".to_string()));
        }
        validate_content(&stored.content)?;
        if stored.updated_at < stored.created_at {
            return Err(NotesError::Validation(format!(
                "note '{}' was updated before it was created",
                stored.id
            )));
        }

        Ok(Self {
            id: stored.id,
            content: stored.content,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }
}

impl AsRef<Note> for Note {
    fn as_ref(&self) -> &Self {
        self
    }
}

/// A note annotated with the page it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NoteWithUrl {
    #[serde(flatten)]
    pub note: Note,
    /// Page URL
    pub url: String,
}

impl AsRef<Note> for NoteWithUrl {
    fn as_ref(&self) -> &Note {
        &self.note
    }
}

pub fn validate_content(content: &str) -> NotesResult<()> {
    if content.trim().is_empty() {
        return Err(NotesError::Validation(
            "note content must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// RFC 3339 timestamps with millisecond precision, the format the
/// persisted record has always used.
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;

        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}
