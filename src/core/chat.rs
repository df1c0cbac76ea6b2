//! Conversation Model
//!
//! Information Hiding:
//! - Timestamp precision and the invalid-date sentinel hidden behind `Timestamp`
//! - Partial updates expressed as `ChatUpdate` so immutable fields cannot be touched

use chrono::{DateTime, Datelike, DurationRound, FixedOffset, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single turn in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Creation time of a conversation, held at millisecond precision.
///
/// Years outside 0000-9999 use the expanded `±YYYYYY` form of ISO-8601.
/// A stored value that cannot be parsed becomes `Timestamp::Invalid`, which keeps
/// the raw text so that writing the record back does not change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    Valid(DateTime<Utc>),
    Invalid(String),
}

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Truncates to whole milliseconds, the precision of the ISO-8601 form.
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        let truncated = value
            .duration_trunc(TimeDelta::milliseconds(1))
            .unwrap_or(value);
        Self::Valid(truncated)
    }

    pub fn parse_iso(raw: &str) -> Self {
        let parsed = DateTime::parse_from_rfc3339(raw)
            .ok()
            .or_else(|| parse_expanded_year(raw));
        match parsed {
            Some(value) => Self::from_datetime(value.with_timezone(&Utc)),
            None => Self::Invalid(raw.to_string()),
        }
    }

    pub fn to_iso_string(&self) -> String {
        match self {
            Self::Valid(value) if (0..=9999).contains(&value.year()) => {
                value.to_rfc3339_opts(SecondsFormat::Millis, true)
            }
            Self::Valid(value) => {
                let sign = if value.year() < 0 { '-' } else { '+' };
                format!(
                    "{}{:06}{}",
                    sign,
                    value.year().unsigned_abs(),
                    value.format("-%m-%dT%H:%M:%S%.3fZ")
                )
            }
            Self::Invalid(raw) => raw.clone(),
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Parse `±YYYY..-MM-DDTHH:MM:SS[.sss](Z|±HH:MM)`, a signed year of four or
/// more digits. The rest is parsed against a leap year, then the year is set.
fn parse_expanded_year(raw: &str) -> Option<DateTime<FixedOffset>> {
    let sign = match raw.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let unsigned = &raw[1..];
    let year_len = unsigned.find('-')?;
    let digits = &unsigned[..year_len];
    if digits.len() < 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = digits.parse().ok()?;

    let anchored = DateTime::parse_from_rfc3339(&format!("2000{}", &unsigned[year_len..])).ok()?;
    anchored.with_year(sign * year)
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid(_) => f.write_str(&self.to_iso_string()),
            Self::Invalid(_) => f.write_str("Invalid Date"),
        }
    }
}

/// One chat session
#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: Timestamp,
    pub model: String,
    pub temperature: f64,
}

impl Chat {
    /// New conversation seeded with an assistant greeting
    pub fn new(
        title: impl Into<String>,
        greeting: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            messages: vec![Message::assistant(greeting)],
            created_at: Timestamp::now(),
            model: model.into(),
            temperature,
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Merge a partial update into this conversation
    pub fn apply(&mut self, update: &ChatUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(model) = &update.model {
            self.model = model.clone();
        }
        if let Some(temperature) = update.temperature {
            self.temperature = temperature;
        }
        if let Some(messages) = &update.messages {
            self.messages = messages.clone();
        }
    }
}

/// Partial update of the mutable conversation fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatUpdate {
    pub title: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub messages: Option<Vec<Message>>,
}

impl ChatUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.model.is_none()
            && self.temperature.is_none()
            && self.messages.is_none()
    }
}
