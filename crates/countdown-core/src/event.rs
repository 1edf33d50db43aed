use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::compact_date_serde;
use crate::error::EventError;

pub const MAX_NAME_LEN: usize = 30;
pub const NO_DESCRIPTION: &str = "No Description";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum State {
    #[serde(rename = "willBe")]
    WillBe,
    #[serde(rename = "passed")]
    Passed,
    #[serde(rename = "done")]
    Done,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::WillBe => "willBe",
            State::Passed => "passed",
            State::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub uuid: Uuid,

    pub name: String,

    pub description: String,

    #[serde(with = "compact_date_serde")]
    pub due: DateTime<Utc>,

    pub state: State,

    #[serde(with = "compact_date_serde")]
    pub entry: DateTime<Utc>,

    #[serde(with = "compact_date_serde")]
    pub modified: DateTime<Utc>,
}

/// The only fields an update is allowed to touch. Everything else
/// (uuid, name, entry) survives the mutation unchanged.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub description: Option<String>,
    pub due: Option<DateTime<Utc>>,
    pub state: Option<State>,
}

impl Event {
    pub fn new(
        name: String,
        description: String,
        due: DateTime<Utc>,
        state: State,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name,
            description,
            due,
            state,
            entry: now,
            modified: now,
        }
    }

    pub fn apply(&mut self, patch: EventPatch, now: DateTime<Utc>) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(due) = patch.due {
            self.due = due;
        }
        if let Some(state) = patch.state {
            self.state = state;
        }
        self.modified = now;
    }
}

pub fn validate_name(name: &str) -> Result<(), EventError> {
    if name.trim().is_empty() {
        return Err(EventError::EmptyName);
    }

    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(EventError::NameTooLong { len });
    }

    Ok(())
}

pub fn normalize_description(description: &str) -> String {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Event, EventPatch, State, normalize_description, validate_name};
    use crate::error::EventError;

    #[test]
    fn name_boundary_is_exactly_thirty() {
        let ok = "a".repeat(30);
        let too_long = "a".repeat(31);

        assert!(validate_name(&ok).is_ok());
        assert_eq!(
            validate_name(&too_long),
            Err(EventError::NameTooLong { len: 31 })
        );
        assert_eq!(validate_name(""), Err(EventError::EmptyName));
        assert_eq!(validate_name("   "), Err(EventError::EmptyName));
    }

    #[test]
    fn name_limit_counts_characters_not_bytes() {
        let umlauts = "ü".repeat(30);
        assert!(validate_name(&umlauts).is_ok());
    }

    #[test]
    fn blank_description_gets_the_sentinel() {
        assert_eq!(normalize_description(""), "No Description");
        assert_eq!(normalize_description("  "), "No Description");
        assert_eq!(normalize_description(" Party "), "Party");
    }

    #[test]
    fn patch_bumps_modified_and_preserves_identity() {
        let entry = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid entry");
        let later = entry + Duration::hours(5);

        let mut event = Event::new(
            "Birthday".to_string(),
            "Party".to_string(),
            entry + Duration::days(7),
            State::WillBe,
            entry,
        );
        let uuid = event.uuid;

        event.apply(
            EventPatch {
                description: Some("Bigger party".to_string()),
                due: None,
                state: Some(State::Done),
            },
            later,
        );

        assert_eq!(event.uuid, uuid);
        assert_eq!(event.entry, entry);
        assert_eq!(event.modified, later);
        assert_eq!(event.description, "Bigger party");
        assert_eq!(event.state, State::Done);
    }
}
