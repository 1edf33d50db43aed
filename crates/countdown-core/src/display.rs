use chrono::{DateTime, Utc};

use crate::event::{Event, State};
use crate::lifecycle::resolve_state;

const MAX_UNITS: usize = 3;

// Fixed spans, largest first. Months and years are approximate.
const UNIT_SPANS: [(i64, &str); 7] = [
    (365 * 86_400, "y"),
    (30 * 86_400, "mo"),
    (7 * 86_400, "w"),
    (86_400, "d"),
    (3_600, "h"),
    (60, "m"),
    (1, "s"),
];

/// Renders the time remaining until `due` with at most three non-zero
/// units, e.g. "2d 3h 12m". A missing date renders the "Error" sentinel;
/// anything at or past `now` clamps to "0s".
pub fn format_time_left(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(due) = due else {
        return "Error".to_string();
    };

    let mut remaining = (due - now).num_seconds().max(0);
    let mut parts: Vec<String> = Vec::with_capacity(MAX_UNITS);

    for (span, suffix) in UNIT_SPANS {
        if parts.len() == MAX_UNITS {
            break;
        }
        let count = remaining / span;
        if count > 0 {
            parts.push(format!("{count}{suffix}"));
            remaining -= count * span;
        }
    }

    if parts.is_empty() {
        return "0s".to_string();
    }
    parts.join(" ")
}

#[derive(Debug, Clone)]
pub struct DisplayRow {
    pub position: usize,
    pub name: String,
    pub description: String,
    pub due: DateTime<Utc>,
    pub state: State,
    pub time_left: String,
}

/// Pure projection of the current list into display rows. The caller
/// owns the clock and the refresh cadence; calling this once a second is
/// all a live view needs.
pub fn project(events: &[Event], now: DateTime<Utc>) -> Vec<DisplayRow> {
    events
        .iter()
        .enumerate()
        .map(|(idx, event)| {
            let state = resolve_state(event.state, event.due, now);
            let time_left = match state {
                State::Done => "Done".to_string(),
                State::Passed => "Passed".to_string(),
                State::WillBe => format_time_left(Some(event.due), now),
            };

            DisplayRow {
                position: idx + 1,
                name: event.name.clone(),
                description: event.description.clone(),
                due: event.due,
                state,
                time_left,
            }
        })
        .collect()
}
