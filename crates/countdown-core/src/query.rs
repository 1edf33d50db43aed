use tracing::trace;

use crate::event::{Event, State};

/// The three-way list filter the UI exposes: everything, only passed,
/// only done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Segment {
    #[default]
    All,
    Passed,
    Done,
}

impl Segment {
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Segment::Passed,
            2 => Segment::Done,
            _ => Segment::All,
        }
    }

    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "all" => Some(Segment::All),
            "passed" => Some(Segment::Passed),
            "done" => Some(Segment::Done),
            _ => None,
        }
    }

    pub fn state(self) -> Option<State> {
        match self {
            Segment::All => None,
            Segment::Passed => Some(State::Passed),
            Segment::Done => Some(State::Done),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    name_contains: Option<String>,
    state: Option<State>,
}

impl Query {
    pub fn from_segment(segment: Segment) -> Self {
        Self {
            name_contains: None,
            state: segment.state(),
        }
    }

    /// The search-bar rule: blank text drops the name filter AND resets
    /// the segment back to All.
    pub fn search(text: &str, segment: Segment) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        Self {
            name_contains: Some(trimmed.to_lowercase()),
            state: segment.state(),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        let ok = self
            .name_contains
            .as_deref()
            .is_none_or(|needle| event.name.to_lowercase().contains(needle))
            && self.state.is_none_or(|state| event.state == state);

        trace!(name = %event.name, state = ?event.state, ok, "query match");
        ok
    }

    pub fn is_unfiltered(&self) -> bool {
        self.name_contains.is_none() && self.state.is_none()
    }
}

pub fn sort_by_due(events: &mut [Event]) {
    events.sort_by_key(|event| event.due);
}
