use chrono::{DateTime, Days, Months, Utc};
use tracing::debug;

use crate::event::{Event, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetUnit {
    Day,
    Month,
    Year,
}

impl ResetUnit {
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "day" => Some(ResetUnit::Day),
            "month" => Some(ResetUnit::Month),
            "year" => Some(ResetUnit::Year),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResetUnit::Day => "day",
            ResetUnit::Month => "month",
            ResetUnit::Year => "year",
        }
    }
}

/// What an upsert does to an event that is already marked done:
/// keep the mark, or derive the state from the new due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonePolicy {
    Preserve,
    Recompute,
}

pub fn resolve_state(state: State, due: DateTime<Utc>, now: DateTime<Utc>) -> State {
    if state == State::Done {
        return State::Done;
    }
    if due < now { State::Passed } else { State::WillBe }
}

pub fn state_for_upsert(
    existing: Option<State>,
    due: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: DonePolicy,
) -> State {
    if policy == DonePolicy::Preserve && existing == Some(State::Done) {
        return State::Done;
    }
    if due > now { State::WillBe } else { State::Passed }
}

/// Adds one unit to `old_due` (or to `now` when the event has no date to
/// start from). A sum that lands at or before `now` is discarded and the
/// unit is added to `now` instead, so the result is in the future.
pub fn reset_date(
    old_due: Option<DateTime<Utc>>,
    unit: ResetUnit,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let base = old_due.unwrap_or(now);
    match advance(base, unit) {
        Some(candidate) if candidate > now => candidate,
        _ => advance(now, unit).unwrap_or(now),
    }
}

fn advance(from: DateTime<Utc>, unit: ResetUnit) -> Option<DateTime<Utc>> {
    match unit {
        ResetUnit::Day => from.checked_add_days(Days::new(1)),
        ResetUnit::Month => from.checked_add_months(Months::new(1)),
        ResetUnit::Year => from.checked_add_months(Months::new(12)),
    }
}

/// Corrects events whose due date has slipped into the past while they
/// were still marked upcoming. Returns whether anything changed so the
/// caller can decide to persist; the correction itself never touches
/// events already marked done.
pub fn reconcile(events: &mut [Event], now: DateTime<Utc>) -> bool {
    let mut corrected = 0usize;

    for event in events.iter_mut() {
        if event.state == State::WillBe && event.due < now {
            event.state = State::Passed;
            event.modified = now;
            corrected += 1;
        }
    }

    if corrected > 0 {
        debug!(corrected, "marked stale events as passed");
    }
    corrected > 0
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{DonePolicy, ResetUnit, reconcile, reset_date, resolve_state, state_for_upsert};
    use crate::event::{Event, State};

    fn clock() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 5, 12, 0, 0)
            .single()
            .expect("valid now")
    }

    fn event(name: &str, state: State, due: chrono::DateTime<Utc>) -> Event {
        Event::new(name.to_string(), "x".to_string(), due, state, clock())
    }

    #[test]
    fn done_wins_regardless_of_due_date() {
        let now = clock();
        let last_week = now - Duration::days(7);

        assert_eq!(resolve_state(State::Done, last_week, now), State::Done);
        assert_eq!(
            resolve_state(State::Done, now + Duration::days(1), now),
            State::Done
        );
    }

    #[test]
    fn past_due_resolves_to_passed_and_future_to_will_be() {
        let now = clock();

        assert_eq!(
            resolve_state(State::WillBe, now - Duration::seconds(1), now),
            State::Passed
        );
        assert_eq!(
            resolve_state(State::Passed, now + Duration::hours(1), now),
            State::WillBe
        );
    }

    #[test]
    fn upsert_state_preserves_or_recomputes_done() {
        let now = clock();
        let future = now + Duration::days(3);

        assert_eq!(
            state_for_upsert(Some(State::Done), future, now, DonePolicy::Preserve),
            State::Done
        );
        assert_eq!(
            state_for_upsert(Some(State::Done), future, now, DonePolicy::Recompute),
            State::WillBe
        );
        assert_eq!(
            state_for_upsert(None, now - Duration::days(1), now, DonePolicy::Preserve),
            State::Passed
        );
    }

    #[test]
    fn reset_date_advances_a_future_date() {
        let now = clock();
        let due = now + Duration::hours(2);

        let advanced = reset_date(Some(due), ResetUnit::Day, now);
        assert_eq!(advanced, due + Duration::days(1));
    }

    #[test]
    fn reset_date_falls_back_to_now_plus_unit() {
        let now = clock();
        // last week + one month is still in the future, so it sticks
        let last_week = now - Duration::days(7);
        let advanced = reset_date(Some(last_week), ResetUnit::Month, now);
        assert!(advanced > now);

        // two months ago + one month is already past: fall back to now + month
        let stale = now - Duration::days(62);
        let corrected = reset_date(Some(stale), ResetUnit::Month, now);
        assert!(corrected > now);
        assert_eq!(
            corrected,
            Utc.with_ymd_and_hms(2026, 9, 5, 12, 0, 0)
                .single()
                .expect("valid fallback")
        );
    }

    #[test]
    fn reset_date_without_a_due_date_starts_from_now() {
        let now = clock();
        let advanced = reset_date(None, ResetUnit::Year, now);
        assert_eq!(
            advanced,
            Utc.with_ymd_and_hms(2027, 8, 5, 12, 0, 0)
                .single()
                .expect("valid next year")
        );
    }

    #[test]
    fn reset_date_is_always_in_the_future() {
        let now = clock();
        let samples = [
            None,
            Some(now - Duration::days(400)),
            Some(now - Duration::seconds(1)),
            Some(now),
            Some(now + Duration::days(400)),
        ];

        for old in samples {
            for unit in [ResetUnit::Day, ResetUnit::Month, ResetUnit::Year] {
                assert!(reset_date(old, unit, now) > now, "old={old:?} unit={unit:?}");
            }
        }
    }

    #[test]
    fn reconcile_flips_stale_upcoming_events_only() {
        let now = clock();
        let mut events = vec![
            event("stale", State::WillBe, now - Duration::days(1)),
            event("done", State::Done, now - Duration::days(1)),
            event("future", State::WillBe, now + Duration::days(1)),
            event("already", State::Passed, now - Duration::days(2)),
        ];

        assert!(reconcile(&mut events, now));
        assert_eq!(events[0].state, State::Passed);
        assert_eq!(events[1].state, State::Done);
        assert_eq!(events[2].state, State::WillBe);
        assert_eq!(events[3].state, State::Passed);

        // second pass has nothing left to correct
        assert!(!reconcile(&mut events, now));
    }
}
