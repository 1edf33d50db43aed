use chrono::{Duration, TimeZone, Utc};
use countdown_core::agenda::{Agenda, UpsertOutcome};
use countdown_core::datastore::DataStore;
use countdown_core::display::project;
use countdown_core::event::State;
use countdown_core::lifecycle::{DonePolicy, ResetUnit};
use countdown_core::query::{Query, Segment};
use tempfile::tempdir;

#[test]
fn agenda_flow_from_creation_to_done() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let mut agenda = Agenda::new(store);

    let now = Utc
        .with_ymd_and_hms(2026, 8, 5, 12, 0, 0)
        .single()
        .expect("valid now");

    let outcome = agenda
        .upsert(
            "Birthday",
            "",
            now + Duration::days(1),
            DonePolicy::Preserve,
            now,
        )
        .expect("create event");
    assert_eq!(outcome, UpsertOutcome::Created(State::WillBe));

    // same name again is an update, not a duplicate
    agenda
        .upsert(
            "Birthday",
            "Party",
            now + Duration::days(2),
            DonePolicy::Preserve,
            now,
        )
        .expect("update event");
    agenda
        .upsert(
            "Deadline",
            "Ship it",
            now + Duration::hours(3),
            DonePolicy::Preserve,
            now,
        )
        .expect("second event");

    agenda.reload(Query::default(), now);
    assert_eq!(agenda.len(), 2);
    assert_eq!(agenda.get(0).expect("first").name, "Deadline");
    assert_eq!(agenda.get(1).expect("second").description, "Party");

    let rows = project(agenda.events(), now);
    assert_eq!(rows[0].time_left, "3h");
    assert_eq!(rows[1].time_left, "2d");

    // the deadline slips past; a later reload reconciles and persists it
    let later = now + Duration::hours(4);
    agenda.reload(Query::from_segment(Segment::Passed), later);
    assert_eq!(agenda.len(), 1);
    assert_eq!(agenda.get(0).expect("passed").name, "Deadline");

    // reschedule brings it back as upcoming
    let updated = agenda
        .reschedule(0, ResetUnit::Day, later)
        .expect("reschedule");
    assert_eq!(updated.state, State::WillBe);
    assert!(updated.due > later);

    agenda.reload(Query::default(), later);
    let done = agenda.mark_done(0, later).expect("mark done");
    assert_eq!(done.state, State::Done);
    assert_eq!(done.due, later);

    // the store round-trips everything a fresh process needs
    let fresh_store = DataStore::open(temp.path()).expect("reopen datastore");
    let mut fresh = Agenda::new(fresh_store);
    fresh.reload(Query::from_segment(Segment::Done), later);
    assert_eq!(fresh.len(), 1);

    let removed = fresh.delete(0, later).expect("delete");
    fresh.reload(Query::default(), later);
    assert_eq!(fresh.len(), 1);
    assert_ne!(fresh.get(0).expect("remaining").name, removed.name);
}

#[test]
fn search_matches_name_and_segment_together() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let mut agenda = Agenda::new(store);

    let now = Utc
        .with_ymd_and_hms(2026, 8, 5, 12, 0, 0)
        .single()
        .expect("valid now");

    agenda
        .upsert(
            "Birthday",
            "x",
            now - Duration::days(1),
            DonePolicy::Preserve,
            now,
        )
        .expect("passed birthday");
    agenda
        .upsert(
            "Birthday party",
            "x",
            now + Duration::days(1),
            DonePolicy::Preserve,
            now,
        )
        .expect("upcoming birthday");

    agenda.reload(Query::search("bir", Segment::Passed), now);
    assert_eq!(agenda.len(), 1);
    assert_eq!(agenda.get(0).expect("match").name, "Birthday");

    // a blank search falls back to the unfiltered list
    agenda.reload(Query::search("", Segment::Passed), now);
    assert_eq!(agenda.len(), 2);
}
