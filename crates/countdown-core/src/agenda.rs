use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::datastore::DataStore;
use crate::error::EventError;
use crate::event::{Event, EventPatch, State, normalize_description, validate_name};
use crate::lifecycle::{self, DonePolicy, ResetUnit};
use crate::query::{Query, sort_by_due};

/// The event list as the rest of the program sees it. Owns the
/// authoritative in-memory collection mirrored from the datastore; every
/// mutation runs a synchronous save-then-reload cycle. Constructed once
/// and passed where needed.
#[derive(Debug)]
pub struct Agenda {
    store: DataStore,
    query: Query,
    events: Vec<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(State),
    Updated(State),
}

impl UpsertOutcome {
    pub fn state(self) -> State {
        match self {
            UpsertOutcome::Created(state) | UpsertOutcome::Updated(state) => state,
        }
    }
}

impl Agenda {
    pub fn new(store: DataStore) -> Self {
        Self {
            store,
            query: Query::default(),
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Event> {
        self.events.get(position)
    }

    /// Replaces the in-memory list with the store contents under `query`,
    /// reconciling stale upcoming events first. A store read failure is
    /// logged and leaves the previous list in place.
    #[tracing::instrument(skip(self, query, now))]
    pub fn reload(&mut self, query: Query, now: DateTime<Utc>) {
        self.query = query;

        let mut all = match self.store.load_events() {
            Ok(all) => all,
            Err(err) => {
                error!(error = %err, "store read failed; keeping in-memory events");
                return;
            }
        };

        if lifecycle::reconcile(&mut all, now)
            && let Err(err) = self.store.save_events(&all)
        {
            error!(error = %err, "failed persisting reconciled states");
        }

        all.retain(|event| self.query.matches(event));
        sort_by_due(&mut all);

        debug!(count = all.len(), "reloaded events");
        self.events = all;
    }

    /// Create-or-update keyed by name. Blank descriptions become the
    /// "No Description" sentinel; what happens to an already-done event
    /// is the caller's choice via `policy`.
    #[tracing::instrument(skip(self, description, due, now))]
    pub fn upsert(
        &mut self,
        name: &str,
        description: &str,
        due: DateTime<Utc>,
        policy: DonePolicy,
        now: DateTime<Utc>,
    ) -> anyhow::Result<UpsertOutcome> {
        validate_name(name)?;
        let description = normalize_description(description);

        let mut all = self
            .store
            .load_events()
            .context("cannot save event: store read failed")?;

        let outcome = if let Some(existing) = all.iter_mut().find(|event| event.name == name) {
            let state = lifecycle::state_for_upsert(Some(existing.state), due, now, policy);
            existing.apply(
                EventPatch {
                    description: Some(description),
                    due: Some(due),
                    state: Some(state),
                },
                now,
            );
            UpsertOutcome::Updated(state)
        } else {
            let state = lifecycle::state_for_upsert(None, due, now, policy);
            all.push(Event::new(name.to_string(), description, due, state, now));
            UpsertOutcome::Created(state)
        };

        info!(name, outcome = ?outcome, "upserted event");
        self.persist_and_reload(all, now);
        Ok(outcome)
    }

    /// Removes the event at `position` in the current ordering.
    #[tracing::instrument(skip(self, now))]
    pub fn delete(&mut self, position: usize, now: DateTime<Utc>) -> anyhow::Result<Event> {
        let uuid = self.uuid_at(position)?;

        let mut all = self
            .store
            .load_events()
            .context("cannot delete event: store read failed")?;
        let removed = take_by_uuid(&mut all, uuid)
            .with_context(|| format!("event at position {position} is gone from the store"))?;

        info!(name = %removed.name, "deleted event");
        self.persist_and_reload(all, now);
        Ok(removed)
    }

    /// Marks the event at `position` done and stamps its due date to the
    /// marking time.
    #[tracing::instrument(skip(self, now))]
    pub fn mark_done(&mut self, position: usize, now: DateTime<Utc>) -> anyhow::Result<Event> {
        self.patch_at(position, now, |_, now| EventPatch {
            description: None,
            due: Some(now),
            state: Some(State::Done),
        })
    }

    /// Reschedules the event at `position` one unit forward, clamped to
    /// the future, and returns it to the upcoming state.
    #[tracing::instrument(skip(self, now))]
    pub fn reschedule(
        &mut self,
        position: usize,
        unit: ResetUnit,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Event> {
        self.patch_at(position, now, |event, now| EventPatch {
            description: None,
            due: Some(lifecycle::reset_date(Some(event.due), unit, now)),
            state: Some(State::WillBe),
        })
    }

    fn patch_at(
        &mut self,
        position: usize,
        now: DateTime<Utc>,
        make_patch: impl FnOnce(&Event, DateTime<Utc>) -> EventPatch,
    ) -> anyhow::Result<Event> {
        let uuid = self.uuid_at(position)?;

        let mut all = self
            .store
            .load_events()
            .context("cannot update event: store read failed")?;
        let target = all
            .iter_mut()
            .find(|event| event.uuid == uuid)
            .with_context(|| format!("event at position {position} is gone from the store"))?;

        let patch = make_patch(target, now);
        target.apply(patch, now);
        let updated = target.clone();

        info!(name = %updated.name, state = ?updated.state, "updated event");
        self.persist_and_reload(all, now);
        Ok(updated)
    }

    fn uuid_at(&self, position: usize) -> Result<Uuid, EventError> {
        self.events
            .get(position)
            .map(|event| event.uuid)
            .ok_or(EventError::OutOfRange {
                position,
                len: self.events.len(),
            })
    }

    /// The synchronous save-then-reload cycle behind every mutation.
    /// The reload drops back to the unfiltered view; a mutation always
    /// snaps the list to the All segment. A write failure is logged and
    /// the mutated set stays in memory as the last-known-good list.
    fn persist_and_reload(&mut self, mut all: Vec<Event>, now: DateTime<Utc>) {
        if let Err(err) = self.store.save_events(&all) {
            error!(error = %err, "store write failed; keeping in-memory state");
            self.query = Query::default();
            sort_by_due(&mut all);
            self.events = all;
            return;
        }

        self.reload(Query::default(), now);
    }
}

fn take_by_uuid(events: &mut Vec<Event>, uuid: Uuid) -> Option<Event> {
    let idx = events.iter().position(|event| event.uuid == uuid)?;
    Some(events.remove(idx))
}
