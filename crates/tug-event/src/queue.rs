//! `EventQueue` — the simulator's pending-event list.
//!
//! Backed by a `BTreeMap` keyed on `(time, priority, sequence)` plus an id
//! index, which gives O(log n) push, pop, and re-timing.  Re-timing an event
//! keeps its [`EventId`] and gives it a fresh sequence number, so it queues
//! behind events already waiting at the new time and priority.

use std::collections::{BTreeMap, HashMap};

use tug_core::{EventId, SimTime, TaskId};

use crate::{Event, EventKind};

type Key = (SimTime, u8, u64);

#[derive(Default)]
pub struct EventQueue {
    order:    BTreeMap<Key, EventId>,
    events:   HashMap<EventId, (Key, Event)>,
    next_id:  u64,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a new event and return its id.
    pub fn push(&mut self, task: Option<TaskId>, time: SimTime, kind: EventKind) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.insert(Event { id, task, time, kind });
        id
    }

    /// Put a previously popped event back at `time` under its old id.
    pub fn requeue(&mut self, mut event: Event, time: SimTime) {
        event.time = time;
        self.remove(event.id);
        self.insert(event);
    }

    /// Move a queued event to `time`.  Returns `false` if `id` is not queued.
    pub fn reschedule(&mut self, id: EventId, time: SimTime) -> bool {
        match self.remove(id) {
            Some(event) => {
                self.requeue(event, time);
                true
            }
            None => false,
        }
    }

    /// Remove and return the next event.
    pub fn pop(&mut self) -> Option<Event> {
        let (_, id) = self.order.pop_first()?;
        self.events.remove(&id).map(|(_, event)| event)
    }

    /// Remove a queued event by id.
    pub fn remove(&mut self, id: EventId) -> Option<Event> {
        let (key, event) = self.events.remove(&id)?;
        self.order.remove(&key);
        Some(event)
    }

    pub fn peek(&self) -> Option<&Event> {
        self.iter().next()
    }

    pub fn peek_time(&self) -> Option<SimTime> {
        self.order.keys().next().map(|&(t, _, _)| t)
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id).map(|(_, e)| e)
    }

    /// Time of a queued event.
    pub fn time_of(&self, id: EventId) -> Option<SimTime> {
        self.get(id).map(|e| e.time)
    }

    #[inline]
    pub fn contains(&self, id: EventId) -> bool {
        self.events.contains_key(&id)
    }

    /// Events in pop order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.order
            .values()
            .filter_map(move |id| self.events.get(id).map(|(_, e)| e))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn insert(&mut self, event: Event) {
        let key = (event.time, event.kind.priority(), self.next_seq);
        self.next_seq += 1;
        self.order.insert(key, event.id);
        self.events.insert(event.id, (key, event));
    }
}
