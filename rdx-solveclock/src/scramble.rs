//! Scrambles, competition events, and the query used to find the next one to time.

use crate::common::{CompetitionEventId, ScrambleId};
use crate::solve::{SolveRecord, SolveSink};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A single randomized puzzle state to be solved and timed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scramble {
    pub id: ScrambleId,
    pub competition_event_id: CompetitionEventId,
    /// Ordinal position within the competition event. Decides which scramble is "next".
    pub index: u32,
    pub text: String,
    #[serde(default)]
    pub complete: bool,
}

/// A puzzle discipline within a competition and the scrambles it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionEvent {
    pub id: CompetitionEventId,
    pub name: String,
    #[serde(default)]
    pub scrambles: Vec<Scramble>,
}

impl CompetitionEvent {
    /// The lowest-index incomplete scramble, skipping `exclude`.
    ///
    /// Insertion order is irrelevant; only `index` breaks ties.
    pub fn next_incomplete(&self, exclude: Option<ScrambleId>) -> Option<&Scramble> {
        self.scrambles
            .iter()
            .filter(|scramble| !scramble.complete && Some(scramble.id) != exclude)
            .min_by_key(|scramble| scramble.index)
    }
}

/// Read-only lookup the advancement manager uses to pick the next scramble.
pub trait ScrambleQuery: Send + Sync {
    fn next_incomplete(
        &self,
        competition_event_id: CompetitionEventId,
        exclude: Option<ScrambleId>,
    ) -> Option<Scramble>;
}

/// An in-memory set of competition events.
///
/// Stands in for the server-side record: it answers `ScrambleQuery` and, as a
/// `SolveSink`, marks a scramble complete when its solve is submitted. Cloning
/// shares the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct ScrambleBook {
    events: Arc<RwLock<BTreeMap<CompetitionEventId, CompetitionEvent>>>,
}

impl ScrambleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: impl IntoIterator<Item = CompetitionEvent>) -> Self {
        let book = Self::new();
        for event in events {
            book.insert_event(event);
        }
        book
    }

    pub fn insert_event(&self, event: CompetitionEvent) {
        self.events.write().insert(event.id, event);
    }

    pub fn event(&self, id: CompetitionEventId) -> Option<CompetitionEvent> {
        self.events.read().get(&id).cloned()
    }

    pub fn events(&self) -> Vec<CompetitionEvent> {
        self.events.read().values().cloned().collect()
    }

    /// Every scramble of every event, in event order then index order.
    pub fn scrambles(&self) -> Vec<Scramble> {
        let events = self.events.read();
        let mut all = Vec::new();
        for event in events.values() {
            let mut scrambles = event.scrambles.clone();
            scrambles.sort_by_key(|scramble| scramble.index);
            all.extend(scrambles);
        }
        all
    }

    pub fn scramble(&self, id: ScrambleId) -> Option<Scramble> {
        self.events
            .read()
            .values()
            .flat_map(|event| event.scrambles.iter())
            .find(|scramble| scramble.id == id)
            .cloned()
    }

    /// Sets the completion flag of a scramble. Returns `false` if it does not exist.
    pub fn mark_complete(&self, id: ScrambleId) -> bool {
        let mut events = self.events.write();
        for event in events.values_mut() {
            if let Some(scramble) = event.scrambles.iter_mut().find(|s| s.id == id) {
                scramble.complete = true;
                return true;
            }
        }
        false
    }
}

impl ScrambleQuery for ScrambleBook {
    fn next_incomplete(
        &self,
        competition_event_id: CompetitionEventId,
        exclude: Option<ScrambleId>,
    ) -> Option<Scramble> {
        self.events
            .read()
            .get(&competition_event_id)
            .and_then(|event| event.next_incomplete(exclude))
            .cloned()
    }
}

impl SolveSink for ScrambleBook {
    fn submit(&self, record: &SolveRecord) -> anyhow::Result<()> {
        if !self.mark_complete(record.scramble_id) {
            anyhow::bail!("unknown scramble {}", record.scramble_id);
        }
        debug!(scramble = %record.scramble_id, "Scramble marked complete.");
        Ok(())
    }
}
