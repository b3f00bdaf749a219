//! Keeps one solve card per scramble in step with the timer.

use crate::bus::EventBus;
use crate::common::{CompetitionEventId, ListenerId, ScrambleId};
use crate::events::{EventKind, StopPayload, TimerEvent};
use crate::scramble::Scramble;
use crate::solve::{Penalty, SolveRecord};
use crate::time::Centiseconds;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// The state a solve card view is rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveCard {
    pub scramble_id: ScrambleId,
    pub competition_event_id: CompetitionEventId,
    pub index: u32,
    pub complete: bool,
    /// Whether this is the scramble the timer is bound to.
    pub active: bool,
    pub time_text: Option<String>,
    pub centiseconds: Option<Centiseconds>,
    pub penalty: Penalty,
}

impl SolveCard {
    fn from_scramble(scramble: &Scramble) -> Self {
        Self {
            scramble_id: scramble.id,
            competition_event_id: scramble.competition_event_id,
            index: scramble.index,
            complete: scramble.complete,
            active: false,
            time_text: None,
            centiseconds: None,
            penalty: Penalty::None,
        }
    }
}

type Cards = Arc<RwLock<BTreeMap<ScrambleId, SolveCard>>>;

/// The solve card sync manager.
///
/// Reconciles cards against timer payloads without second-guessing them: a
/// stop marks the stopped scramble's card complete, clears its active marker
/// and records the time. Payloads for scrambles without a card are ignored.
pub struct SolveCardSyncManager {
    bus: EventBus,
    cards: Cards,
    listeners: Vec<(EventKind, ListenerId)>,
}

impl SolveCardSyncManager {
    pub fn new(bus: EventBus, scrambles: impl IntoIterator<Item = Scramble>) -> Self {
        let cards: Cards = Arc::new(RwLock::new(
            scrambles
                .into_iter()
                .map(|scramble| (scramble.id, SolveCard::from_scramble(&scramble)))
                .collect(),
        ));

        let mut listeners = Vec::new();
        for kind in [
            EventKind::Stopped,
            EventKind::SolveRecorded,
            EventKind::ScrambleAttached,
        ] {
            let cards = Arc::clone(&cards);
            let id = bus.register(kind, move |event| match event {
                TimerEvent::Stopped(payload) => apply_stop(&cards, payload),
                TimerEvent::SolveRecorded(record) => apply_record(&cards, record),
                TimerEvent::ScrambleAttached { scramble } => apply_attach(&cards, scramble),
                _ => {}
            });
            listeners.push((kind, id));
        }

        Self {
            bus,
            cards,
            listeners,
        }
    }

    pub fn card(&self, scramble_id: ScrambleId) -> Option<SolveCard> {
        self.cards.read().get(&scramble_id).cloned()
    }

    /// All cards, ordered by competition event and then by index.
    pub fn cards(&self) -> Vec<SolveCard> {
        let mut cards: Vec<SolveCard> = self.cards.read().values().cloned().collect();
        cards.sort_by_key(|card| (card.competition_event_id, card.index));
        cards
    }

    /// Stops following the bus. The cards keep their last state.
    pub fn detach(&self) {
        for (kind, id) in &self.listeners {
            self.bus.unregister(*kind, *id);
        }
    }
}

fn apply_stop(cards: &Cards, payload: &StopPayload) {
    let mut cards = cards.write();
    let Some(card) = cards.get_mut(&payload.scramble_id) else {
        debug!(scramble = %payload.scramble_id, "No card for stopped scramble.");
        return;
    };
    card.complete = true;
    card.active = false;
    card.time_text = Some(payload.display.to_string());
    card.centiseconds = Some(payload.elapsed);
}

fn apply_record(cards: &Cards, record: &SolveRecord) {
    let mut cards = cards.write();
    let Some(card) = cards.get_mut(&record.scramble_id) else {
        debug!(scramble = %record.scramble_id, "No card for recorded solve.");
        return;
    };
    card.complete = true;
    card.active = false;
    card.time_text = Some(record.display_text());
    card.centiseconds = Some(record.elapsed);
    card.penalty = record.penalty();
}

fn apply_attach(cards: &Cards, scramble: &Scramble) {
    let mut cards = cards.write();
    for card in cards.values_mut() {
        card.active = false;
    }
    cards
        .entry(scramble.id)
        .or_insert_with(|| SolveCard::from_scramble(scramble))
        .active = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT: CompetitionEventId = CompetitionEventId(1);

    fn scramble(id: u64, index: u32) -> Scramble {
        Scramble {
            id: ScrambleId(id),
            competition_event_id: EVENT,
            index,
            text: String::new(),
            complete: false,
        }
    }

    fn stopped(id: u64, centis: u64) -> TimerEvent {
        TimerEvent::Stopped(StopPayload {
            scramble_id: ScrambleId(id),
            competition_event_id: EVENT,
            elapsed: Centiseconds(centis),
            display: Centiseconds(centis).display(),
        })
    }

    #[test]
    fn stop_marks_the_card_complete_with_its_time() {
        let bus = EventBus::new();
        let manager = SolveCardSyncManager::new(bus.clone(), [scramble(1, 0), scramble(2, 1)]);
        bus.emit(&TimerEvent::ScrambleAttached {
            scramble: scramble(1, 0),
        });
        assert!(manager.card(ScrambleId(1)).unwrap().active);

        bus.emit(&stopped(1, 6550));

        let card = manager.card(ScrambleId(1)).unwrap();
        assert!(card.complete);
        assert!(!card.active);
        assert_eq!(card.time_text.as_deref(), Some("1:05.50"));
        assert_eq!(card.centiseconds, Some(Centiseconds(6550)));
        assert!(!manager.card(ScrambleId(2)).unwrap().complete);
    }

    #[test]
    fn only_the_attached_card_is_active() {
        let bus = EventBus::new();
        let manager = SolveCardSyncManager::new(bus.clone(), [scramble(1, 0), scramble(2, 1)]);
        bus.emit(&TimerEvent::ScrambleAttached {
            scramble: scramble(1, 0),
        });
        bus.emit(&TimerEvent::ScrambleAttached {
            scramble: scramble(2, 1),
        });

        let active: Vec<_> = manager
            .cards()
            .into_iter()
            .filter(|card| card.active)
            .map(|card| card.scramble_id)
            .collect();
        assert_eq!(active, vec![ScrambleId(2)]);
    }

    #[test]
    fn recorded_penalties_show_on_the_card() {
        let bus = EventBus::new();
        let manager = SolveCardSyncManager::new(bus.clone(), [scramble(1, 0)]);
        bus.emit(&TimerEvent::SolveRecorded(SolveRecord::with_penalty(
            ScrambleId(1),
            EVENT,
            Centiseconds(1000),
            Penalty::Dnf,
        )));

        let card = manager.card(ScrambleId(1)).unwrap();
        assert!(card.complete);
        assert_eq!(card.penalty, Penalty::Dnf);
        assert_eq!(card.time_text.as_deref(), Some("DNF"));
    }

    #[test]
    fn unknown_scrambles_are_ignored() {
        let bus = EventBus::new();
        let manager = SolveCardSyncManager::new(bus.clone(), [scramble(1, 0)]);
        bus.emit(&stopped(42, 100));
        assert_eq!(manager.cards().len(), 1);
        assert!(!manager.card(ScrambleId(1)).unwrap().complete);
    }

    #[test]
    fn reapplying_a_stop_is_idempotent() {
        let bus = EventBus::new();
        let manager = SolveCardSyncManager::new(bus.clone(), [scramble(1, 0)]);
        bus.emit(&stopped(1, 777));
        let first = manager.cards();
        bus.emit(&stopped(1, 777));
        assert_eq!(manager.cards(), first);
    }

    #[test]
    fn cards_are_ordered_by_index() {
        let bus = EventBus::new();
        let manager =
            SolveCardSyncManager::new(bus, [scramble(9, 2), scramble(3, 0), scramble(5, 1)]);
        let order: Vec<u32> = manager.cards().iter().map(|card| card.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
