//! Moves the timer on to the next incomplete scramble after each solve.

use crate::bus::EventBus;
use crate::common::{CompetitionEventId, ListenerId, ScrambleId};
use crate::components::timer::TimerController;
use crate::config::AdvanceTrigger;
use crate::events::{EventKind, TimerEvent};
use crate::scramble::{Scramble, ScrambleQuery};
use std::sync::Arc;
use tracing::{debug, info};

/// What an advancement attempt ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The timer is now bound to this scramble.
    Attached(Scramble),
    /// The competition event has no incomplete scramble left.
    Exhausted,
    /// A scramble was found but the timer refused the attach (it is running).
    Rejected,
}

#[derive(Clone)]
struct AdvancementCore {
    bus: EventBus,
    timer: TimerController,
    scrambles: Arc<dyn ScrambleQuery>,
}

impl AdvancementCore {
    fn advance(
        &self,
        competition_event_id: CompetitionEventId,
        completed: Option<ScrambleId>,
    ) -> Advance {
        let Some(scramble) = self.scrambles.next_incomplete(competition_event_id, completed)
        else {
            info!(event = %competition_event_id, "No incomplete scramble left.");
            self.bus
                .emit(&TimerEvent::NothingToAttach { competition_event_id });
            return Advance::Exhausted;
        };

        if !self
            .timer
            .attach_to_scramble(scramble.id, competition_event_id)
        {
            debug!(scramble = %scramble.id, "Timer refused the next scramble.");
            return Advance::Rejected;
        }
        info!(scramble = %scramble.id, index = scramble.index, "Next scramble attached.");
        self.bus.emit(&TimerEvent::ScrambleAttached {
            scramble: scramble.clone(),
        });
        Advance::Attached(scramble)
    }
}

/// The scramble advancement manager.
///
/// Listens for finished solves (either `SolveRecorded` or, in the per-page
/// variant, `Stopped`), asks the scramble query for the lowest-index
/// incomplete scramble other than the one just solved, attaches the timer to
/// it and announces `ScrambleAttached`. When nothing is left it announces
/// `NothingToAttach` instead and leaves the timer alone.
pub struct ScrambleAdvancementManager {
    core: AdvancementCore,
    trigger: AdvanceTrigger,
    listener: ListenerId,
}

impl ScrambleAdvancementManager {
    pub fn new(
        bus: EventBus,
        timer: TimerController,
        scrambles: Arc<dyn ScrambleQuery>,
        trigger: AdvanceTrigger,
    ) -> Self {
        let core = AdvancementCore {
            bus,
            timer,
            scrambles,
        };
        let handle = core.clone();
        let kind = trigger_kind(trigger);
        let listener = core.bus.register(kind, move |event| {
            let finished = match event {
                TimerEvent::SolveRecorded(record) => {
                    Some((record.competition_event_id, record.scramble_id))
                }
                TimerEvent::Stopped(payload) => {
                    Some((payload.competition_event_id, payload.scramble_id))
                }
                _ => None,
            };
            if let Some((competition_event_id, scramble_id)) = finished {
                handle.advance(competition_event_id, Some(scramble_id));
            }
        });
        Self {
            core,
            trigger,
            listener,
        }
    }

    /// Attaches the first incomplete scramble of a competition event, to begin a round.
    pub fn attach_first(&self, competition_event_id: CompetitionEventId) -> Advance {
        self.core.advance(competition_event_id, None)
    }

    pub fn trigger(&self) -> AdvanceTrigger {
        self.trigger
    }

    /// Stops reacting to finished solves.
    pub fn detach(&self) {
        self.core
            .bus
            .unregister(trigger_kind(self.trigger), self.listener);
    }
}

fn trigger_kind(trigger: AdvanceTrigger) -> EventKind {
    match trigger {
        AdvanceTrigger::SolveRecorded => EventKind::SolveRecorded,
        AdvanceTrigger::TimerStop => EventKind::Stopped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::timer::RunState;
    use crate::scramble::{CompetitionEvent, ScrambleBook};
    use crate::solve::SolveRecord;
    use crate::time::{Centiseconds, ManualClock};
    use parking_lot::Mutex;

    const EVENT: CompetitionEventId = CompetitionEventId(1);

    struct Fixture {
        bus: EventBus,
        timer: TimerController,
        manager: ScrambleAdvancementManager,
        events: Arc<Mutex<Vec<TimerEvent>>>,
    }

    fn fixture(complete: [bool; 3], trigger: AdvanceTrigger) -> Fixture {
        let scrambles = (0..3)
            .map(|index| Scramble {
                id: ScrambleId(100 + index as u64),
                competition_event_id: EVENT,
                index,
                text: format!("scramble {index}"),
                complete: complete[index as usize],
            })
            .rev()
            .collect();
        let book = ScrambleBook::from_events([CompetitionEvent {
            id: EVENT,
            name: "3x3x3".to_string(),
            scrambles,
        }]);
        let bus = EventBus::new();
        let timer = TimerController::new(bus.clone(), Arc::new(ManualClock::new()));
        let manager = ScrambleAdvancementManager::new(
            bus.clone(),
            timer.clone(),
            Arc::new(book),
            trigger,
        );
        let events = Arc::new(Mutex::new(Vec::new()));
        for kind in [EventKind::ScrambleAttached, EventKind::NothingToAttach] {
            let sink = Arc::clone(&events);
            bus.register(kind, move |event| sink.lock().push(event.clone()));
        }
        Fixture {
            bus,
            timer,
            manager,
            events,
        }
    }

    fn solved(scramble: u64) -> TimerEvent {
        TimerEvent::SolveRecorded(SolveRecord::timed(
            ScrambleId(scramble),
            EVENT,
            Centiseconds(1000),
        ))
    }

    fn attached_ids(events: &[TimerEvent]) -> Vec<ScrambleId> {
        events
            .iter()
            .filter_map(|event| match event {
                TimerEvent::ScrambleAttached { scramble } => Some(scramble.id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn next_scramble_is_the_lowest_incomplete_index() {
        let f = fixture([true, false, false], AdvanceTrigger::SolveRecorded);
        f.timer.attach_to_scramble(ScrambleId(100), EVENT);

        f.bus.emit(&solved(100));

        assert_eq!(f.timer.binding().unwrap().scramble_id, ScrambleId(101));
        assert_eq!(attached_ids(&f.events.lock()), vec![ScrambleId(101)]);
    }

    #[test]
    fn exhausted_event_reports_nothing_to_attach() {
        let f = fixture([true, true, true], AdvanceTrigger::SolveRecorded);
        f.timer.attach_to_scramble(ScrambleId(102), EVENT);

        f.bus.emit(&solved(102));

        assert_eq!(
            *f.events.lock(),
            vec![TimerEvent::NothingToAttach {
                competition_event_id: EVENT
            }]
        );
        assert_eq!(f.timer.binding().unwrap().scramble_id, ScrambleId(102));
    }

    #[test]
    fn just_completed_scramble_is_never_reattached() {
        let f = fixture([false, false, true], AdvanceTrigger::SolveRecorded);
        f.bus.emit(&solved(100));
        assert_eq!(f.timer.binding().unwrap().scramble_id, ScrambleId(101));
    }

    #[test]
    fn timer_stop_trigger_advances_directly() {
        let f = fixture([false, false, false], AdvanceTrigger::TimerStop);
        f.timer.attach_to_scramble(ScrambleId(100), EVENT);
        f.timer.start();
        f.timer.stop();

        assert_eq!(f.timer.state(), RunState::Idle);
        assert_eq!(f.timer.binding().unwrap().scramble_id, ScrambleId(101));

        // Solve records are not this manager's trigger in this mode.
        f.bus.emit(&solved(101));
        assert_eq!(attached_ids(&f.events.lock()), vec![ScrambleId(101)]);
    }

    #[test]
    fn running_timer_is_not_rebound() {
        let f = fixture([false, false, false], AdvanceTrigger::SolveRecorded);
        f.timer.attach_to_scramble(ScrambleId(102), EVENT);
        f.timer.start();

        f.bus.emit(&solved(100));

        assert_eq!(f.timer.binding().unwrap().scramble_id, ScrambleId(102));
        assert!(f.events.lock().is_empty());
        assert_eq!(f.manager.attach_first(EVENT), Advance::Rejected);
    }

    #[test]
    fn attach_first_starts_a_round() {
        let f = fixture([true, false, false], AdvanceTrigger::SolveRecorded);
        let outcome = f.manager.attach_first(EVENT);
        assert!(matches!(outcome, Advance::Attached(ref s) if s.id == ScrambleId(101)));
        assert_eq!(f.timer.binding().unwrap().scramble_id, ScrambleId(101));
    }

    #[test]
    fn detached_manager_stops_advancing() {
        let f = fixture([false, false, false], AdvanceTrigger::SolveRecorded);
        f.manager.detach();
        f.bus.emit(&solved(100));
        assert!(f.timer.binding().is_none());
    }
}
