//! Turns timer stops and manual entries into solve records and hands them to the sink.

use crate::bus::EventBus;
use crate::common::{CompetitionEventId, ListenerId, ScrambleId};
use crate::entry::{parse_manual_time, EntryError};
use crate::events::{EventKind, TimerEvent};
use crate::solve::{Penalty, SolveRecord, SolveSink};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
struct RecorderCore {
    bus: EventBus,
    sink: Arc<dyn SolveSink>,
}

impl RecorderCore {
    fn submit(&self, record: SolveRecord) -> anyhow::Result<()> {
        if let Err(e) = self.sink.submit(&record) {
            warn!(
                scramble = %record.scramble_id,
                error = %e,
                "Solve was not accepted by the sink."
            );
            return Err(e);
        }
        info!(
            scramble = %record.scramble_id,
            time = %record.display_text(),
            "Solve recorded."
        );
        self.bus.emit(&TimerEvent::SolveRecorded(record));
        Ok(())
    }
}

/// Records solves.
///
/// Every `Stopped` event becomes a clean `SolveRecord`; manual entries go
/// through [`SolveRecorder::record_manual`]. A record the sink accepts is
/// re-announced as `SolveRecorded`; a rejected one is logged and goes no
/// further.
pub struct SolveRecorder {
    core: RecorderCore,
    listener: ListenerId,
}

impl SolveRecorder {
    pub fn new(bus: EventBus, sink: Arc<dyn SolveSink>) -> Self {
        let core = RecorderCore { bus, sink };
        let handle = core.clone();
        let listener = core.bus.register(EventKind::Stopped, move |event| {
            if let TimerEvent::Stopped(payload) = event {
                let record = SolveRecord::timed(
                    payload.scramble_id,
                    payload.competition_event_id,
                    payload.elapsed,
                );
                // Already logged; a stop has no caller to report to.
                let _ = handle.submit(record);
            }
        });
        Self { core, listener }
    }

    /// Records a time typed in by hand.
    ///
    /// Input that does not parse is rejected here: nothing reaches the sink and
    /// nothing is emitted. A record the sink refuses comes back as
    /// [`EntryError::Refused`], also without an event.
    pub fn record_manual(
        &self,
        scramble_id: ScrambleId,
        competition_event_id: CompetitionEventId,
        text: &str,
        penalty: Penalty,
    ) -> Result<SolveRecord, EntryError> {
        let elapsed = parse_manual_time(text)?;
        let record =
            SolveRecord::with_penalty(scramble_id, competition_event_id, elapsed, penalty);
        self.core
            .submit(record.clone())
            .map_err(|e| EntryError::Refused(e.to_string()))?;
        Ok(record)
    }

    /// Submits an already built record, e.g. a penalty correction.
    ///
    /// Returns whether the sink accepted it.
    pub fn submit(&self, record: SolveRecord) -> bool {
        self.core.submit(record).is_ok()
    }

    /// Stops listening for timer stops.
    pub fn detach(&self) {
        self.core.bus.unregister(EventKind::Stopped, self.listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Centiseconds;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MemorySink {
        accepted: Mutex<Vec<SolveRecord>>,
        refuse: bool,
    }

    impl SolveSink for MemorySink {
        fn submit(&self, record: &SolveRecord) -> anyhow::Result<()> {
            if self.refuse {
                anyhow::bail!("offline");
            }
            self.accepted.lock().push(record.clone());
            Ok(())
        }
    }

    fn recorded(bus: &EventBus) -> Arc<Mutex<Vec<SolveRecord>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        bus.register(EventKind::SolveRecorded, move |event| {
            if let TimerEvent::SolveRecorded(record) = event {
                sink.lock().push(record.clone());
            }
        });
        log
    }

    fn stop_event(centis: u64) -> TimerEvent {
        TimerEvent::Stopped(crate::events::StopPayload {
            scramble_id: ScrambleId(5),
            competition_event_id: CompetitionEventId(1),
            elapsed: Centiseconds(centis),
            display: Centiseconds(centis).display(),
        })
    }

    #[test]
    fn timer_stop_becomes_a_clean_record() {
        let bus = EventBus::new();
        let sink = Arc::new(MemorySink::default());
        let _recorder = SolveRecorder::new(bus.clone(), sink.clone());
        let log = recorded(&bus);

        bus.emit(&stop_event(1234));

        let accepted = sink.accepted.lock();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].scramble_id, ScrambleId(5));
        assert_eq!(accepted[0].competition_event_id, CompetitionEventId(1));
        assert_eq!(accepted[0].elapsed, Centiseconds(1234));
        assert!(!accepted[0].is_dnf && !accepted[0].is_plus_two);
        assert_eq!(*log.lock(), *accepted);
    }

    #[test]
    fn manual_entry_carries_penalties() {
        let bus = EventBus::new();
        let sink = Arc::new(MemorySink::default());
        let recorder = SolveRecorder::new(bus.clone(), sink.clone());
        let log = recorded(&bus);

        let record = recorder
            .record_manual(ScrambleId(9), CompetitionEventId(1), "1:05.50", Penalty::PlusTwo)
            .unwrap();

        assert_eq!(record.elapsed, Centiseconds(6550));
        assert!(record.is_plus_two);
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn bad_manual_entry_submits_and_emits_nothing() {
        let bus = EventBus::new();
        let sink = Arc::new(MemorySink::default());
        let recorder = SolveRecorder::new(bus.clone(), sink.clone());
        let log = recorded(&bus);

        let result =
            recorder.record_manual(ScrambleId(9), CompetitionEventId(1), "12,5", Penalty::None);

        assert_eq!(result, Err(EntryError::InvalidCharacter(',')));
        assert!(sink.accepted.lock().is_empty());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn refused_records_are_not_announced() {
        let bus = EventBus::new();
        let sink = Arc::new(MemorySink {
            refuse: true,
            ..Default::default()
        });
        let recorder = SolveRecorder::new(bus.clone(), sink);
        let log = recorded(&bus);

        bus.emit(&stop_event(500));
        assert!(!recorder.submit(SolveRecord::timed(
            ScrambleId(5),
            CompetitionEventId(1),
            Centiseconds(500)
        )));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn refused_manual_entry_is_an_error() {
        let bus = EventBus::new();
        let sink = Arc::new(MemorySink {
            refuse: true,
            ..Default::default()
        });
        let recorder = SolveRecorder::new(bus.clone(), sink.clone());
        let log = recorded(&bus);

        let result =
            recorder.record_manual(ScrambleId(9), CompetitionEventId(1), "12.34", Penalty::None);

        assert_eq!(result, Err(EntryError::Refused("offline".to_string())));
        assert!(sink.accepted.lock().is_empty());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn detached_recorder_ignores_stops() {
        let bus = EventBus::new();
        let sink = Arc::new(MemorySink::default());
        let recorder = SolveRecorder::new(bus.clone(), sink.clone());
        recorder.detach();

        bus.emit(&stop_event(500));
        assert!(sink.accepted.lock().is_empty());
    }
}
