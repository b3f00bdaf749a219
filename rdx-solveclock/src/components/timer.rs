//! The stopwatch state machine bound to one scramble at a time.

use crate::bus::EventBus;
use crate::common::{CompetitionEventId, ScrambleId};
use crate::events::{StopPayload, SystemEvent, TimerEvent};
use crate::time::{Centiseconds, Clock};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// The run state of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Running,
    Stopped,
}

/// The operations a caller can ask of the timer, named in rejection diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerOperation {
    Attach,
    Start,
    Stop,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// The scramble the timer is currently timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub scramble_id: ScrambleId,
    pub competition_event_id: CompetitionEventId,
}

/// A point-in-time view of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub state: RunState,
    pub binding: Option<Binding>,
    pub elapsed: Centiseconds,
}

struct TimerState {
    run: RunState,
    binding: Option<Binding>,
    started_at: Duration,
    elapsed: Centiseconds,
}

/// The timer controller.
///
/// `Idle -> Running -> Stopped -> Idle` (the last step happens on the next
/// attach). Every lifecycle change is announced on the bus; the controller
/// never knows who is listening. Operations that are invalid in the current
/// state are ignored and reported only on the bus's diagnostics stream.
///
/// Cloning yields another handle to the same timer, which is how listeners
/// (the advancement manager, the interval driver) get to drive it.
#[derive(Clone)]
pub struct TimerController {
    bus: EventBus,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<TimerState>>,
}

impl TimerController {
    pub fn new(bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            bus,
            clock,
            state: Arc::new(Mutex::new(TimerState {
                run: RunState::Idle,
                binding: None,
                started_at: Duration::ZERO,
                elapsed: Centiseconds::ZERO,
            })),
        }
    }

    /// Binds the timer to a scramble and resets it to `Idle`.
    ///
    /// Ignored while running. Returns whether the binding changed hands.
    pub fn attach_to_scramble(
        &self,
        scramble_id: ScrambleId,
        competition_event_id: CompetitionEventId,
    ) -> bool {
        {
            let mut state = self.state.lock();
            if state.run != RunState::Running {
                state.binding = Some(Binding {
                    scramble_id,
                    competition_event_id,
                });
                state.run = RunState::Idle;
                state.elapsed = Centiseconds::ZERO;
                debug!(scramble = %scramble_id, "Timer attached.");
                return true;
            }
        }
        self.reject(TimerOperation::Attach, RunState::Running);
        false
    }

    /// Starts timing the bound scramble. Only valid from `Idle` with a binding.
    pub fn start(&self) -> bool {
        let event = {
            let mut state = self.state.lock();
            match (state.run, state.binding) {
                (RunState::Idle, Some(binding)) => {
                    state.run = RunState::Running;
                    state.started_at = self.clock.now();
                    state.elapsed = Centiseconds::ZERO;
                    Some(TimerEvent::Started {
                        scramble_id: binding.scramble_id,
                        competition_event_id: binding.competition_event_id,
                    })
                }
                _ => None,
            }
        };
        match event {
            Some(event) => {
                info!(scramble = ?self.binding().map(|b| b.scramble_id), "Timer started.");
                self.bus.emit(&event);
                true
            }
            None => {
                self.reject(TimerOperation::Start, self.state());
                false
            }
        }
    }

    /// Emits an interval event with the running time. Does nothing unless running.
    ///
    /// Called periodically by whatever samples the clock, usually
    /// [`TimerController::run_interval_driver`].
    pub fn tick(&self) {
        let elapsed = {
            let mut state = self.state.lock();
            if state.run != RunState::Running {
                return;
            }
            state.elapsed = self.elapsed_since(state.started_at);
            state.elapsed
        };
        trace!(elapsed = elapsed.0, "Timer interval.");
        self.bus.emit(&TimerEvent::Interval {
            elapsed,
            display: elapsed.display(),
        });
    }

    /// Stops the timer and announces the final time. Only valid while running.
    pub fn stop(&self) -> Option<StopPayload> {
        let payload = {
            let mut state = self.state.lock();
            match (state.run, state.binding) {
                (RunState::Running, Some(binding)) => {
                    state.run = RunState::Stopped;
                    state.elapsed = self.elapsed_since(state.started_at);
                    Some(StopPayload {
                        scramble_id: binding.scramble_id,
                        competition_event_id: binding.competition_event_id,
                        elapsed: state.elapsed,
                        display: state.elapsed.display(),
                    })
                }
                _ => None,
            }
        };
        match payload {
            Some(payload) => {
                info!(
                    scramble = %payload.scramble_id,
                    time = %payload.display,
                    "Timer stopped."
                );
                self.bus.emit(&TimerEvent::Stopped(payload));
                Some(payload)
            }
            None => {
                self.reject(TimerOperation::Stop, self.state());
                None
            }
        }
    }

    pub fn state(&self) -> RunState {
        self.state.lock().run
    }

    pub fn binding(&self) -> Option<Binding> {
        self.state.lock().binding
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let state = self.state.lock();
        TimerSnapshot {
            state: state.run,
            binding: state.binding,
            elapsed: state.elapsed,
        }
    }

    /// Calls [`TimerController::tick`] every `period` until a shutdown signal arrives.
    pub async fn run_interval_driver(
        self,
        period: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        debug!(?period, "Interval driver started.");
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => self.tick(),
            }
        }
        debug!("Interval driver stopped.");
    }

    fn elapsed_since(&self, started_at: Duration) -> Centiseconds {
        Centiseconds::from_duration(self.clock.now().saturating_sub(started_at))
    }

    fn reject(&self, operation: TimerOperation, state: RunState) {
        debug!(?operation, %state, "Ignoring timer operation that is invalid in this state.");
        self.bus
            .publish_system_event(SystemEvent::TransitionRejected { operation, state });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::time::ManualClock;

    fn setup() -> (EventBus, Arc<ManualClock>, TimerController) {
        let bus = EventBus::new();
        let clock = Arc::new(ManualClock::new());
        let timer = TimerController::new(bus.clone(), clock.clone());
        (bus, clock, timer)
    }

    fn capture(bus: &EventBus, kind: EventKind) -> Arc<Mutex<Vec<TimerEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        bus.register(kind, move |event| sink.lock().push(event.clone()));
        log
    }

    #[test]
    fn start_then_stop_reports_the_elapsed_time() {
        let (bus, clock, timer) = setup();
        let stops = capture(&bus, EventKind::Stopped);
        timer.attach_to_scramble(ScrambleId(1), CompetitionEventId(7));

        assert!(timer.start());
        clock.advance_centis(6550);
        let payload = timer.stop().unwrap();

        assert_eq!(payload.elapsed, Centiseconds(6550));
        assert_eq!(payload.display.whole_text(), "1:05");
        assert_eq!(payload.display.fraction_text(), "50");
        assert_eq!(payload.scramble_id, ScrambleId(1));
        assert_eq!(payload.competition_event_id, CompetitionEventId(7));
        assert_eq!(*stops.lock(), vec![TimerEvent::Stopped(payload)]);
        assert_eq!(timer.state(), RunState::Stopped);
    }

    #[test]
    fn attach_while_running_changes_nothing() {
        let (bus, clock, timer) = setup();
        let mut system_rx = bus.subscribe_system_events();
        timer.attach_to_scramble(ScrambleId(1), CompetitionEventId(7));
        timer.start();
        clock.advance_centis(120);
        let before = timer.snapshot();

        assert!(!timer.attach_to_scramble(ScrambleId(2), CompetitionEventId(7)));
        assert_eq!(timer.snapshot(), before);
        assert_eq!(timer.state(), RunState::Running);
        assert_eq!(timer.binding().unwrap().scramble_id, ScrambleId(1));

        let mut rejected = None;
        while let Ok(event) = system_rx.try_recv() {
            if let SystemEvent::TransitionRejected { operation, state } = event {
                rejected = Some((operation, state));
            }
        }
        assert_eq!(rejected, Some((TimerOperation::Attach, RunState::Running)));
    }

    #[test]
    fn invalid_transitions_emit_nothing() {
        let (bus, _clock, timer) = setup();
        let starts = capture(&bus, EventKind::Started);
        let stops = capture(&bus, EventKind::Stopped);

        assert!(!timer.start(), "no binding yet");
        assert!(timer.stop().is_none(), "not running");

        timer.attach_to_scramble(ScrambleId(1), CompetitionEventId(7));
        timer.start();
        assert!(!timer.start(), "already running");
        timer.stop();
        assert!(!timer.start(), "stopped needs a fresh attach");
        assert!(timer.stop().is_none());

        assert_eq!(starts.lock().len(), 1);
        assert_eq!(stops.lock().len(), 1);
    }

    #[test]
    fn attach_after_stop_resets_to_idle() {
        let (_bus, clock, timer) = setup();
        timer.attach_to_scramble(ScrambleId(1), CompetitionEventId(7));
        timer.start();
        clock.advance_centis(900);
        timer.stop();

        assert!(timer.attach_to_scramble(ScrambleId(2), CompetitionEventId(7)));
        let snapshot = timer.snapshot();
        assert_eq!(snapshot.state, RunState::Idle);
        assert_eq!(snapshot.elapsed, Centiseconds::ZERO);
        assert_eq!(snapshot.binding.unwrap().scramble_id, ScrambleId(2));
    }

    #[test]
    fn ticks_only_emit_while_running() {
        let (bus, clock, timer) = setup();
        let intervals = capture(&bus, EventKind::Interval);
        timer.attach_to_scramble(ScrambleId(1), CompetitionEventId(7));

        timer.tick();
        timer.start();
        clock.advance_centis(25);
        timer.tick();
        clock.advance_centis(25);
        timer.tick();
        timer.stop();
        timer.tick();

        let elapsed: Vec<u64> = intervals
            .lock()
            .iter()
            .filter_map(|event| match event {
                TimerEvent::Interval { elapsed, .. } => Some(elapsed.0),
                _ => None,
            })
            .collect();
        assert_eq!(elapsed, vec![25, 50]);
    }

    #[test]
    fn a_stop_listener_can_reattach_the_timer() {
        let (bus, _clock, timer) = setup();
        let handle = timer.clone();
        bus.register(EventKind::Stopped, move |_| {
            handle.attach_to_scramble(ScrambleId(2), CompetitionEventId(7));
        });
        timer.attach_to_scramble(ScrambleId(1), CompetitionEventId(7));
        timer.start();
        timer.stop();

        assert_eq!(timer.state(), RunState::Idle);
        assert_eq!(timer.binding().unwrap().scramble_id, ScrambleId(2));
    }

    #[tokio::test]
    async fn interval_driver_ticks_until_shutdown() {
        let bus = EventBus::new();
        let timer = TimerController::new(bus.clone(), Arc::new(crate::time::SystemClock::new()));
        let intervals = capture(&bus, EventKind::Interval);
        timer.attach_to_scramble(ScrambleId(1), CompetitionEventId(7));
        timer.start();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let driver = tokio::spawn(
            timer
                .clone()
                .run_interval_driver(Duration::from_millis(5), shutdown_rx),
        );
        tokio::time::sleep(Duration::from_millis(40)).await;
        shutdown_tx.send(()).unwrap();
        driver.await.unwrap();

        assert!(!intervals.lock().is_empty());
    }
}
