//! Defines all public event types carried by the Solveclock event bus.
//!
//! This module is the binding contract between the timer and the components
//! that react to it. Every event kind is a variant of a closed enumeration and
//! carries its own typed payload, so a listener can never subscribe to a
//! misspelled name or misread a payload field.

use crate::common::{CompetitionEventId, ListenerId, ScrambleId};
use crate::components::timer::{RunState, TimerOperation};
use crate::scramble::Scramble;
use crate::solve::SolveRecord;
use crate::time::{Centiseconds, TimeDisplay};
use serde::Serialize;
use std::fmt;

/// The registry partition a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Started,
    Interval,
    Stopped,
    SolveRecorded,
    ScrambleAttached,
    NothingToAttach,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Started,
        EventKind::Interval,
        EventKind::Stopped,
        EventKind::SolveRecorded,
        EventKind::ScrambleAttached,
        EventKind::NothingToAttach,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EventKind::Started => "started",
            EventKind::Interval => "interval",
            EventKind::Stopped => "stopped",
            EventKind::SolveRecorded => "solve-recorded",
            EventKind::ScrambleAttached => "scramble-attached",
            EventKind::NothingToAttach => "nothing-to-attach",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An event emitted on the bus, one variant per `EventKind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerEvent {
    /// The timer began running against its bound scramble.
    Started {
        scramble_id: ScrambleId,
        competition_event_id: CompetitionEventId,
    },
    /// Periodic progress while the timer is running.
    Interval {
        elapsed: Centiseconds,
        display: TimeDisplay,
    },
    /// The timer stopped; carries the final time and the binding it was timed against.
    Stopped(StopPayload),
    /// A solve record was accepted by the persistence collaborator.
    SolveRecorded(SolveRecord),
    /// The timer was attached to a new scramble.
    ScrambleAttached { scramble: Scramble },
    /// The competition event has no incomplete scramble left to attach.
    NothingToAttach {
        competition_event_id: CompetitionEventId,
    },
}

impl TimerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TimerEvent::Started { .. } => EventKind::Started,
            TimerEvent::Interval { .. } => EventKind::Interval,
            TimerEvent::Stopped(_) => EventKind::Stopped,
            TimerEvent::SolveRecorded(_) => EventKind::SolveRecorded,
            TimerEvent::ScrambleAttached { .. } => EventKind::ScrambleAttached,
            TimerEvent::NothingToAttach { .. } => EventKind::NothingToAttach,
        }
    }
}

/// The payload of `TimerEvent::Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StopPayload {
    pub scramble_id: ScrambleId,
    pub competition_event_id: CompetitionEventId,
    pub elapsed: Centiseconds,
    pub display: TimeDisplay,
}

/// Diagnostics about the bus and the timer itself.
///
/// These never change behavior: misuse stays a silent no-op for callers, and
/// this stream only lets an observer see that it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    /// A listener was registered.
    ListenerAdded { id: ListenerId, kind: EventKind },
    /// A listener was removed by `unregister`, `once`, or `clear`.
    ListenerRemoved { id: ListenerId, kind: EventKind },
    /// `unregister` named a listener that is not registered under that kind.
    UnknownListener { id: ListenerId, kind: EventKind },
    /// The timer ignored an operation that is not valid in its current state.
    TransitionRejected {
        operation: TimerOperation,
        state: RunState,
    },
}
