//! # Solveclock
//!
//! An event-driven solve timer core for speedcubing competitions.
//!
//! Solveclock is the coordination layer behind a competition timing page: a
//! stopwatch bound to one scramble at a time, and a set of components that
//! react to it by recording the solve, moving on to the next scramble and
//! keeping the solve cards and displays up to date.
//!
//! ## Core Concepts
//!
//! - **EventBus**: A synchronous publish/subscribe dispatcher. Listeners are
//!   registered per `EventKind` and run in registration order.
//! - **TimerController**: `Idle -> Running -> Stopped`, bound to a scramble. It
//!   announces every lifecycle change on the bus and knows nothing about its
//!   listeners.
//! - **Managers**: The recorder, advancement, solve card and display
//!   components each hold a bus handle and react independently.
//! - **Configuration-Driven**: Tick rate, advancement trigger and scramble sets
//!   come from a `SolveclockConfig`, often loaded from a file.
//!
//! ## Example Usage
//!
//! ```rust
//! use solveclock::prelude::*;
//! use solveclock::time::ManualClock;
//! use std::sync::Arc;
//!
//! let bus = EventBus::new();
//! let clock = Arc::new(ManualClock::new());
//! let timer = TimerController::new(bus.clone(), clock.clone());
//!
//! bus.register(EventKind::Stopped, |event| {
//!     if let TimerEvent::Stopped(payload) = event {
//!         println!("Solved in {}", payload.display);
//!     }
//! });
//!
//! timer.attach_to_scramble(ScrambleId(1), CompetitionEventId(1));
//! timer.start();
//! clock.advance_centis(1234);
//! let payload = timer.stop().unwrap();
//! assert_eq!(payload.display.to_string(), "12.34");
//! ```

pub const ENGINE_NAME: &str = "Solveclock";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod bus;
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod entry;
pub mod events;
pub mod scramble;
pub mod solve;
pub mod time;

/// A prelude module for easy importing of the most common Solveclock types.
pub mod prelude {
    pub use crate::bus::EventBus;
    pub use crate::common::{CompetitionEventId, ListenerId, ScrambleId};
    pub use crate::components::advancement::{Advance, ScrambleAdvancementManager};
    pub use crate::components::display::{
        ScrambleDisplaySync, ScrambleView, Surface, TimerDisplaySync, TimerPhase, TimerView,
    };
    pub use crate::components::recorder::SolveRecorder;
    pub use crate::components::solve_card::{SolveCard, SolveCardSyncManager};
    pub use crate::components::timer::{RunState, TimerController};
    pub use crate::config::{AdvanceTrigger, ClockResolution, SolveclockConfig};
    pub use crate::engine::SolveclockEngine;
    pub use crate::events::{EventKind, StopPayload, SystemEvent, TimerEvent};
    pub use crate::scramble::{CompetitionEvent, Scramble, ScrambleBook, ScrambleQuery};
    pub use crate::solve::{Penalty, SolveRecord, SolveSink};
    pub use crate::time::{Centiseconds, Clock, SystemClock};
}
