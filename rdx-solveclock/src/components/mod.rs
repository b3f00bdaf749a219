//! Contains the components that react to the bus.
//!
//! The `TimerController` produces lifecycle events; every other component
//! consumes them and may announce derived events of its own. Each one is built
//! with a cloned `EventBus` handle and never holds a reference to another
//! listener.

pub mod advancement;
pub mod display;
pub mod recorder;
pub mod solve_card;
pub mod timer;
