//! Contains common, primitive id types.
//!
//! This module defines the basic ID types used to identify listeners, scrambles
//! and competition events. Using distinct types keeps a scramble id from ever
//! being passed where a competition event id is expected.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Uniquely and safely identifies a registered listener within an `EventBus`.
    ///
    /// This key is returned by `register` and `once`. It is guaranteed to be
    /// unique for the lifetime of the bus and will not be reused, so a stale id
    /// can never remove somebody else's listener.
    pub struct ListenerId;
}

/// Identifies a single scramble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScrambleId(pub u64);

/// Identifies a competition event (a puzzle discipline within a competition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompetitionEventId(pub u64);

impl fmt::Display for ScrambleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scramble#{}", self.0)
    }
}

impl fmt::Display for CompetitionEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}
