//! Defines all configuration structures for Solveclock.
//!
//! These structs are deserialized with `serde` through the `config` crate, so
//! the tick rate, the advancement trigger and the scramble sets for a round can
//! come from a TOML file and be overridden from `SOLVECLOCK_*` environment
//! variables.

use crate::scramble::CompetitionEvent;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// The top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SolveclockConfig {
    /// How often a running timer emits interval events.
    #[serde(default = "default_resolution")]
    pub resolution: ClockResolution,

    /// Which event moves the timer on to the next scramble.
    #[serde(default)]
    pub advance_on: AdvanceTrigger,

    /// The competition events and scrambles available to the round.
    #[serde(default)]
    pub competition_events: Vec<CompetitionEvent>,
}

/// Defines the interval tick rate of a running timer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockResolution {
    /// 100 ticks per second; every centisecond is shown.
    High,
    /// ~30 ticks per second. Smooth enough for a live display.
    Medium,
    /// 10 ticks per second. Only tenths visibly change.
    Low,
    /// A user-defined speed in ticks per second.
    Custom { ticks_per_second: u64 },
}

impl ClockResolution {
    /// The period between interval ticks.
    pub fn interval(&self) -> Duration {
        let ticks_per_second = match self {
            ClockResolution::High => 100,
            ClockResolution::Medium => 30,
            ClockResolution::Low => 10,
            ClockResolution::Custom { ticks_per_second } => (*ticks_per_second).max(1),
        };
        Duration::from_micros(1_000_000 / ticks_per_second)
    }
}

/// The event the advancement manager reacts to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceTrigger {
    /// Advance once the solve has been accepted by the sink.
    #[default]
    SolveRecorded,
    /// Advance as soon as the timer stops, without waiting for persistence.
    TimerStop,
}

impl SolveclockConfig {
    /// Loads configuration from an optional TOML file, then `SOLVECLOCK_*` environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let config = builder
            .add_source(Environment::with_prefix("SOLVECLOCK").separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

// --- Default value functions for serde ---

fn default_resolution() -> ClockResolution {
    ClockResolution::Medium
}

impl Default for SolveclockConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            advance_on: AdvanceTrigger::default(),
            competition_events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{CompetitionEventId, ScrambleId};

    #[test]
    fn empty_document_uses_defaults() {
        let config = SolveclockConfig::from_toml_str("").unwrap();
        assert_eq!(config.resolution, ClockResolution::Medium);
        assert_eq!(config.advance_on, AdvanceTrigger::SolveRecorded);
        assert!(config.competition_events.is_empty());
    }

    #[test]
    fn full_document_deserializes() {
        let text = r#"
            resolution = "high"
            advance_on = "timer_stop"

            [[competition_events]]
            id = 3
            name = "2x2x2"

            [[competition_events.scrambles]]
            id = 31
            competition_event_id = 3
            index = 0
            text = "R U2 F'"

            [[competition_events.scrambles]]
            id = 32
            competition_event_id = 3
            index = 1
            text = "U R' F2"
            complete = true
        "#;
        let config = SolveclockConfig::from_toml_str(text).unwrap();
        assert_eq!(config.resolution, ClockResolution::High);
        assert_eq!(config.advance_on, AdvanceTrigger::TimerStop);

        let event = &config.competition_events[0];
        assert_eq!(event.id, CompetitionEventId(3));
        assert_eq!(event.scrambles.len(), 2);
        assert_eq!(event.scrambles[1].id, ScrambleId(32));
        assert!(!event.scrambles[0].complete);
        assert!(event.scrambles[1].complete);
    }

    #[test]
    fn resolution_maps_to_tick_period() {
        assert_eq!(ClockResolution::High.interval(), Duration::from_millis(10));
        assert_eq!(ClockResolution::Low.interval(), Duration::from_millis(100));
        assert_eq!(
            ClockResolution::Custom { ticks_per_second: 0 }.interval(),
            Duration::from_secs(1)
        );
    }
}
