//! Time units, the display formatting law, and the clock sources that feed the timer.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::time::{Duration, Instant};

const CENTIS_PER_SECOND: u64 = 100;
const CENTIS_PER_MINUTE: u64 = 60 * CENTIS_PER_SECOND;
const CENTIS_PER_HOUR: u64 = 60 * CENTIS_PER_MINUTE;

/// Elapsed time in hundredths of a second, the base unit of every recorded solve.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Centiseconds(pub u64);

impl Centiseconds {
    pub const ZERO: Centiseconds = Centiseconds(0);

    /// Truncates a `Duration` down to whole centiseconds.
    pub fn from_duration(duration: Duration) -> Self {
        Self((duration.as_millis() / 10) as u64)
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.0 * 10)
    }

    /// Splits this value into its human-readable fields.
    pub fn display(self) -> TimeDisplay {
        TimeDisplay::from(self)
    }
}

impl Add for Centiseconds {
    type Output = Centiseconds;

    fn add(self, rhs: Centiseconds) -> Centiseconds {
        Centiseconds(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Centiseconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.display().fmt(f)
    }
}

/// The human-readable split of an elapsed time.
///
/// Higher units collapse away when they are zero: `1:02:05.00` with hours,
/// `1:05.50` with minutes, `5.50` below a minute. The whole part and the
/// centisecond part are exposed separately because surfaces render them as
/// two fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDisplay {
    pub hours: u64,
    pub minutes: u8,
    pub seconds: u8,
    pub centiseconds: u8,
}

impl TimeDisplay {
    /// The whole-seconds field, e.g. `1:05` for 6550 cs.
    pub fn whole_text(&self) -> String {
        if self.hours > 0 {
            format!("{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
        } else if self.minutes > 0 {
            format!("{}:{:02}", self.minutes, self.seconds)
        } else {
            self.seconds.to_string()
        }
    }

    /// The fractional field, always two digits.
    pub fn fraction_text(&self) -> String {
        format!("{:02}", self.centiseconds)
    }
}

impl From<Centiseconds> for TimeDisplay {
    fn from(value: Centiseconds) -> Self {
        let total = value.0;
        Self {
            hours: total / CENTIS_PER_HOUR,
            minutes: ((total % CENTIS_PER_HOUR) / CENTIS_PER_MINUTE) as u8,
            seconds: ((total % CENTIS_PER_MINUTE) / CENTIS_PER_SECOND) as u8,
            centiseconds: (total % CENTIS_PER_SECOND) as u8,
        }
    }
}

impl fmt::Display for TimeDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.whole_text(), self.fraction_text())
    }
}

/// A monotonic time source sampled by the `TimerController`.
///
/// Only differences between readings are meaningful.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// The wall clock, measured from the moment the clock was created.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Used by tests and the scripted dev run.
#[derive(Debug, Default)]
pub struct ManualClock {
    current: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.current.lock() += by;
    }

    pub fn advance_centis(&self, by: u64) {
        self.advance(Centiseconds(by).as_duration());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.current.lock()
    }
}
