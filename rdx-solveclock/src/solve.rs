//! Solve records and the persistence collaborator that accepts them.

use crate::common::{CompetitionEventId, ScrambleId};
use crate::entry::EntryError;
use crate::time::Centiseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const PLUS_TWO: Centiseconds = Centiseconds(200);

/// A penalty applied to a solve by the judge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    #[default]
    None,
    PlusTwo,
    Dnf,
}

impl FromStr for Penalty {
    type Err = EntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "ok" | "none" => Ok(Penalty::None),
            "+2" | "plus2" | "plustwo" => Ok(Penalty::PlusTwo),
            "dnf" => Ok(Penalty::Dnf),
            other => Err(EntryError::UnknownPenalty(other.to_string())),
        }
    }
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Penalty::None => f.write_str("none"),
            Penalty::PlusTwo => f.write_str("+2"),
            Penalty::Dnf => f.write_str("DNF"),
        }
    }
}

/// The recorded outcome of one scramble, in the shape the persistence layer accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveRecord {
    pub scramble_id: ScrambleId,
    pub competition_event_id: CompetitionEventId,
    pub is_dnf: bool,
    pub is_plus_two: bool,
    /// The raw time as measured or typed, before any penalty.
    pub elapsed: Centiseconds,
    pub recorded_at: DateTime<Utc>,
}

impl SolveRecord {
    /// A clean solve straight off the timer.
    pub fn timed(
        scramble_id: ScrambleId,
        competition_event_id: CompetitionEventId,
        elapsed: Centiseconds,
    ) -> Self {
        Self::with_penalty(scramble_id, competition_event_id, elapsed, Penalty::None)
    }

    pub fn with_penalty(
        scramble_id: ScrambleId,
        competition_event_id: CompetitionEventId,
        elapsed: Centiseconds,
        penalty: Penalty,
    ) -> Self {
        Self {
            scramble_id,
            competition_event_id,
            is_dnf: penalty == Penalty::Dnf,
            is_plus_two: penalty == Penalty::PlusTwo,
            elapsed,
            recorded_at: Utc::now(),
        }
    }

    pub fn penalty(&self) -> Penalty {
        if self.is_dnf {
            Penalty::Dnf
        } else if self.is_plus_two {
            Penalty::PlusTwo
        } else {
            Penalty::None
        }
    }

    /// The time that counts for results; `None` for a DNF.
    pub fn effective_time(&self) -> Option<Centiseconds> {
        match self.penalty() {
            Penalty::Dnf => None,
            Penalty::PlusTwo => Some(self.elapsed + PLUS_TWO),
            Penalty::None => Some(self.elapsed),
        }
    }

    /// The text a solve card shows: `DNF`, `12.34+` for a +2, or the plain time.
    pub fn display_text(&self) -> String {
        match self.effective_time() {
            None => "DNF".to_string(),
            Some(time) if self.is_plus_two => format!("{time}+"),
            Some(time) => time.to_string(),
        }
    }
}

/// Accepts finished solve records. Transport and retries are the implementor's concern.
pub trait SolveSink: Send + Sync {
    fn submit(&self, record: &SolveRecord) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(penalty: Penalty) -> SolveRecord {
        SolveRecord::with_penalty(
            ScrambleId(4),
            CompetitionEventId(2),
            Centiseconds(1234),
            penalty,
        )
    }

    #[test]
    fn penalty_flags_follow_the_penalty() {
        let plus_two = record(Penalty::PlusTwo);
        assert!(plus_two.is_plus_two && !plus_two.is_dnf);
        assert_eq!(plus_two.penalty(), Penalty::PlusTwo);

        let dnf = record(Penalty::Dnf);
        assert!(dnf.is_dnf && !dnf.is_plus_two);
        assert_eq!(record(Penalty::None).penalty(), Penalty::None);
    }

    #[test]
    fn display_text_applies_penalties() {
        assert_eq!(record(Penalty::None).display_text(), "12.34");
        assert_eq!(record(Penalty::PlusTwo).display_text(), "14.34+");
        assert_eq!(record(Penalty::Dnf).display_text(), "DNF");
    }

    #[test]
    fn effective_time_keeps_raw_elapsed_untouched() {
        let plus_two = record(Penalty::PlusTwo);
        assert_eq!(plus_two.elapsed, Centiseconds(1234));
        assert_eq!(plus_two.effective_time(), Some(Centiseconds(1434)));
        assert_eq!(record(Penalty::Dnf).effective_time(), None);
    }

    #[test]
    fn penalties_parse_from_user_text() {
        assert_eq!("+2".parse::<Penalty>().unwrap(), Penalty::PlusTwo);
        assert_eq!(" DNF ".parse::<Penalty>().unwrap(), Penalty::Dnf);
        assert_eq!("".parse::<Penalty>().unwrap(), Penalty::None);
        assert!(matches!(
            "+3".parse::<Penalty>(),
            Err(EntryError::UnknownPenalty(_))
        ));
    }
}
