//! Parsing for times typed in by hand.
//!
//! Two forms are accepted. Structured text such as `1:05.50`, `65.5` or
//! `1:02:05` is read field by field. A bare run of digits is read the way the
//! entry mask fills in while typing: right-aligned, two digits of centiseconds,
//! then two of seconds, two of minutes, and the rest as hours (`10550` is
//! `1:05.50`). A field below the most significant one must be under 60.

use crate::time::Centiseconds;
use thiserror::Error;

const MAX_MASK_DIGITS: usize = 10;
/// Multipliers for seconds, minutes and hours, least significant first.
const UNITS: [(u64, &str); 3] = [(100, "seconds"), (6_000, "minutes"), (360_000, "hours")];

/// Why a manual entry was rejected. Apart from `Refused`, nothing reached the sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("no time entered")]
    Empty,
    #[error("unexpected character '{0}' in time")]
    InvalidCharacter(char),
    #[error("malformed time: {0}")]
    Malformed(String),
    #[error("at most two decimal places are allowed, got '{0}'")]
    TooPrecise(String),
    #[error("{field} must be below 60, got {value}")]
    OutOfRange { field: &'static str, value: u64 },
    #[error("time must be greater than zero")]
    ZeroTime,
    #[error("unknown penalty '{0}', expected +2 or DNF")]
    UnknownPenalty(String),
    #[error("solve was not saved: {0}")]
    Refused(String),
}

/// Parses a manually entered time into centiseconds.
pub fn parse_manual_time(input: &str) -> Result<Centiseconds, EntryError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(EntryError::Empty);
    }
    if let Some(bad) = text
        .chars()
        .find(|c| !(c.is_ascii_digit() || *c == ':' || *c == '.'))
    {
        return Err(EntryError::InvalidCharacter(bad));
    }

    let total = if text.contains(&[':', '.'][..]) {
        parse_structured(text)?
    } else {
        parse_masked(text)?
    };
    if total == 0 {
        return Err(EntryError::ZeroTime);
    }
    Ok(Centiseconds(total))
}

fn parse_structured(text: &str) -> Result<u64, EntryError> {
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if fraction.contains(&['.', ':'][..]) {
        return Err(EntryError::Malformed(text.to_string()));
    }
    if fraction.len() > 2 {
        return Err(EntryError::TooPrecise(text.to_string()));
    }
    let centis = match fraction.len() {
        0 => 0,
        1 => parse_field(fraction, text)? * 10,
        _ => parse_field(fraction, text)?,
    };

    let fields: Vec<&str> = whole.split(':').collect();
    if fields.len() > UNITS.len() {
        return Err(EntryError::Malformed(text.to_string()));
    }
    let values = fields
        .iter()
        .map(|field| {
            // ".50" has an empty whole part.
            if field.is_empty() && fields.len() == 1 {
                Ok(0)
            } else {
                parse_field(field, text)
            }
        })
        .collect::<Result<Vec<u64>, EntryError>>()?;
    combine(&values, centis)
}

fn parse_masked(digits: &str) -> Result<u64, EntryError> {
    if digits.len() > MAX_MASK_DIGITS {
        return Err(EntryError::Malformed(digits.to_string()));
    }
    let split = digits.len().saturating_sub(2);
    let (rest, centis) = digits.split_at(split);
    let centis = parse_field(centis, digits)?;

    // Two digits per field from the right; whatever remains on the left is hours.
    let mut fields = Vec::new();
    let mut rest = rest;
    while !rest.is_empty() && fields.len() < UNITS.len() - 1 {
        let split = rest.len().saturating_sub(2);
        let (head, tail) = rest.split_at(split);
        fields.push(parse_field(tail, digits)?);
        rest = head;
    }
    if !rest.is_empty() {
        fields.push(parse_field(rest, digits)?);
    }
    fields.reverse();
    combine(&fields, centis)
}

/// Combines fields given most significant first.
fn combine(fields: &[u64], centis: u64) -> Result<u64, EntryError> {
    let mut total = centis;
    let last = fields.len().saturating_sub(1);
    for (position, value) in fields.iter().rev().enumerate() {
        let (unit, name) = UNITS[position];
        if position < last && *value >= 60 {
            return Err(EntryError::OutOfRange {
                field: name,
                value: *value,
            });
        }
        total = value
            .checked_mul(unit)
            .and_then(|scaled| total.checked_add(scaled))
            .ok_or(EntryError::OutOfRange {
                field: name,
                value: *value,
            })?;
    }
    Ok(total)
}

fn parse_field(field: &str, original: &str) -> Result<u64, EntryError> {
    if field.is_empty() {
        return Err(EntryError::Malformed(original.to_string()));
    }
    field
        .parse()
        .map_err(|_| EntryError::Malformed(original.to_string()))
}
