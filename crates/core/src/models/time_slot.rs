use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

use crate::errors::BookingError;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid time slot {0:?}, expected HH:MM")]
pub struct InvalidTimeSlot(pub String);

impl From<InvalidTimeSlot> for BookingError {
    fn from(err: InvalidTimeSlot) -> Self {
        BookingError::Validation(err.to_string())
    }
}

/// A point in a day's schedule, stored as minutes since midnight.
///
/// Rendered and parsed as a 24-hour `"HH:MM"` label. Ordering follows the
/// time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot(u16);

impl TimeSlot {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn from_hm(hour: u8, minute: u8) -> Option<Self> {
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Self::from_minutes(u16::from(hour) * 60 + u16::from(minute))
    }

    pub fn minutes_since_midnight(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u8 {
        (self.0 / 60) as u8
    }

    pub fn minute(&self) -> u8 {
        (self.0 % 60) as u8
    }

    /// 12-hour display form, e.g. `"02:30 PM"`.
    pub fn display_12h(&self) -> String {
        let (hour, suffix) = match self.hour() {
            0 => (12, "AM"),
            h @ 1..=11 => (h, "AM"),
            12 => (12, "PM"),
            h => (h - 12, "PM"),
        };
        format!("{:02}:{:02} {}", hour, self.minute(), suffix)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeSlot {
    type Err = InvalidTimeSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidTimeSlot(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let digits = |range: std::ops::Range<usize>| -> Option<u8> {
            let part = s.get(range)?;
            if part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse().ok()
            } else {
                None
            }
        };
        let hour = digits(0..2).ok_or_else(invalid)?;
        let minute = digits(3..5).ok_or_else(invalid)?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(de::Error::custom)
    }
}
