use serde::{Deserialize, Serialize};

use crate::errors::{BookingError, BookingResult};
use crate::models::time_slot::TimeSlot;
use crate::slots::generate_time_slots;

/// Opening window of a working day, in whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: u8,
    pub end: u8,
}

pub const DEFAULT_WORKING_HOURS: WorkingHours = WorkingHours { start: 9, end: 17 };
pub const SLOT_INTERVAL_MINUTES: u16 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHoursPolicy {
    pub hours: WorkingHours,
    pub interval_minutes: u16,
}

impl Default for WorkingHoursPolicy {
    fn default() -> Self {
        Self {
            hours: DEFAULT_WORKING_HOURS,
            interval_minutes: SLOT_INTERVAL_MINUTES,
        }
    }
}

impl WorkingHoursPolicy {
    pub fn new(start: u8, end: u8, interval_minutes: u16) -> BookingResult<Self> {
        let policy = Self {
            hours: WorkingHours { start, end },
            interval_minutes,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> BookingResult<()> {
        if self.interval_minutes == 0 {
            return Err(BookingError::Validation(
                "Slot interval must be a positive number of minutes".to_string(),
            ));
        }
        if self.hours.start >= self.hours.end || self.hours.end > 24 {
            return Err(BookingError::Validation(format!(
                "Working hours must satisfy 0 <= start < end <= 24 (got {}..{})",
                self.hours.start, self.hours.end
            )));
        }
        Ok(())
    }

    /// Every slot of a working day under this policy.
    pub fn slots(&self) -> Vec<TimeSlot> {
        generate_time_slots(self.interval_minutes, self.hours)
    }

    /// Whether `slot` falls on this policy's grid.
    pub fn contains(&self, slot: TimeSlot) -> bool {
        let start = u16::from(self.hours.start) * 60;
        let end = u16::from(self.hours.end) * 60;
        let minutes = slot.minutes_since_midnight();
        self.interval_minutes > 0
            && minutes >= start
            && minutes < end
            && (minutes - start) % self.interval_minutes == 0
    }
}
