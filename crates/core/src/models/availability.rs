use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{BookingError, BookingResult};
use crate::models::{appointment::Appointment, time_slot::TimeSlot};

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(key: &str) -> BookingResult<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT)
        .map_err(|_| BookingError::Validation(format!("Invalid date {key:?}, expected YYYY-MM-DD")))
}

/// Manual blocks for one calendar day, keyed by the `YYYY-MM-DD` date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub id: String,
    #[serde(default)]
    pub blocked_times: Vec<TimeSlot>,
}

impl Availability {
    pub fn new(date: NaiveDate, blocked_times: Vec<TimeSlot>) -> Self {
        Self {
            id: date_key(date),
            blocked_times,
        }
    }

    pub fn is_blocked(&self, slot: TimeSlot) -> bool {
        self.blocked_times.contains(&slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotState {
    Available,
    Booked {
        appointment_id: String,
        client_name: String,
    },
    Blocked,
}

/// One row of the admin day overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStatus {
    pub time: TimeSlot,
    #[serde(flatten)]
    pub state: SlotState,
}

impl SlotStatus {
    /// Booked slots are not offered for blocking or unblocking.
    pub fn can_toggle_block(&self) -> bool {
        !matches!(self.state, SlotState::Booked { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsResponse {
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayOverviewResponse {
    pub date: NaiveDate,
    pub appointments: Vec<Appointment>,
    pub blocked_times: Vec<TimeSlot>,
    pub slots: Vec<SlotStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAvailabilityResponse {
    pub date: NaiveDate,
    pub blocked_times: Vec<TimeSlot>,
}
