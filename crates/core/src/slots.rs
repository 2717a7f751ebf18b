//! # Slot derivation
//!
//! Pure functions that turn a working-hours window, the booked appointments of
//! a day and that day's block list into the slots a client may still book.
//!
//! Derived slots are always recomputed from whole snapshots; nothing here keeps
//! state between calls.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::{
    appointment::Appointment,
    availability::{Availability, SlotState, SlotStatus},
    policy::WorkingHours,
    time_slot::{MINUTES_PER_DAY, TimeSlot},
};

/// Generates the ordered slots of a working day.
///
/// Starts at `hours.start:00` and steps by `interval_minutes` while the slot
/// is strictly before `hours.end:00`, so the end boundary itself is never
/// emitted. A zero interval or an empty window yields no slots.
///
/// # Example
///
/// ```
/// use slotbook_core::models::policy::WorkingHours;
/// use slotbook_core::slots::generate_time_slots;
///
/// let slots = generate_time_slots(30, WorkingHours { start: 9, end: 17 });
/// assert_eq!(slots.len(), 16);
/// assert_eq!(slots[0].to_string(), "09:00");
/// assert_eq!(slots[15].to_string(), "16:30");
/// ```
pub fn generate_time_slots(interval_minutes: u16, hours: WorkingHours) -> Vec<TimeSlot> {
    if interval_minutes == 0 {
        return Vec::new();
    }
    let start = u16::from(hours.start) * 60;
    let end = (u16::from(hours.end) * 60).min(MINUTES_PER_DAY);

    (start..end)
        .step_by(usize::from(interval_minutes))
        .filter_map(TimeSlot::from_minutes)
        .collect()
}

/// Filters `all_slots` down to the ones that are neither booked nor blocked.
///
/// `appointments` must already be restricted to the target day. A missing
/// availability record means nothing is blocked. Input order is preserved.
pub fn get_available_slots(
    all_slots: &[TimeSlot],
    appointments: &[Appointment],
    availability: Option<&Availability>,
) -> Vec<TimeSlot> {
    let booked: HashSet<TimeSlot> = appointments.iter().map(|app| app.time).collect();
    let blocked: HashSet<TimeSlot> = availability
        .map(|a| a.blocked_times.iter().copied().collect())
        .unwrap_or_default();

    all_slots
        .iter()
        .copied()
        .filter(|slot| !booked.contains(slot) && !blocked.contains(slot))
        .collect()
}

/// Per-slot status for the admin overview. A booked slot reports the booking
/// even when it is also blocked.
pub fn slot_statuses(
    all_slots: &[TimeSlot],
    appointments: &[Appointment],
    availability: Option<&Availability>,
) -> Vec<SlotStatus> {
    let booked: HashMap<TimeSlot, &Appointment> =
        appointments.iter().map(|app| (app.time, app)).collect();

    all_slots
        .iter()
        .map(|&time| {
            let state = match booked.get(&time) {
                Some(app) => SlotState::Booked {
                    appointment_id: app.id.clone(),
                    client_name: app.client_name.clone(),
                },
                None if availability.is_some_and(|a| a.is_blocked(time)) => SlotState::Blocked,
                None => SlotState::Available,
            };
            SlotStatus { time, state }
        })
        .collect()
}

/// Block list with `time` added, sorted ascending. Adding a present slot is a no-op.
pub fn with_blocked(current: &[TimeSlot], time: TimeSlot) -> Vec<TimeSlot> {
    let mut blocked: BTreeSet<TimeSlot> = current.iter().copied().collect();
    blocked.insert(time);
    blocked.into_iter().collect()
}

/// Block list with every occurrence of `time` removed.
pub fn without_blocked(current: &[TimeSlot], time: TimeSlot) -> Vec<TimeSlot> {
    current.iter().copied().filter(|&t| t != time).collect()
}
