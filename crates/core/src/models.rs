pub mod appointment;
pub mod availability;
pub mod policy;
pub mod time_slot;
