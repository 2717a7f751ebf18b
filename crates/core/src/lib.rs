//! # Slotbook Core
//!
//! Domain types and pure logic shared by every Slotbook crate: the slot
//! generator, the availability resolver, input validation, and the store port
//! the synchronization layer talks to.

pub mod errors;
pub mod models;
pub mod slots;
pub mod store;
pub mod validation;
