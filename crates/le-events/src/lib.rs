//! Event bus and resolution report (C11, §4.11, §6.4).
//!
//! Grounded on `rf-event`'s `EventManagerHandle`/`EventManagerProcessor`
//! split, simplified per `SPEC_FULL.md`: instead of a command queue feeding
//! a per-callback-type dispatch table, `EventBus` is a single registered
//! sink that every subsystem's `Services::events` points at, broadcasting
//! to a list of weakly-held listeners.

pub mod bus;
pub mod report;

pub use bus::EventBus;
pub use report::Report;
