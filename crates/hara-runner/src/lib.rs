//! Background execution of HARA pipeline runs with broadcast progress events.

pub mod event_bus;
pub mod worker;
