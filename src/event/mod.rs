pub mod log;

pub use log::{Event, EventLog, MAX_EVENTS};
