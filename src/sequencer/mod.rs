pub mod clock;
pub mod library;
pub mod pattern;
pub mod selector;

pub use clock::{step_duration, DueStep, Scheduler, SchedulerState, LOOKAHEAD_SECS, MAX_LAG_SECS};
pub use library::PatternLibrary;
pub use pattern::{
    ArpeggioEvent, Channel, DrumEvent, NoteEvent, Pattern, PatternError, STEPS,
};
pub use selector::{eligible, switch_interval, PatternSelector};
