/// How far ahead of the output clock steps are handed to the output
pub const LOOKAHEAD_SECS: f64 = 0.1;

/// Lag beyond which the grid is re-anchored instead of catching up
pub const MAX_LAG_SECS: f64 = 0.25;

/// Length of one sixteenth-note step at `tempo` BPM, in seconds
pub fn step_duration(tempo: f32) -> f64 {
    // 1 beat = 4 sixteenth notes
    60.0 / tempo as f64 / 4.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulerState {
    Stopped,
    Running {
        /// Absolute output time of the next step
        next_step_at: f64,
    },
}

/// A step ready to be played
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DueStep {
    pub index: u64,
    /// Absolute output time the step's events start at
    pub at: f64,
    /// Seconds, at the tempo the step was scheduled with
    pub duration: f64,
}

impl DueStep {
    /// Position inside a pattern loop
    pub fn position(&self, steps: usize) -> usize {
        (self.index % steps as u64) as usize
    }
}

/// Walks the step grid against the output clock.
///
/// The host calls [`Scheduler::next_due`] repeatedly from its pump; every
/// step whose start falls inside the lookahead window is returned exactly
/// once, in order. Step length is taken from the tempo passed at each call, so
/// tempo changes apply from the very next step.
pub struct Scheduler {
    state: SchedulerState,
    step_index: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Stopped,
            step_index: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SchedulerState::Running { .. })
    }

    /// Index of the next step to be handed out
    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    /// Begin at step 0, due immediately. Returns false if already running.
    pub fn start(&mut self, now: f64) -> bool {
        if self.is_running() {
            return false;
        }
        self.step_index = 0;
        self.state = SchedulerState::Running { next_step_at: now };
        true
    }

    pub fn stop(&mut self) {
        self.state = SchedulerState::Stopped;
        self.step_index = 0;
    }

    /// The next step starting before `now + LOOKAHEAD_SECS`, if any
    pub fn next_due(&mut self, now: f64, tempo: f32) -> Option<DueStep> {
        let SchedulerState::Running { next_step_at } = self.state else {
            return None;
        };

        let mut grid_at = next_step_at;
        if grid_at < now - MAX_LAG_SECS {
            tracing::debug!("Scheduler fell {:.3}s behind, re-anchoring", now - grid_at);
            grid_at = now;
        }
        if grid_at > now + LOOKAHEAD_SECS {
            return None;
        }

        // A slightly late step sounds now, whole; the grid keeps its phase
        let duration = step_duration(tempo);
        let step = DueStep {
            index: self.step_index,
            at: grid_at.max(now),
            duration,
        };
        self.step_index += 1;
        self.state = SchedulerState::Running {
            next_step_at: grid_at + duration,
        };
        Some(step)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
