use crate::synth::VoiceId;

/// A scheduled music voice that may still be sounding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveHandle {
    pub id: VoiceId,
    /// Output time at which the voice terminates on its own
    pub ends_at: f64,
}

/// Live voices of the current playback session, in creation order
#[derive(Debug, Default)]
pub struct VoiceArena {
    handles: Vec<LiveHandle>,
}

impl VoiceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: VoiceId, ends_at: f64) {
        self.handles.push(LiveHandle { id, ends_at });
    }

    /// Forget voices that have finished by `now`
    pub fn prune(&mut self, now: f64) {
        self.handles.retain(|h| h.ends_at > now);
    }

    /// Empty the arena, returning every id for disposal
    pub fn drain_all(&mut self) -> Vec<VoiceId> {
        self.handles.drain(..).map(|h| h.id).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handles(&self) -> &[LiveHandle] {
        &self.handles
    }
}
