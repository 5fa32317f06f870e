use std::collections::VecDeque;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use super::OutputCommand;

/// Capacity of the engine -> render thread queue
pub const OUTPUT_QUEUE_CAPACITY: usize = 1024;

/// Queue carrying scheduled voices from the engine to the render thread
pub struct OutputBus {
    tx: Sender<OutputCommand>,
    rx: Receiver<OutputCommand>,
}

impl OutputBus {
    pub fn new() -> Self {
        let (tx, rx) = bounded(OUTPUT_QUEUE_CAPACITY);
        Self { tx, rx }
    }

    /// Get a sender that can be cloned and shared
    pub fn sender(&self) -> OutputSender {
        OutputSender {
            tx: self.tx.clone(),
            held: VecDeque::new(),
        }
    }

    /// Get a receiver (typically for the audio thread)
    pub fn receiver(&self) -> OutputReceiver {
        OutputReceiver {
            rx: self.rx.clone(),
        }
    }
}

impl Default for OutputBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending half of the output queue.
///
/// Never blocks. When the queue is full a `Play` is dropped, but control
/// commands (bus changes, releases, volumes) are held back in order and
/// delivered by a later [`OutputSender::send`] or [`OutputSender::flush`].
/// While anything is held, new voices are dropped so they never overtake it.
pub struct OutputSender {
    tx: Sender<OutputCommand>,
    held: VecDeque<OutputCommand>,
}

impl OutputSender {
    /// Queue a command. Returns false if it was dropped or held back.
    pub fn send(&mut self, cmd: OutputCommand) -> bool {
        if !self.flush() {
            return self.hold_or_drop(cmd);
        }
        match self.tx.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(cmd)) => self.hold_or_drop(cmd),
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Deliver held control commands. Returns true once none are left.
    pub fn flush(&mut self) -> bool {
        while let Some(cmd) = self.held.pop_front() {
            match self.tx.try_send(cmd) {
                Ok(()) => {}
                Err(TrySendError::Full(cmd)) => {
                    self.held.push_front(cmd);
                    return false;
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.held.clear();
                    return true;
                }
            }
        }
        true
    }

    /// Control commands waiting for room in the queue
    pub fn held(&self) -> usize {
        self.held.len()
    }

    fn hold_or_drop(&mut self, cmd: OutputCommand) -> bool {
        if cmd.is_droppable() {
            tracing::warn!("Output queue full, dropping voice");
        } else {
            tracing::error!("Output queue full, holding {} for retry", cmd.kind());
            self.held.push_back(cmd);
        }
        false
    }
}

/// Receiver for consuming output commands
#[derive(Clone)]
pub struct OutputReceiver {
    rx: Receiver<OutputCommand>,
}

impl OutputReceiver {
    /// Try to receive a command (non-blocking)
    pub fn try_recv(&self) -> Option<OutputCommand> {
        self.rx.try_recv().ok()
    }
}
