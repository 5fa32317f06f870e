use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::command::{Command, CommandSource};

/// Events kept before the oldest are dropped
pub const MAX_EVENTS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub source: CommandSource,
    pub command: Command,
}

/// Ring buffer of recently dispatched engine calls
pub struct EventLog {
    events: VecDeque<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_EVENTS)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            next_id: 1,
            max_events: max_events.max(1),
        }
    }

    /// Log a command as an event
    pub fn log(&mut self, command: Command, source: CommandSource) {
        if !command.is_loggable() {
            return;
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        self.events.push_back(Event {
            id: self.next_id,
            timestamp,
            source,
            command,
        });
        self.next_id += 1;

        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }

    /// The newest `count` events, newest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &Event> {
        self.events.iter().rev().take(count)
    }

    /// Get the latest event ID
    pub fn latest_id(&self) -> u64 {
        self.events.back().map(|e| e.id).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_and_old_events_drop() {
        let mut log = EventLog::with_capacity(3);
        for _ in 0..5 {
            log.log(Command::ToggleMute, CommandSource::Keyboard);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.latest_id(), 5);
        let ids: Vec<u64> = log.recent(10).map(|e| e.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[test]
    fn unloggable_commands_are_skipped() {
        let mut log = EventLog::new();
        log.log(
            Command::UpdateDifficulty {
                difficulty: 2.0,
                score: 10,
            },
            CommandSource::Autopilot,
        );
        assert!(log.is_empty());
    }

    #[test]
    fn recent_is_newest_first() {
        let mut log = EventLog::new();
        log.log(Command::StopMusic, CommandSource::Keyboard);
        log.log(Command::ToggleMute, CommandSource::Autopilot);
        let newest: Vec<&Command> = log.recent(1).map(|e| &e.command).collect();
        assert_eq!(newest, vec![&Command::ToggleMute]);
    }
}
