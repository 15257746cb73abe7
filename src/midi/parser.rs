//! MIDI byte-stream parser
//!
//! Reconstructs channel-voice messages from an unbuffered byte source. The
//! parser is a two-state machine (awaiting a status byte, or accumulating data
//! bytes under a running status) expressed as a pure transition function:
//!
//! ```
//! use ym2149_midi::midi::{Event, ParserState};
//!
//! let mut state = ParserState::new();
//! let mut events = Vec::new();
//! for byte in [0x90, 0x3C, 0x40, 0x3C, 0x00] {
//!     let (next, event) = state.step(byte);
//!     state = next;
//!     events.extend(event);
//! }
//! assert_eq!(events.len(), 2);
//! assert_eq!(events[1], Event::NoteOn { note: 60, velocity: 0, channel: 0 });
//! ```
//!
//! Real-time bytes (0xF8-0xFF) are transparent and may appear between any two
//! bytes of a message. System-common bytes (0xF0-0xF7) cancel running status.

use super::event::{
    Event, CONTROL_CHANGE, NOTE_OFF, NOTE_ON, PITCH_BEND, PROGRAM_CHANGE, REALTIME_START,
    SYSTEM_COMMON_START,
};

/// Number of data bytes that follow a channel-voice command.
pub fn expected_data_bytes(command: u8) -> u8 {
    match command & 0xF0 {
        NOTE_OFF | NOTE_ON | CONTROL_CHANGE | PITCH_BEND => 2,
        PROGRAM_CHANGE => 1,
        // Consumed as status-only
        _ => 0,
    }
}

/// Parser state carried between bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserState {
    /// Running status byte, `None` while awaiting a status byte
    running_status: Option<u8>,
    /// Channel of the running status (low nibble)
    channel: u8,
    /// Command of the running status (high nibble)
    command: u8,
    /// Data bytes that complete a message
    expected: u8,
    /// Data bytes received for the message in progress
    received: u8,
    /// Accumulated data bytes
    data: [u8; 2],
}

impl ParserState {
    /// Fresh state with no running status.
    pub const fn new() -> Self {
        ParserState {
            running_status: None,
            channel: 0,
            command: 0,
            expected: 0,
            received: 0,
            data: [0; 2],
        }
    }

    /// Current running status byte, if any.
    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// Channel of the running status.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Command (high nibble) of the running status.
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Data bytes expected per message under the running status.
    pub fn expected(&self) -> u8 {
        self.expected
    }

    /// Data bytes accumulated so far for the message in progress.
    pub fn received(&self) -> u8 {
        self.received
    }

    /// `true` while part of a message has been accumulated.
    pub fn is_accumulating(&self) -> bool {
        self.running_status.is_some() && self.received > 0
    }

    /// Advance the state machine by one byte.
    ///
    /// Returns the next state and the event completed by this byte, if any.
    #[must_use]
    pub fn step(self, byte: u8) -> (ParserState, Option<Event>) {
        if byte >= REALTIME_START {
            return (self, None);
        }

        if byte >= SYSTEM_COMMON_START {
            return (ParserState::new(), None);
        }

        if byte & 0x80 != 0 {
            let next = ParserState {
                running_status: Some(byte),
                channel: byte & 0x0F,
                command: byte & 0xF0,
                expected: expected_data_bytes(byte),
                received: 0,
                data: [0; 2],
            };
            return (next, None);
        }

        let Some(status) = self.running_status else {
            return (self, None);
        };

        if self.expected == 0 {
            // Data for a status-only command: swallowed, status kept
            return (self, None);
        }

        let mut next = self;
        next.data[next.received as usize] = byte;
        next.received += 1;

        if next.received < next.expected {
            return (next, None);
        }

        let event = Event::from_message(status, next.data[0], next.data[1]);
        next.received = 0;
        next.data = [0; 2];
        (next, event)
    }
}

/// Convenience wrapper owning a [`ParserState`].
#[derive(Debug, Clone, Default)]
pub struct Parser {
    state: ParserState,
}

impl Parser {
    /// New parser with no running status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte, returning the event it completes.
    pub fn push(&mut self, byte: u8) -> Option<Event> {
        let (next, event) = self.state.step(byte);
        self.state = next;
        event
    }

    /// Feed a slice of bytes, collecting every completed event.
    pub fn push_all(&mut self, bytes: &[u8]) -> Vec<Event> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Current state.
    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Drop running status and any partial message.
    pub fn reset(&mut self) {
        self.state = ParserState::new();
    }
}
