//! Performance events reconstructed from the MIDI byte stream.

/// MIDI channel (0-15).
pub type MidiChannel = u8;

/// MIDI note number (0-127, 60 = middle C).
pub type MidiNote = u8;

/// Note Off channel-voice command (high nibble).
pub const NOTE_OFF: u8 = 0x80;
/// Note On channel-voice command.
pub const NOTE_ON: u8 = 0x90;
/// Control Change channel-voice command.
pub const CONTROL_CHANGE: u8 = 0xB0;
/// Program Change channel-voice command.
pub const PROGRAM_CHANGE: u8 = 0xC0;
/// Pitch Bend channel-voice command.
pub const PITCH_BEND: u8 = 0xE0;

/// First system-common status byte.
pub const SYSTEM_COMMON_START: u8 = 0xF0;
/// First system real-time status byte.
pub const REALTIME_START: u8 = 0xF8;

/// Centre value of the 14-bit pitch-bend wheel.
pub const PITCH_BEND_CENTER: i16 = 8192;

/// A discrete performance event.
///
/// Produced one at a time by the parser and consumed immediately by the
/// dispatcher; events are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Key pressed. A velocity of 0 is a release by convention.
    NoteOn {
        /// Note number (0-127)
        note: MidiNote,
        /// Strike velocity (0-127)
        velocity: u8,
        /// Channel (0-15)
        channel: MidiChannel,
    },
    /// Key released.
    NoteOff {
        /// Note number (0-127)
        note: MidiNote,
        /// Channel (0-15)
        channel: MidiChannel,
    },
    /// Continuous controller moved.
    ControlChange {
        /// Controller number (0-127)
        controller: u8,
        /// Controller value (0-127)
        value: u8,
        /// Channel (0-15)
        channel: MidiChannel,
    },
    /// Patch selected.
    ProgramChange {
        /// Program number (0-127)
        program: u8,
        /// Channel (0-15)
        channel: MidiChannel,
    },
    /// Pitch wheel moved, centred on zero (-8192..=8191).
    PitchBend {
        /// Signed bend amount
        value: i16,
        /// Channel (0-15)
        channel: MidiChannel,
    },
}

impl Event {
    /// Channel the event was received on.
    pub fn channel(&self) -> MidiChannel {
        match *self {
            Event::NoteOn { channel, .. }
            | Event::NoteOff { channel, .. }
            | Event::ControlChange { channel, .. }
            | Event::ProgramChange { channel, .. }
            | Event::PitchBend { channel, .. } => channel,
        }
    }

    /// Returns `true` for a Note On carrying velocity 0.
    pub fn is_silent_note_on(&self) -> bool {
        matches!(self, Event::NoteOn { velocity: 0, .. })
    }

    /// Build an event from a complete channel-voice message.
    ///
    /// Returns `None` for commands this system does not act on.
    pub fn from_message(status: u8, data1: u8, data2: u8) -> Option<Self> {
        let channel = status & 0x0F;
        let data1 = data1 & 0x7F;
        let data2 = data2 & 0x7F;
        match status & 0xF0 {
            NOTE_ON => Some(Event::NoteOn {
                note: data1,
                velocity: data2,
                channel,
            }),
            NOTE_OFF => Some(Event::NoteOff {
                note: data1,
                channel,
            }),
            CONTROL_CHANGE => Some(Event::ControlChange {
                controller: data1,
                value: data2,
                channel,
            }),
            PROGRAM_CHANGE => Some(Event::ProgramChange {
                program: data1,
                channel,
            }),
            PITCH_BEND => Some(Event::PitchBend {
                value: (((data2 as i16) << 7) | data1 as i16) - PITCH_BEND_CENTER,
                channel,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_bend_decoding() {
        assert_eq!(
            Event::from_message(0xE0, 0x00, 0x40),
            Some(Event::PitchBend {
                value: 0,
                channel: 0
            })
        );
        assert_eq!(
            Event::from_message(0xE3, 0x7F, 0x7F),
            Some(Event::PitchBend {
                value: 8191,
                channel: 3
            })
        );
        assert_eq!(
            Event::from_message(0xE0, 0x00, 0x00),
            Some(Event::PitchBend {
                value: -8192,
                channel: 0
            })
        );
    }

    #[test]
    fn test_unsupported_commands() {
        // Poly aftertouch and channel pressure are consumed but not surfaced
        assert_eq!(Event::from_message(0xA0, 0x3C, 0x10), None);
        assert_eq!(Event::from_message(0xD0, 0x10, 0x00), None);
    }

    #[test]
    fn test_silent_note_on() {
        let ev = Event::from_message(0x91, 60, 0).unwrap();
        assert!(ev.is_silent_note_on());
        assert_eq!(ev.channel(), 1);
    }
}
