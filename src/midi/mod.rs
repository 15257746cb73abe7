//! MIDI Input Domain
//!
//! Byte-stream parsing and the performance events it produces.

pub mod event;
pub mod parser;

pub use event::{Event, MidiChannel, MidiNote};
pub use parser::{Parser, ParserState};
