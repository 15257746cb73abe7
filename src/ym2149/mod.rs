//! YM2149 PSG Driver Domain
//!
//! Register-level control of a Yamaha YM2149 (or AY-3-8910) over a two-port
//! bus: note and level conversion tables, the register map, the detection
//! protocol and the [`SynthesisBackend`](crate::backend::SynthesisBackend)
//! implementation.
//!
//! - `driver` - the backend implementation
//! - `detect` - non-destructive presence detection
//! - `registers` - register map and bit layouts
//! - `tables` - note-to-period table and scaling helpers
//! - `demo` - audible self-test sequences

pub mod demo;
pub mod detect;
pub mod driver;
pub mod registers;
pub mod tables;

// Re-export public API
pub use detect::detect_ym2149;
pub use driver::{ChannelState, Ym2149Driver, VOICE_COUNT};
pub use registers::{MixerFlags, Register};
pub use tables::{apply_pitch_bend, note_to_period};
