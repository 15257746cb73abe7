//! YM2149 MIDI Synthesizer
//!
//! MIDI synthesizer for a Yamaha YM2149 (AY-3-8910) PSG
//! attached over a two-port I/O bus, as found on RC2014-style sound cards.
//! Raw MIDI bytes are parsed one at a time, mapped to voices, and turned into
//! register writes on whichever sound chip answered detection.
//!
//! # Features
//! - Byte-at-a-time MIDI parser with running status and real-time passthrough
//! - Three-voice allocation with oldest-first voice stealing
//! - Chip registry with non-destructive detection and runtime selection
//! - YM2149 register driver: note table, pitch bend, envelope controls, presets
//! - Simulated chip for development and tests, `/dev/port` access on Unix
//!
//! # Quick start
//! ```
//! use ym2149_midi::bus::sim::SimulatedPsg;
//! use ym2149_midi::{PortConfig, Synth};
//!
//! let chip = SimulatedPsg::new();
//! let mut synth = Synth::with_ym2149(chip.clone(), PortConfig::default());
//! synth.reinit();
//!
//! // Note on, middle C, full velocity
//! synth.feed_all(&[0x90, 60, 127]);
//! assert_eq!(chip.register(0x08), 15);
//! ```

#![warn(missing_docs)]

pub mod allocator; // Voice Allocation
pub mod backend; // Backend Capability Trait
pub mod bus; // Port I/O Layer
pub mod config; // Port Configuration
pub mod dispatch; // Event Routing
pub mod midi; // MIDI Input
pub mod registry; // Chip Registry
pub mod synth; // Synthesizer Context
pub mod ym2149; // YM2149 PSG Driver

/// Error types for synthesizer operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthError {
    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    Validation(#[from] config::ValidationError),

    /// Chip selection was rejected
    #[error("Chip selection failed: {0}")]
    Selection(#[from] registry::SelectionError),
}

/// Result type for synthesizer operations
pub type Result<T> = std::result::Result<T, SynthError>;

// Public API exports
pub use allocator::VoiceAllocator;
pub use backend::{AllocationClock, ChipKind, ChipSet, SynthesisBackend, Voice};
pub use bus::{PortIo, RegisterBus};
pub use config::PortConfig;
pub use dispatch::Dispatcher;
pub use midi::{Event, Parser, ParserState};
pub use registry::{ChipRegistry, SelectionError};
pub use synth::{ByteSource, Synth};
pub use ym2149::Ym2149Driver;
