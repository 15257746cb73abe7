//! Voice allocation
//!
//! Picks a voice of the active backend for a new note, stealing the oldest
//! allocation when every voice is busy, and resolves a sounding note back to
//! its voice for release.

use crate::backend::{SynthesisBackend, Voice};

/// Stateless voice allocator over a backend's voice table.
///
/// Allocation stamps are applied by the backend when the chosen voice is
/// started, so the allocator only chooses.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoiceAllocator;

impl VoiceAllocator {
    /// Choose a voice for `note`.
    ///
    /// Returns the lowest free voice; when all are busy, the voice with the
    /// smallest allocation stamp (lowest index on ties). Returns `None` only
    /// for a backend without voices, which is a configuration defect.
    pub fn allocate(
        backend: &dyn SynthesisBackend,
        _note: u8,
        _velocity: u8,
        _channel: u8,
    ) -> Option<usize> {
        Self::allocate_in(backend.voices())
    }

    /// [`allocate`](Self::allocate) over a bare voice table.
    pub fn allocate_in(voices: &[Voice]) -> Option<usize> {
        if let Some(free) = voices.iter().position(|v| !v.active) {
            return Some(free);
        }
        voices
            .iter()
            .enumerate()
            .min_by_key(|(idx, v)| (v.allocated_at, *idx))
            .map(|(idx, _)| idx)
    }

    /// Voice currently sounding `note` on `channel`.
    pub fn find_by_note(backend: &dyn SynthesisBackend, note: u8, channel: u8) -> Option<usize> {
        Self::find_in(backend.voices(), note, channel)
    }

    /// [`find_by_note`](Self::find_by_note) over a bare voice table.
    pub fn find_in(voices: &[Voice], note: u8, channel: u8) -> Option<usize> {
        voices.iter().position(|v| v.plays(note, channel))
    }

    /// Lowest-index active voice.
    pub fn first_active(backend: &dyn SynthesisBackend) -> Option<usize> {
        backend.voices().iter().position(|v| v.active)
    }
}
