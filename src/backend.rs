//! Backend trait abstraction for sound chip drivers
//!
//! This module defines the capability set every synthesis backend provides,
//! so the registry can select among chip drivers at runtime and the dispatcher
//! can drive whichever one is active without knowing which chip it is.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::Serialize;

/// Identity of a backend kind known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize)]
pub enum ChipKind {
    /// Yamaha YM2149 / AY-3-8910 PSG
    Ym2149 = 1,
    /// Yamaha YMF262 FM synthesizer
    Opl3 = 2,
}

impl ChipKind {
    /// Every backend kind, in default selection order.
    pub const ALL: [ChipKind; 2] = [ChipKind::Ym2149, ChipKind::Opl3];

    /// Look up a backend kind by numeric identifier.
    pub fn from_id(id: u8) -> Option<Self> {
        ChipKind::from_u8(id)
    }

    /// Numeric identifier.
    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            ChipKind::Ym2149 => "YM2149 PSG",
            ChipKind::Opl3 => "OPL3 FM",
        }
    }

    /// Membership flag in a [`ChipSet`].
    pub fn flag(&self) -> ChipSet {
        match self {
            ChipKind::Ym2149 => ChipSet::YM2149,
            ChipKind::Opl3 => ChipSet::OPL3,
        }
    }
}

impl fmt::Display for ChipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of detected backend kinds
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChipSet: u8 {
        /// YM2149 PSG present
        const YM2149 = 0x01;
        /// OPL3 present
        const OPL3 = 0x02;
    }
}

impl ChipSet {
    /// `true` if `kind` is in the set.
    pub fn has(&self, kind: ChipKind) -> bool {
        self.contains(kind.flag())
    }

    /// Kinds in the set, in default selection order.
    pub fn kinds(&self) -> impl Iterator<Item = ChipKind> + '_ {
        ChipKind::ALL.into_iter().filter(|k| self.has(*k))
    }
}

/// Monotonic allocation counter shared by every backend in a session.
///
/// A `u64` bumped once per note cannot wrap within a realistic session; the
/// increment wraps rather than panics so the arithmetic stays total.
#[derive(Debug, Clone, Default)]
pub struct AllocationClock {
    next: Rc<Cell<u64>>,
}

impl AllocationClock {
    /// Counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next stamp.
    pub fn tick(&self) -> u64 {
        let stamp = self.next.get();
        self.next.set(stamp.wrapping_add(1));
        stamp
    }

    /// Stamp that the next call to [`tick`](Self::tick) returns.
    pub fn peek(&self) -> u64 {
        self.next.get()
    }

    /// Restart the counter from zero.
    pub fn reset(&self) {
        self.next.set(0);
    }
}

/// State of one synthesis voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Voice {
    /// Voice is sounding
    pub active: bool,
    /// MIDI note (0-127)
    pub note: u8,
    /// Strike velocity (0-127)
    pub velocity: u8,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// Allocation stamp, larger is newer
    pub allocated_at: u64,
}

impl Voice {
    /// `true` if this voice is sounding `note` on `channel`.
    pub fn plays(&self, note: u8, channel: u8) -> bool {
        self.active && self.note == note && self.channel == channel
    }
}

/// Common interface for sound chip backends
///
/// Every operation is total over its documented input range: values are
/// clamped, out-of-range voices are ignored, and effects the chip cannot
/// realise are accepted as no-ops. Nothing here returns an error.
pub trait SynthesisBackend {
    /// Which backend this is.
    fn kind(&self) -> ChipKind;

    /// Human-readable chip name.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Check for the chip without disturbing its state.
    fn detect(&mut self) -> bool;

    /// Bring the chip into its playing state and clear all voices.
    fn init(&mut self);

    /// Silence the chip and return every register to its power-on value.
    fn reset(&mut self);

    /// Release every voice.
    fn all_off(&mut self);

    /// Start `note` on `voice`, stamping it with a fresh allocation time.
    fn note_on(&mut self, voice: usize, note: u8, velocity: u8, channel: u8);

    /// Stop `voice` immediately.
    fn note_off(&mut self, voice: usize);

    /// Set the level of `voice`.
    fn set_volume(&mut self, voice: usize, value: u8);

    /// Set the attack time of `voice` (0-127).
    fn set_attack(&mut self, voice: usize, value: u8);

    /// Set the decay time of `voice` (0-127).
    fn set_decay(&mut self, voice: usize, value: u8);

    /// Set the sustain level of `voice` (0-127).
    fn set_sustain(&mut self, voice: usize, value: u8);

    /// Set the release time of `voice` (0-127).
    fn set_release(&mut self, voice: usize, value: u8);

    /// Global vibrato depth (0-127).
    ///
    /// Default implementation is a no-op for chips without hardware support.
    fn set_vibrato(&mut self, _value: u8) {}

    /// Global tremolo rate (0-127).
    ///
    /// Default implementation is a no-op for chips without hardware support.
    fn set_tremolo(&mut self, _value: u8) {}

    /// Global modulation depth (0-127).
    ///
    /// Default implementation is a no-op for chips without hardware support.
    fn set_modulation(&mut self, _value: u8) {}

    /// Bend every active voice (-8192..=8191).
    fn set_pitch_bend(&mut self, value: i16);

    /// Select a canned patch; unknown programs are ignored.
    fn set_preset(&mut self, program: u8);

    /// Emergency stop: every voice off and all outputs disabled.
    fn panic(&mut self);

    /// Voice table, `voice_count()` entries long.
    fn voices(&self) -> &[Voice];

    /// Number of voices the chip provides.
    fn voice_count(&self) -> usize {
        self.voices().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chip_kind_ids() {
        assert_eq!(ChipKind::from_id(1), Some(ChipKind::Ym2149));
        assert_eq!(ChipKind::from_id(2), Some(ChipKind::Opl3));
        assert_eq!(ChipKind::from_id(0), None);
        assert_eq!(ChipKind::from_id(9), None);
        assert_eq!(ChipKind::Ym2149.id(), 1);
    }

    #[test]
    fn test_chip_set_membership() {
        let set = ChipSet::YM2149;
        assert!(set.has(ChipKind::Ym2149));
        assert!(!set.has(ChipKind::Opl3));
        assert_eq!(set.kinds().collect::<Vec<_>>(), vec![ChipKind::Ym2149]);
        assert!(ChipSet::default().is_empty());
    }

    #[test]
    fn test_allocation_clock_shared_and_increasing() {
        let clock = AllocationClock::new();
        let other = clock.clone();
        assert_eq!(clock.tick(), 0);
        assert_eq!(other.tick(), 1);
        assert_eq!(clock.peek(), 2);
        other.reset();
        assert_eq!(clock.tick(), 0);
    }

    #[test]
    fn test_voice_plays() {
        let v = Voice {
            active: true,
            note: 60,
            velocity: 100,
            channel: 2,
            allocated_at: 7,
        };
        assert!(v.plays(60, 2));
        assert!(!v.plays(60, 1));
        assert!(!Voice { active: false, ..v }.plays(60, 2));
    }
}
