//! Pitch and level conversion tables
//!
//! Tone periods assume a 1.8432 MHz master clock:
//! `TP = round(1_843_200 / (16 * f)) = round(115_200 / f)`.
//! A larger period is a lower pitch.

/// Lowest MIDI note with a table entry (C1)
pub const MIDI_NOTE_MIN: u8 = 24;
/// Highest MIDI note with a table entry (C7)
pub const MIDI_NOTE_MAX: u8 = 96;

/// Smallest tone period the driver programs
pub const PERIOD_MIN: u16 = 1;
/// Largest tone period (12-bit register pair)
pub const PERIOD_MAX: u16 = 4095;

/// Pitch-bend divisor: a full-scale bend moves the period by about 11%,
/// roughly two semitones either way.
pub const PITCH_BEND_SCALE: i32 = 72_000;

/// Tone periods for MIDI notes 24 (C1) through 96 (C7)
#[rustfmt::skip]
pub const NOTE_PERIODS: [u16; (MIDI_NOTE_MAX - MIDI_NOTE_MIN + 1) as usize] = [
    // C1
    3522, 3325, 3138, 2962, 2796, 2639, 2491, 2351, 2219, 2095, 1977, 1866,
    // C2
    1761, 1662, 1569, 1481, 1398, 1319, 1245, 1175, 1109, 1047,  989,  933,
    // C3
     881,  831,  784,  740,  699,  660,  623,  588,  555,  524,  494,  467,
    // C4
     440,  416,  392,  370,  349,  330,  311,  294,  277,  262,  247,  233,
    // C5
     220,  208,  196,  185,  175,  165,  156,  147,  139,  131,  124,  117,
    // C6
     110,  104,   98,   93,   87,   82,   78,   73,   69,   65,   62,   58,
    // C7
      55,
];

/// Clamp a MIDI note into the range covered by the period table
#[inline]
pub fn clamp_note(note: u8) -> u8 {
    note.clamp(MIDI_NOTE_MIN, MIDI_NOTE_MAX)
}

/// Tone period for a MIDI note; out-of-range notes are clamped
#[inline]
pub fn note_to_period(note: u8) -> u16 {
    NOTE_PERIODS[(clamp_note(note) - MIDI_NOTE_MIN) as usize]
}

/// Rescale a 7-bit value (velocity or controller) to a 4-bit volume
#[inline]
pub fn scale_to_volume(value: u8) -> u8 {
    ((value.min(127) as u16 * 15) / 127) as u8
}

/// Rescale a 7-bit controller value to the 8-bit envelope period range
#[inline]
pub fn scale_to_envelope_period(value: u8) -> u16 {
    (value.min(127) as u16 * 255) / 127
}

/// Apply a signed pitch bend (-8192..=8191) to a base tone period
///
/// Positive bends raise pitch (shorter period). The result is clamped to
/// `[PERIOD_MIN, PERIOD_MAX]`.
pub fn apply_pitch_bend(base: u16, bend: i16) -> u16 {
    let base = base as i32;
    let delta = (base * bend as i32) / PITCH_BEND_SCALE;
    (base - delta).clamp(PERIOD_MIN as i32, PERIOD_MAX as i32) as u16
}
