//! YM2149 Register Definitions
//!
//! The 14 sound registers (R0-R13) plus the two I/O port registers, the
//! mixer and level register bit layouts, and the envelope shape codes used by
//! the driver.

use std::fmt;

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// YM2149 Register Address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Register {
    /// Channel A tone period (low byte) - R0
    ChAFreqLo = 0x00,
    /// Channel A tone period (high nibble) - R1
    ChAFreqHi = 0x01,
    /// Channel B tone period (low byte) - R2
    ChBFreqLo = 0x02,
    /// Channel B tone period (high nibble) - R3
    ChBFreqHi = 0x03,
    /// Channel C tone period (low byte) - R4
    ChCFreqLo = 0x04,
    /// Channel C tone period (high nibble) - R5
    ChCFreqHi = 0x05,
    /// Noise period - R6
    NoiseFreq = 0x06,
    /// Mixer control - R7
    MixerCtrl = 0x07,
    /// Channel A level - R8
    ChALevel = 0x08,
    /// Channel B level - R9
    ChBLevel = 0x09,
    /// Channel C level - R10
    ChCLevel = 0x0A,
    /// Envelope period (low byte) - R11
    EnvelopeFreqLo = 0x0B,
    /// Envelope period (high byte) - R12
    EnvelopeFreqHi = 0x0C,
    /// Envelope shape - R13
    EnvelopeShape = 0x0D,
    /// I/O Port A - R14
    PortA = 0x0E,
    /// I/O Port B - R15
    PortB = 0x0F,
}

impl Register {
    /// Convert a raw register number to a register, wrapping at 16
    pub fn from_addr(addr: u8) -> Option<Self> {
        Register::from_u8(addr & 0x0F)
    }

    /// Get the register address value
    pub fn addr(&self) -> u8 {
        *self as u8
    }

    /// Tone period low/high register pair for a channel (0=A, 1=B, 2=C)
    pub fn tone_period(channel: usize) -> (Register, Register) {
        match channel {
            0 => (Register::ChAFreqLo, Register::ChAFreqHi),
            1 => (Register::ChBFreqLo, Register::ChBFreqHi),
            _ => (Register::ChCFreqLo, Register::ChCFreqHi),
        }
    }

    /// Level register for a channel (0=A, 1=B, 2=C)
    pub fn level(channel: usize) -> Register {
        match channel {
            0 => Register::ChALevel,
            1 => Register::ChBLevel,
            _ => Register::ChCLevel,
        }
    }

    /// Bits of this register that are implemented (writable and readable)
    pub fn read_mask(&self) -> u8 {
        READ_MASK[*self as usize]
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::ChAFreqLo => write!(f, "R0 (Channel A Period Low)"),
            Register::ChAFreqHi => write!(f, "R1 (Channel A Period High)"),
            Register::ChBFreqLo => write!(f, "R2 (Channel B Period Low)"),
            Register::ChBFreqHi => write!(f, "R3 (Channel B Period High)"),
            Register::ChCFreqLo => write!(f, "R4 (Channel C Period Low)"),
            Register::ChCFreqHi => write!(f, "R5 (Channel C Period High)"),
            Register::NoiseFreq => write!(f, "R6 (Noise Period)"),
            Register::MixerCtrl => write!(f, "R7 (Mixer Control)"),
            Register::ChALevel => write!(f, "R8 (Channel A Level)"),
            Register::ChBLevel => write!(f, "R9 (Channel B Level)"),
            Register::ChCLevel => write!(f, "R10 (Channel C Level)"),
            Register::EnvelopeFreqLo => write!(f, "R11 (Envelope Period Low)"),
            Register::EnvelopeFreqHi => write!(f, "R12 (Envelope Period High)"),
            Register::EnvelopeShape => write!(f, "R13 (Envelope Shape)"),
            Register::PortA => write!(f, "R14 (I/O Port A)"),
            Register::PortB => write!(f, "R15 (I/O Port B)"),
        }
    }
}

/// Implemented bits per register; unimplemented bits read back as zero.
const READ_MASK: [u8; 16] = [
    0xFF, 0x0F, 0xFF, 0x0F, 0xFF, 0x0F, 0x1F, 0xFF, 0x1F, 0x1F, 0x1F, 0xFF, 0xFF, 0x0F, 0xFF, 0xFF,
];

/// Number of sound registers cleared by a reset (R0-R13)
pub const SOUND_REGISTER_COUNT: u8 = 14;

bitflags! {
    /// Mixer Control Register (R7) bitflags
    ///
    /// A set bit disables the source.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MixerFlags: u8 {
        /// Channel A tone disable
        const CH_A_TONE = 0x01;
        /// Channel B tone disable
        const CH_B_TONE = 0x02;
        /// Channel C tone disable
        const CH_C_TONE = 0x04;
        /// Channel A noise disable
        const CH_A_NOISE = 0x08;
        /// Channel B noise disable
        const CH_B_NOISE = 0x10;
        /// Channel C noise disable
        const CH_C_NOISE = 0x20;
    }
}

impl MixerFlags {
    /// Tone on all three channels, noise off
    pub const ALL_TONE: MixerFlags = MixerFlags::CH_A_NOISE
        .union(MixerFlags::CH_B_NOISE)
        .union(MixerFlags::CH_C_NOISE);

    /// Every tone and noise source disabled
    pub const ALL_OFF: MixerFlags = MixerFlags::all();

    /// Tone sources disabled, noise enabled on all channels
    pub const ALL_NOISE: MixerFlags = MixerFlags::CH_A_TONE
        .union(MixerFlags::CH_B_TONE)
        .union(MixerFlags::CH_C_TONE);
}

/// Bits of the mixer register checked by the detection protocol
pub const MIXER_TEST_MASK: u8 = 0x3F;

/// Level register: fixed volume bits
pub const LEVEL_VOLUME_MASK: u8 = 0x0F;

/// Level register: volume follows the envelope generator
pub const LEVEL_ENVELOPE_MODE: u8 = 0x10;

/// Maximum fixed volume
pub const MAX_VOLUME: u8 = 15;

/// Envelope shape codes written to R13
pub mod shape {
    /// Envelope off (constant level)
    pub const OFF: u8 = 0x00;
    /// Plain triangle
    pub const TRIANGLE: u8 = 0x02;
    /// Sawtooth
    pub const SAWTOOTH: u8 = 0x03;
    /// Triangle with decay
    pub const TRIANGLE_DECAY: u8 = 0x06;
    /// Pulse with decay
    pub const PULSE_DECAY: u8 = 0x07;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_conversion() {
        assert_eq!(Register::from_addr(0x00), Some(Register::ChAFreqLo));
        assert_eq!(Register::from_addr(0x0D), Some(Register::EnvelopeShape));
        assert_eq!(Register::from_addr(0x0F), Some(Register::PortB));
        assert_eq!(Register::from_addr(0x17), Some(Register::MixerCtrl)); // Should wrap
    }

    #[test]
    fn test_channel_register_lookup() {
        assert_eq!(
            Register::tone_period(1),
            (Register::ChBFreqLo, Register::ChBFreqHi)
        );
        assert_eq!(Register::level(2), Register::ChCLevel);
        assert_eq!(Register::ChALevel.read_mask(), 0x1F);
        assert_eq!(Register::EnvelopeShape.read_mask(), 0x0F);
    }

    #[test]
    fn test_mixer_presets() {
        assert_eq!(MixerFlags::ALL_TONE.bits(), 0x38);
        assert_eq!(MixerFlags::ALL_OFF.bits(), 0x3F);
        assert_eq!(MixerFlags::ALL_NOISE.bits(), 0x07);
    }
}
