//! Register-level YM2149 driver
//!
//! Maps the backend capability set onto the PSG's registers. The three tone
//! channels are the three voices. Attack and release both program the single
//! envelope period register pair, so whichever was written last wins; the
//! chip has one envelope generator shared by all channels.

use crate::backend::{AllocationClock, ChipKind, SynthesisBackend, Voice};
use crate::bus::{PortIo, RegisterBus};
use crate::config::PortConfig;

use super::detect::detect_ym2149;
use super::registers::{
    shape, MixerFlags, Register, LEVEL_ENVELOPE_MODE, LEVEL_VOLUME_MASK,
    MAX_VOLUME, SOUND_REGISTER_COUNT,
};
use super::tables::{
    apply_pitch_bend, note_to_period, scale_to_envelope_period, scale_to_volume, PERIOD_MAX,
};

/// Voices (tone channels) on one PSG
pub const VOICE_COUNT: usize = 3;

/// Noise period programmed by `init`
pub const DEFAULT_NOISE_PERIOD: u8 = 0x1F;

/// Envelope threshold above which decay selects the decaying shape
pub const DECAY_THRESHOLD: u8 = 64;

/// Per-channel register state the driver keeps alongside each voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelState {
    /// Fixed volume (0-15)
    pub volume: u8,
    /// Level register follows the envelope generator
    pub envelope_enabled: bool,
    /// Tone period currently programmed
    pub period: u16,
}

/// YM2149 backend driving a real or simulated chip over a [`RegisterBus`].
#[derive(Debug)]
pub struct Ym2149Driver<P> {
    bus: RegisterBus<P>,
    voices: [Voice; VOICE_COUNT],
    channels: [ChannelState; VOICE_COUNT],
    clock: AllocationClock,
}

impl<P: PortIo> Ym2149Driver<P> {
    /// Driver on `ports`, stamping allocations from `clock`.
    pub fn new(io: P, ports: PortConfig, clock: AllocationClock) -> Self {
        Ym2149Driver {
            bus: RegisterBus::new(io, ports),
            voices: [Voice::default(); VOICE_COUNT],
            channels: [ChannelState::default(); VOICE_COUNT],
            clock,
        }
    }

    /// Register bus in use.
    pub fn bus(&self) -> &RegisterBus<P> {
        &self.bus
    }

    /// Mutable access to the register bus.
    pub fn bus_mut(&mut self) -> &mut RegisterBus<P> {
        &mut self.bus
    }

    /// Register state of a channel.
    pub fn channel(&self, voice: usize) -> Option<&ChannelState> {
        self.channels.get(voice)
    }

    /// Write one register over the bus.
    pub fn write_register(&mut self, reg: Register, value: u8) {
        self.bus.write_register(reg.addr(), value);
    }

    /// Program a channel's tone period (12 bits).
    pub fn set_period(&mut self, voice: usize, period: u16) {
        if voice >= VOICE_COUNT {
            return;
        }
        let period = period.min(PERIOD_MAX);
        let (lo, hi) = Register::tone_period(voice);
        self.write_register(lo, (period & 0xFF) as u8);
        self.write_register(hi, ((period >> 8) & 0x0F) as u8);
        self.channels[voice].period = period;
    }

    fn write_level(&mut self, voice: usize) {
        let ch = self.channels[voice];
        let mut value = ch.volume & LEVEL_VOLUME_MASK;
        if ch.envelope_enabled {
            value |= LEVEL_ENVELOPE_MODE;
        }
        self.write_register(Register::level(voice), value);
    }

    fn write_envelope_period(&mut self, value: u8) {
        let period = scale_to_envelope_period(value);
        self.write_register(Register::EnvelopeFreqLo, (period & 0xFF) as u8);
        self.write_register(Register::EnvelopeFreqHi, (period >> 8) as u8);
    }

    fn write_mixer(&mut self, flags: MixerFlags) {
        self.write_register(Register::MixerCtrl, flags.bits());
    }

    /// Enable every tone source and disable noise.
    pub fn enable_tone_mixer(&mut self) {
        self.write_mixer(MixerFlags::ALL_TONE);
    }

    /// Route the noise generator to all channels and mute tones.
    pub fn enable_noise_mixer(&mut self, noise_period: u8) {
        self.write_register(Register::NoiseFreq, noise_period);
        self.write_mixer(MixerFlags::ALL_NOISE);
    }
}

impl<P: PortIo> SynthesisBackend for Ym2149Driver<P> {
    fn kind(&self) -> ChipKind {
        ChipKind::Ym2149
    }

    fn detect(&mut self) -> bool {
        detect_ym2149(&mut self.bus)
    }

    fn init(&mut self) {
        self.reset();
        self.write_mixer(MixerFlags::ALL_TONE);
        for voice in 0..VOICE_COUNT {
            self.channels[voice].volume = MAX_VOLUME;
            self.write_level(voice);
        }
        self.write_register(Register::NoiseFreq, DEFAULT_NOISE_PERIOD);
    }

    fn reset(&mut self) {
        self.voices = [Voice::default(); VOICE_COUNT];
        self.channels = [ChannelState::default(); VOICE_COUNT];
        for addr in 0..SOUND_REGISTER_COUNT {
            if let Some(reg) = Register::from_addr(addr) {
                self.write_register(reg, 0x00);
            }
        }
        self.write_mixer(MixerFlags::ALL_OFF);
    }

    fn all_off(&mut self) {
        for voice in 0..VOICE_COUNT {
            self.note_off(voice);
        }
    }

    fn note_on(&mut self, voice: usize, note: u8, velocity: u8, channel: u8) {
        if voice >= VOICE_COUNT {
            return;
        }
        self.voices[voice] = Voice {
            active: true,
            note,
            velocity,
            channel,
            allocated_at: self.clock.tick(),
        };

        self.set_period(voice, note_to_period(note));
        self.set_volume(voice, scale_to_volume(velocity));
    }

    fn note_off(&mut self, voice: usize) {
        if voice >= VOICE_COUNT {
            return;
        }
        self.voices[voice].active = false;
        self.write_register(Register::level(voice), 0x00);
    }

    fn set_volume(&mut self, voice: usize, value: u8) {
        if voice >= VOICE_COUNT {
            return;
        }
        self.channels[voice].volume = value.min(MAX_VOLUME);
        self.write_level(voice);
    }

    fn set_attack(&mut self, voice: usize, value: u8) {
        if voice >= VOICE_COUNT {
            return;
        }
        self.write_envelope_period(value);
        self.channels[voice].envelope_enabled = true;
        self.write_level(voice);
    }

    fn set_decay(&mut self, voice: usize, value: u8) {
        if voice >= VOICE_COUNT {
            return;
        }
        let shape = if value > DECAY_THRESHOLD {
            shape::TRIANGLE_DECAY
        } else {
            shape::TRIANGLE
        };
        self.write_register(Register::EnvelopeShape, shape);
    }

    fn set_sustain(&mut self, voice: usize, value: u8) {
        self.set_volume(voice, scale_to_volume(value));
    }

    fn set_release(&mut self, voice: usize, value: u8) {
        if voice >= VOICE_COUNT {
            return;
        }
        // Same registers as attack: one envelope generator
        self.write_envelope_period(value);
    }

    fn set_pitch_bend(&mut self, value: i16) {
        for voice in 0..VOICE_COUNT {
            if self.voices[voice].active {
                let base = note_to_period(self.voices[voice].note);
                self.set_period(voice, apply_pitch_bend(base, value));
            }
        }
    }

    fn set_preset(&mut self, program: u8) {
        let shape = match program {
            0 => shape::OFF,
            1 => shape::SAWTOOTH,
            2 => shape::TRIANGLE,
            3 => shape::PULSE_DECAY,
            _ => return,
        };
        self.write_register(Register::EnvelopeShape, shape);
    }

    fn panic(&mut self) {
        self.all_off();
        self.write_mixer(MixerFlags::ALL_OFF);
    }

    fn voices(&self) -> &[Voice] {
        &self.voices
    }
}
