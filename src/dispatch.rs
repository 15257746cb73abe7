//! Event dispatch
//!
//! Routes parsed events to the active backend. Note events go through the
//! voice allocator; controller events follow a fixed map from the control
//! surface (eight knobs on CC1-8, four sliders on CC9-12).
//!
//! Envelope and volume controllers act on the lowest-index sounding voice
//! rather than on a voice chosen by the performer.

use serde::Serialize;

use crate::allocator::VoiceAllocator;
use crate::backend::SynthesisBackend;
use crate::midi::Event;
use crate::registry::ChipRegistry;

/// Controller numbers understood by the dispatcher
pub mod cc {
    /// First of the four volume knobs
    pub const VOLUME_FIRST: u8 = 1;
    /// Last of the four volume knobs
    pub const VOLUME_LAST: u8 = 4;
    /// Envelope attack knob
    pub const ATTACK: u8 = 5;
    /// Envelope decay knob
    pub const DECAY: u8 = 6;
    /// Sustain level knob
    pub const SUSTAIN: u8 = 7;
    /// Envelope release knob
    pub const RELEASE: u8 = 8;
    /// Vibrato slider
    pub const VIBRATO: u8 = 9;
    /// Tremolo slider
    pub const TREMOLO: u8 = 10;
    /// Pitch bend slider
    pub const PITCH_BEND: u8 = 11;
    /// Modulation slider
    pub const MODULATION: u8 = 12;
}

/// Number of physical controls on the surface
pub const CONTROL_COUNT: usize = 12;

/// Rotary or linear control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControlKind {
    /// Rotary knob
    Knob,
    /// Linear slider
    Slider,
}

/// One physical control and its last received value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Control {
    /// Controller number the control sends
    pub cc: u8,
    /// Last value received (0-127)
    pub value: u8,
    /// Knob or slider
    pub kind: ControlKind,
}

/// Last known position of every control on the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlSurface {
    controls: [Control; CONTROL_COUNT],
}

impl ControlSurface {
    /// Surface with every control at zero.
    pub fn new() -> Self {
        let controls = std::array::from_fn(|i| Control {
            cc: i as u8 + 1,
            value: 0,
            kind: if i < 8 {
                ControlKind::Knob
            } else {
                ControlKind::Slider
            },
        });
        ControlSurface { controls }
    }

    /// Record a controller value; returns `false` for controllers not on the surface.
    pub fn update(&mut self, cc: u8, value: u8) -> bool {
        match self.controls.iter_mut().find(|c| c.cc == cc) {
            Some(control) => {
                control.value = value;
                true
            }
            None => false,
        }
    }

    /// Last value of a controller on the surface.
    pub fn value(&self, cc: u8) -> Option<u8> {
        self.controls.iter().find(|c| c.cc == cc).map(|c| c.value)
    }

    /// All controls, CC1 first.
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }
}

impl Default for ControlSurface {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a pitch-bend slider position to a signed bend.
pub fn slider_to_bend(value: u8) -> i16 {
    (value.min(127) as i16 - 64) * 128
}

/// Routes events into the active backend.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    surface: ControlSurface,
}

impl Dispatcher {
    /// Dispatcher with a zeroed control surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Control surface state.
    pub fn surface(&self) -> &ControlSurface {
        &self.surface
    }

    /// Forget controller positions.
    pub fn reset(&mut self) {
        self.surface = ControlSurface::new();
    }

    /// Apply one event to the active backend of `registry`.
    pub fn dispatch(&mut self, registry: &mut ChipRegistry, event: Event) {
        if let Event::ControlChange {
            controller, value, ..
        } = event
        {
            self.surface.update(controller, value);
        }

        let Some(backend) = registry.active_mut() else {
            tracing::warn!(?event, "no active chip, event dropped");
            return;
        };
        tracing::debug!(?event, chip = %backend.kind(), "dispatch");

        match event {
            Event::NoteOn {
                note,
                velocity: 0,
                channel,
            }
            | Event::NoteOff { note, channel } => release(backend, note, channel),
            Event::NoteOn {
                note,
                velocity,
                channel,
            } => start(backend, note, velocity, channel),
            Event::ControlChange {
                controller, value, ..
            } => control_change(backend, controller, value),
            Event::ProgramChange { program, .. } => backend.set_preset(program),
            Event::PitchBend { value, .. } => backend.set_pitch_bend(value),
        }
    }
}

fn start(backend: &mut dyn SynthesisBackend, note: u8, velocity: u8, channel: u8) {
    // Re-strike a sounding note in place so a note/channel pair never owns two voices
    let voice = VoiceAllocator::find_by_note(backend, note, channel)
        .or_else(|| VoiceAllocator::allocate(backend, note, velocity, channel));
    match voice {
        Some(voice) => backend.note_on(voice, note, velocity, channel),
        None => tracing::error!(chip = %backend.kind(), "backend has no voices"),
    }
}

fn release(backend: &mut dyn SynthesisBackend, note: u8, channel: u8) {
    if let Some(voice) = VoiceAllocator::find_by_note(backend, note, channel) {
        backend.note_off(voice);
    }
}

fn control_change(backend: &mut dyn SynthesisBackend, controller: u8, value: u8) {
    let first_active = VoiceAllocator::first_active(backend);
    match controller {
        cc::VOLUME_FIRST..=cc::VOLUME_LAST => {
            if let Some(voice) = first_active {
                backend.set_volume(voice, (value as u16 * 15 / 127) as u8);
            }
        }
        cc::ATTACK => {
            if let Some(voice) = first_active {
                backend.set_attack(voice, value);
            }
        }
        cc::DECAY => {
            if let Some(voice) = first_active {
                backend.set_decay(voice, value);
            }
        }
        cc::SUSTAIN => {
            if let Some(voice) = first_active {
                backend.set_sustain(voice, value);
            }
        }
        cc::RELEASE => {
            if let Some(voice) = first_active {
                backend.set_release(voice, value);
            }
        }
        cc::VIBRATO => backend.set_vibrato(value),
        cc::TREMOLO => backend.set_tremolo(value),
        cc::PITCH_BEND => backend.set_pitch_bend(slider_to_bend(value)),
        cc::MODULATION => backend.set_modulation(value),
        _ => tracing::debug!(controller, "unmapped controller"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AllocationClock;
    use crate::bus::sim::SimulatedPsg;
    use crate::config::PortConfig;
    use crate::ym2149::registers::LEVEL_ENVELOPE_MODE;
    use crate::ym2149::{note_to_period, Ym2149Driver};

    fn setup() -> (ChipRegistry, Dispatcher, SimulatedPsg) {
        let chip = SimulatedPsg::new();
        let drv = Ym2149Driver::new(chip.clone(), PortConfig::default(), AllocationClock::new());
        let mut reg = ChipRegistry::new(vec![Box::new(drv) as Box<dyn SynthesisBackend>]);
        reg.init();
        (reg, Dispatcher::new(), chip)
    }

    fn note_on(note: u8, velocity: u8) -> Event {
        Event::NoteOn {
            note,
            velocity,
            channel: 0,
        }
    }

    fn cc(controller: u8, value: u8) -> Event {
        Event::ControlChange {
            controller,
            value,
            channel: 0,
        }
    }

    fn active_notes(reg: &ChipRegistry) -> Vec<Option<u8>> {
        reg.active()
            .unwrap()
            .voices()
            .iter()
            .map(|v| v.active.then_some(v.note))
            .collect()
    }

    #[test]
    fn test_zero_velocity_note_on_releases() {
        let (mut reg, mut disp, chip) = setup();
        disp.dispatch(&mut reg, note_on(60, 64));
        assert_eq!(active_notes(&reg), vec![Some(60), None, None]);

        disp.dispatch(&mut reg, note_on(60, 0));
        assert_eq!(active_notes(&reg), vec![None, None, None]);
        assert_eq!(chip.register(0x08), 0);
    }

    #[test]
    fn test_note_off_for_unknown_note_is_ignored() {
        let (mut reg, mut disp, _chip) = setup();
        disp.dispatch(&mut reg, note_on(60, 64));
        disp.dispatch(
            &mut reg,
            Event::NoteOff {
                note: 61,
                channel: 0,
            },
        );
        disp.dispatch(
            &mut reg,
            Event::NoteOff {
                note: 60,
                channel: 5,
            },
        );
        assert_eq!(active_notes(&reg), vec![Some(60), None, None]);
    }

    #[test]
    fn test_fourth_note_steals_oldest() {
        let (mut reg, mut disp, _chip) = setup();
        for note in [60, 64, 67, 72] {
            disp.dispatch(&mut reg, note_on(note, 100));
        }
        assert_eq!(active_notes(&reg), vec![Some(72), Some(64), Some(67)]);
    }

    #[test]
    fn test_repeated_note_reuses_voice() {
        let (mut reg, mut disp, _chip) = setup();
        disp.dispatch(&mut reg, note_on(60, 100));
        disp.dispatch(&mut reg, note_on(60, 50));
        assert_eq!(active_notes(&reg), vec![Some(60), None, None]);
        assert_eq!(reg.active().unwrap().voices()[0].velocity, 50);
    }

    #[test]
    fn test_volume_knob_targets_first_active_voice() {
        let (mut reg, mut disp, chip) = setup();
        disp.dispatch(&mut reg, note_on(60, 127));
        disp.dispatch(&mut reg, note_on(64, 127));
        disp.dispatch(
            &mut reg,
            Event::NoteOff {
                note: 60,
                channel: 0,
            },
        );

        disp.dispatch(&mut reg, cc(3, 64));
        assert_eq!(chip.register(0x09), 7);
        assert_eq!(disp.surface().value(3), Some(64));
    }

    #[test]
    fn test_envelope_knobs_without_active_voice_only_recorded() {
        let (mut reg, mut disp, chip) = setup();
        let before = chip.registers();
        disp.dispatch(&mut reg, cc(cc::ATTACK, 100));
        assert_eq!(chip.registers(), before);
        assert_eq!(disp.surface().value(cc::ATTACK), Some(100));
    }

    #[test]
    fn test_attack_enables_envelope_mode() {
        let (mut reg, mut disp, chip) = setup();
        disp.dispatch(&mut reg, note_on(60, 127));
        disp.dispatch(&mut reg, cc(cc::ATTACK, 127));
        assert_eq!(chip.register(0x0B), 255);
        assert_eq!(chip.register(0x08) & LEVEL_ENVELOPE_MODE, LEVEL_ENVELOPE_MODE);
    }

    #[test]
    fn test_pitch_bend_slider() {
        assert_eq!(slider_to_bend(64), 0);
        assert_eq!(slider_to_bend(0), -8192);
        assert_eq!(slider_to_bend(127), 8064);

        let (mut reg, mut disp, chip) = setup();
        disp.dispatch(&mut reg, note_on(60, 127));
        disp.dispatch(&mut reg, cc(cc::PITCH_BEND, 64));
        let period = chip.register(0x00) as u16 | (chip.register(0x01) as u16) << 8;
        assert_eq!(period, note_to_period(60));
    }

    #[test]
    fn test_pitch_bend_event_bends_active_voices() {
        let (mut reg, mut disp, chip) = setup();
        disp.dispatch(&mut reg, note_on(60, 127));
        disp.dispatch(
            &mut reg,
            Event::PitchBend {
                value: 8191,
                channel: 0,
            },
        );
        let period = chip.register(0x00) as u16 | (chip.register(0x01) as u16) << 8;
        assert!(period < note_to_period(60));
    }

    #[test]
    fn test_program_change_sets_preset() {
        let (mut reg, mut disp, chip) = setup();
        disp.dispatch(
            &mut reg,
            Event::ProgramChange {
                program: 1,
                channel: 0,
            },
        );
        assert_eq!(chip.register(0x0D), 0x03);
    }

    #[test]
    fn test_no_active_backend_drops_events() {
        let mut reg = ChipRegistry::new(Vec::new());
        reg.init();
        let mut disp = Dispatcher::new();
        disp.dispatch(&mut reg, note_on(60, 100));
        disp.dispatch(&mut reg, cc(1, 99));
        assert_eq!(disp.surface().value(1), Some(99));
    }

    #[test]
    fn test_surface_layout() {
        let surface = ControlSurface::new();
        assert_eq!(surface.controls().len(), CONTROL_COUNT);
        assert_eq!(surface.controls()[0].kind, ControlKind::Knob);
        assert_eq!(surface.controls()[8].cc, 9);
        assert_eq!(surface.controls()[8].kind, ControlKind::Slider);
        assert_eq!(surface.value(13), None);
    }
}
