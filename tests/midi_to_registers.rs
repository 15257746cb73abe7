use std::cell::RefCell;
use std::rc::Rc;

use ym2149_midi::bus::sim::{BusOp, FloatingBus, SimulatedPsg};
use ym2149_midi::ym2149::note_to_period;
use ym2149_midi::{
    AllocationClock, ChipKind, ChipSet, Event, PortConfig, SelectionError, Synth,
    SynthesisBackend, Voice, Ym2149Driver,
};

fn ready() -> (Synth, SimulatedPsg) {
    let chip = SimulatedPsg::new();
    let mut synth = Synth::with_ym2149(chip.clone(), PortConfig::default());
    assert_eq!(synth.reinit(), ChipSet::YM2149);
    chip.clear_ops();
    (synth, chip)
}

fn period(chip: &SimulatedPsg, voice: u8) -> u16 {
    let regs = chip.registers();
    regs[voice as usize * 2] as u16 | (regs[voice as usize * 2 + 1] as u16) << 8
}

#[test]
fn note_on_then_running_status_release() {
    let (mut synth, chip) = ready();

    let events = synth.feed_all(&[0x90, 0x3C, 0x40]);
    assert_eq!(
        events,
        vec![Event::NoteOn {
            note: 60,
            velocity: 64,
            channel: 0
        }]
    );
    assert_eq!(period(&chip, 0), note_to_period(60));
    assert_eq!(chip.register(0x08), 7);

    let events = synth.feed_all(&[0x3C, 0x00]);
    assert_eq!(
        events,
        vec![Event::NoteOn {
            note: 60,
            velocity: 0,
            channel: 0
        }]
    );
    assert_eq!(chip.register(0x08), 0);
    let voices = synth.registry().active().unwrap().voices();
    assert!(voices.iter().all(|v| !v.active));
}

#[test]
fn realtime_byte_inside_message() {
    let (mut synth, chip) = ready();
    let events = synth.feed_all(&[0x90, 0x3C, 0xF8, 0x40]);
    assert_eq!(events.len(), 1);
    assert_eq!(period(&chip, 0), note_to_period(60));
}

#[test]
fn system_common_byte_cancels_running_status() {
    let (mut synth, chip) = ready();
    let events = synth.feed_all(&[0x90, 0x3C, 0xF0, 0x40, 0x3C, 0x40]);
    assert!(events.is_empty());
    assert_eq!(chip.register(0x08), 15);
}

#[test]
fn chord_fills_voices_then_steals_oldest() {
    let (mut synth, chip) = ready();
    synth.feed_all(&[0x90, 60, 100, 64, 100, 67, 100]);
    assert_eq!(period(&chip, 0), note_to_period(60));
    assert_eq!(period(&chip, 1), note_to_period(64));
    assert_eq!(period(&chip, 2), note_to_period(67));

    synth.feed_all(&[72, 100]);
    assert_eq!(period(&chip, 0), note_to_period(72));

    // The stolen note no longer resolves to a voice
    synth.feed_all(&[0x80, 60, 0]);
    let voices = synth.registry().active().unwrap().voices();
    assert!(voices[0].plays(72, 0));
    assert_eq!(chip.register(0x08), 11);
}

#[test]
fn pitch_bend_round_trip_to_centre() {
    let (mut synth, chip) = ready();
    synth.feed_all(&[0x90, 60, 100]);

    synth.feed_all(&[0xE0, 0x00, 0x00]);
    let low = period(&chip, 0);
    assert!(low > note_to_period(60));
    assert!((1..=4095).contains(&low));

    synth.feed_all(&[0x7F, 0x7F]);
    let high = period(&chip, 0);
    assert!(high < note_to_period(60));
    assert!(high >= 1);

    synth.feed_all(&[0x00, 0x40]);
    assert_eq!(period(&chip, 0), note_to_period(60));
}

#[test]
fn controllers_reach_registers() {
    let (mut synth, chip) = ready();
    synth.feed_all(&[0x90, 60, 127]);

    // Volume knob, decay knob, preset
    synth.feed_all(&[0xB0, 1, 127, 6, 100]);
    synth.feed_all(&[0xC0, 3]);

    assert_eq!(chip.register(0x08), 15);
    assert_eq!(chip.register(0x0D), 0x07);
    assert_eq!(synth.dispatcher().surface().value(6), Some(100));
}

#[test]
fn absent_chip_detection_leaves_nothing_behind() {
    let bus = FloatingBus::new();
    let mut synth = Synth::with_ym2149(bus.clone(), PortConfig::default());
    assert!(synth.reinit().is_empty());
    assert!(synth.registry().active().is_none());

    let ops = bus.ops();
    assert_eq!(ops.first(), Some(&BusOp::Mask));
    assert_eq!(ops.last(), Some(&BusOp::Unmask));

    // Events are parsed and dropped without touching the bus
    let before = bus.ops().len();
    synth.feed_all(&[0x90, 60, 100]);
    assert_eq!(bus.ops().len(), before);
}

/// Backend that only records what it was asked to do.
struct Recorder {
    kind: ChipKind,
    voices: [Voice; 2],
    log: Rc<RefCell<Vec<&'static str>>>,
    clock: AllocationClock,
}

impl SynthesisBackend for Recorder {
    fn kind(&self) -> ChipKind {
        self.kind
    }
    fn detect(&mut self) -> bool {
        true
    }
    fn init(&mut self) {
        self.log.borrow_mut().push("init");
    }
    fn reset(&mut self) {
        self.voices = [Voice::default(); 2];
    }
    fn all_off(&mut self) {
        for v in &mut self.voices {
            v.active = false;
        }
    }
    fn note_on(&mut self, voice: usize, note: u8, velocity: u8, channel: u8) {
        if let Some(slot) = self.voices.get_mut(voice) {
            *slot = Voice {
                active: true,
                note,
                velocity,
                channel,
                allocated_at: self.clock.tick(),
            };
        }
        self.log.borrow_mut().push("note_on");
    }
    fn note_off(&mut self, voice: usize) {
        if let Some(slot) = self.voices.get_mut(voice) {
            slot.active = false;
        }
    }
    fn set_volume(&mut self, _voice: usize, _value: u8) {}
    fn set_attack(&mut self, _voice: usize, _value: u8) {}
    fn set_decay(&mut self, _voice: usize, _value: u8) {}
    fn set_sustain(&mut self, _voice: usize, _value: u8) {}
    fn set_release(&mut self, _voice: usize, _value: u8) {}
    fn set_pitch_bend(&mut self, _value: i16) {}
    fn set_preset(&mut self, _program: u8) {}
    fn panic(&mut self) {
        self.all_off();
        self.log.borrow_mut().push("panic");
    }
    fn voices(&self) -> &[Voice] {
        &self.voices
    }
}

#[test]
fn switching_chips_silences_the_outgoing_one() {
    let chip = SimulatedPsg::new().without_op_log();
    let clock = AllocationClock::new();
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let psg = Ym2149Driver::new(chip.clone(), PortConfig::default(), clock.clone());
    let fm = Recorder {
        kind: ChipKind::Opl3,
        voices: [Voice::default(); 2],
        log: Rc::clone(&log),
        clock: clock.clone(),
    };
    let backends: Vec<Box<dyn SynthesisBackend>> = vec![Box::new(psg), Box::new(fm)];
    let mut synth = Synth::new(backends, clock);

    assert_eq!(synth.reinit(), ChipSet::YM2149 | ChipSet::OPL3);
    assert_eq!(synth.registry().active_kind(), Some(ChipKind::Ym2149));

    synth.feed_all(&[0x90, 60, 100]);
    assert_eq!(chip.register(0x08), 11);

    synth.select(ChipKind::Opl3).unwrap();
    assert_eq!(chip.register(0x07), 0x3F);
    assert_eq!(chip.register(0x08), 0);

    synth.feed_all(&[0x90, 62, 100]);
    assert_eq!(*log.borrow(), vec!["init", "note_on"]);

    assert_eq!(
        synth.registry_mut().select_id(9),
        Err(SelectionError::Unknown(9))
    );
    assert_eq!(synth.registry().active_kind(), Some(ChipKind::Opl3));
}
