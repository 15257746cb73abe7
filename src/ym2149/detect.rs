//! Non-destructive YM2149 presence detection
//!
//! Detection writes test patterns to registers with known readable bits and
//! compares the read-back. An empty socket returns a floating value that does
//! not follow the writes. Every register it touches is checkpointed
//! first and restored afterwards, whatever the outcome, and the whole
//! sequence runs with interrupts masked so no handler sees intermediate
//! values.

use crate::bus::{PortIo, RegisterBus};

use super::registers::{Register, LEVEL_VOLUME_MASK, MIXER_TEST_MASK};

/// Patterns written to each tested register.
pub const TEST_PATTERNS: [u8; 4] = [0x00, 0x55, 0xAA, 0xFF];

/// Value written to the tone period register; it has no read-only bits.
pub const PERIOD_SENTINEL: u8 = 0x42;

/// Registers saved before testing and restored afterwards.
const CHECKPOINTED: [Register; 4] = [
    Register::MixerCtrl,
    Register::ChALevel,
    Register::ChBLevel,
    Register::ChAFreqLo,
];

/// Run the detection protocol on `bus`.
pub fn detect_ym2149<P: PortIo>(bus: &mut RegisterBus<P>) -> bool {
    let present = {
        let mut cs = bus.critical_section();

        let saved = CHECKPOINTED.map(|reg| cs.read_register(reg.addr()));

        let present = check_masked(&mut cs, Register::MixerCtrl, MIXER_TEST_MASK)
            && check_masked(&mut cs, Register::ChALevel, LEVEL_VOLUME_MASK)
            && check_exact(&mut cs, Register::ChAFreqLo, PERIOD_SENTINEL);

        for (reg, value) in CHECKPOINTED.iter().zip(saved) {
            cs.write_register(reg.addr(), value);
        }
        present
    };

    tracing::debug!(present, "ym2149 detection finished");
    present
}

/// Write each test pattern and compare the masked read-back.
fn check_masked<P: PortIo>(bus: &mut RegisterBus<P>, reg: Register, mask: u8) -> bool {
    TEST_PATTERNS.iter().all(|&pattern| {
        bus.write_register(reg.addr(), pattern);
        let read_back = bus.read_register(reg.addr());
        read_back & mask == pattern & mask
    })
}

fn check_exact<P: PortIo>(bus: &mut RegisterBus<P>, reg: Register, value: u8) -> bool {
    bus.write_register(reg.addr(), value);
    bus.read_register(reg.addr()) == value
}
