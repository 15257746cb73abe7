//! Simulated bus endpoints
//!
//! [`SimulatedPsg`] behaves like a YM2149 wired to the address/data port
//! pair: the address port latches a register index and reads back the latched
//! register, the data port stores values masked to each register's
//! implemented bits. [`FloatingBus`] models an empty socket where every read
//! returns the same sentinel regardless of writes.
//!
//! Both record the bus operations they observe so tests can check ordering,
//! and both track interrupt masking.

use std::sync::Arc;

use parking_lot::Mutex;

use super::PortIo;
use crate::config::PortConfig;
use crate::ym2149::registers::Register;

fn implemented_bits(reg: u8) -> u8 {
    Register::from_addr(reg).map_or(0xFF, |r| r.read_mask())
}

/// One observed bus operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    /// Byte written to a port
    Write {
        /// Port number
        port: u8,
        /// Value written
        value: u8,
    },
    /// Byte read from a port
    Read {
        /// Port number
        port: u8,
    },
    /// Settle delay between bus phases
    Settle,
    /// Interrupts masked
    Mask,
    /// Interrupts unmasked
    Unmask,
}

#[derive(Debug)]
struct SimState {
    ports: PortConfig,
    regs: [u8; 16],
    selected: usize,
    ops: Vec<BusOp>,
    record: bool,
    masked: bool,
}

impl SimState {
    fn log(&mut self, op: BusOp) {
        if self.record {
            self.ops.push(op);
        }
    }
}

/// Register-accurate stand-in for a YM2149 on the bus.
///
/// Clones share the same chip, so a test can keep a handle while the driver
/// owns another.
#[derive(Debug, Clone)]
pub struct SimulatedPsg {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedPsg {
    /// Chip on the default port pair, recording bus operations.
    pub fn new() -> Self {
        Self::with_ports(PortConfig::default())
    }

    /// Chip answering on a specific port pair.
    pub fn with_ports(ports: PortConfig) -> Self {
        SimulatedPsg {
            state: Arc::new(Mutex::new(SimState {
                ports,
                regs: [0; 16],
                selected: 0,
                ops: Vec::new(),
                record: true,
                masked: false,
            })),
        }
    }

    /// Stop recording bus operations (for long-running hosts).
    pub fn without_op_log(self) -> Self {
        {
            let mut state = self.state.lock();
            state.record = false;
            state.ops.clear();
        }
        self
    }

    /// Current value of a register.
    pub fn register(&self, reg: u8) -> u8 {
        self.state.lock().regs[(reg & 0x0F) as usize]
    }

    /// Snapshot of all 16 registers.
    pub fn registers(&self) -> [u8; 16] {
        self.state.lock().regs
    }

    /// Preload a register without touching the bus.
    pub fn set_register(&self, reg: u8, value: u8) {
        self.state.lock().regs[(reg & 0x0F) as usize] = value & implemented_bits(reg);
    }

    /// Bus operations observed so far.
    pub fn ops(&self) -> Vec<BusOp> {
        self.state.lock().ops.clone()
    }

    /// Forget recorded bus operations.
    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Register writes observed so far, as `(register, value)` pairs.
    pub fn register_writes(&self) -> Vec<(u8, u8)> {
        let state = self.state.lock();
        let mut latched = 0u8;
        let mut writes = Vec::new();
        for op in &state.ops {
            if let BusOp::Write { port, value } = *op {
                if port == state.ports.addr_port {
                    latched = value & 0x0F;
                } else if port == state.ports.data_port {
                    writes.push((latched, value));
                }
            }
        }
        writes
    }

    /// `true` while interrupts are masked.
    pub fn interrupts_masked(&self) -> bool {
        self.state.lock().masked
    }
}

impl Default for SimulatedPsg {
    fn default() -> Self {
        Self::new()
    }
}

impl PortIo for SimulatedPsg {
    fn write(&mut self, port: u8, value: u8) {
        let mut state = self.state.lock();
        state.log(BusOp::Write { port, value });
        if port == state.ports.addr_port {
            state.selected = (value & 0x0F) as usize;
        } else if port == state.ports.data_port {
            let reg = state.selected;
            state.regs[reg] = value & implemented_bits(reg as u8);
            tracing::trace!(reg, value, "psg register write");
        }
    }

    fn read(&mut self, port: u8) -> u8 {
        let mut state = self.state.lock();
        state.log(BusOp::Read { port });
        if port == state.ports.addr_port {
            state.regs[state.selected]
        } else {
            0xFF
        }
    }

    fn settle(&mut self) {
        self.state.lock().log(BusOp::Settle);
    }

    fn mask_interrupts(&mut self) {
        let mut state = self.state.lock();
        state.log(BusOp::Mask);
        state.masked = true;
    }

    fn unmask_interrupts(&mut self) {
        let mut state = self.state.lock();
        state.log(BusOp::Unmask);
        state.masked = false;
    }
}

/// Empty socket: reads float to a fixed value, writes go nowhere.
#[derive(Debug, Clone)]
pub struct FloatingBus {
    sentinel: u8,
    ops: Arc<Mutex<Vec<BusOp>>>,
    masked: Arc<Mutex<bool>>,
}

impl FloatingBus {
    /// Bus whose reads all return 0xFF (pulled-up data lines).
    pub fn new() -> Self {
        Self::with_sentinel(0xFF)
    }

    /// Bus whose reads all return `sentinel`.
    pub fn with_sentinel(sentinel: u8) -> Self {
        FloatingBus {
            sentinel,
            ops: Arc::new(Mutex::new(Vec::new())),
            masked: Arc::new(Mutex::new(false)),
        }
    }

    /// Bus operations observed so far.
    pub fn ops(&self) -> Vec<BusOp> {
        self.ops.lock().clone()
    }

    /// `true` while interrupts are masked.
    pub fn interrupts_masked(&self) -> bool {
        *self.masked.lock()
    }
}

impl Default for FloatingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl PortIo for FloatingBus {
    fn write(&mut self, port: u8, value: u8) {
        self.ops.lock().push(BusOp::Write { port, value });
    }

    fn read(&mut self, port: u8) -> u8 {
        self.ops.lock().push(BusOp::Read { port });
        self.sentinel
    }

    fn settle(&mut self) {
        self.ops.lock().push(BusOp::Settle);
    }

    fn mask_interrupts(&mut self) {
        self.ops.lock().push(BusOp::Mask);
        *self.masked.lock() = true;
    }

    fn unmask_interrupts(&mut self) {
        self.ops.lock().push(BusOp::Unmask);
        *self.masked.lock() = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_masks_applied() {
        let mut chip = SimulatedPsg::new();
        let ports = PortConfig::default();
        chip.write(ports.addr_port, 0x01);
        chip.write(ports.data_port, 0xFF);
        assert_eq!(chip.register(0x01), 0x0F);

        chip.write(ports.addr_port, 0x08);
        chip.write(ports.data_port, 0xFF);
        assert_eq!(chip.register(0x08), 0x1F);
    }

    #[test]
    fn test_foreign_port_ignored() {
        let mut chip = SimulatedPsg::new();
        chip.write(0x10, 0x07);
        chip.write(0x11, 0x55);
        assert_eq!(chip.registers(), [0; 16]);
        assert_eq!(chip.read(0x10), 0xFF);
    }

    #[test]
    fn test_register_writes_decoded() {
        let mut chip = SimulatedPsg::new();
        let ports = PortConfig::default();
        chip.write(ports.addr_port, 0x08);
        chip.write(ports.data_port, 0x0A);
        chip.write(ports.addr_port, 0x07);
        chip.write(ports.data_port, 0x38);
        assert_eq!(chip.register_writes(), vec![(0x08, 0x0A), (0x07, 0x38)]);
    }

    #[test]
    fn test_op_log_can_be_disabled() {
        let mut chip = SimulatedPsg::new().without_op_log();
        chip.write(0xD8, 0x00);
        assert!(chip.ops().is_empty());
    }

    #[test]
    fn test_floating_bus_reads_sentinel() {
        let mut bus = FloatingBus::with_sentinel(0xA5);
        bus.write(0xD8, 0x07);
        assert_eq!(bus.read(0xD8), 0xA5);
        assert_eq!(bus.read(0xD0), 0xA5);
    }
}
