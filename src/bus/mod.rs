//! Register Bus Domain
//!
//! The PSG sits behind a two-port, handshake-free bus: a register index is
//! latched through the address port, then the value is written through the
//! data port. Without a ready signal the settle delay between the two phases
//! is a hard timing contract.
//!
//! - [`PortIo`] - raw port primitives supplied by the host
//! - [`RegisterBus`] - address/data protocol on top of a [`PortIo`]
//! - [`CriticalSection`] - scoped interrupt masking around bus sequences
//! - [`sim`] - simulated chip and floating bus for hosts without hardware

#[cfg(unix)]
pub mod devport;
pub mod sim;

use std::ops::{Deref, DerefMut};

use crate::config::PortConfig;

/// Spin iterations used by the default settle delay.
pub const SETTLE_SPINS: u32 = 10;

/// Raw port access supplied by the host platform.
///
/// Implementations are expected to be cheap; every register access costs two
/// port operations plus two settle delays.
pub trait PortIo {
    /// Write a byte to an I/O port.
    fn write(&mut self, port: u8, value: u8);

    /// Read a byte from an I/O port.
    fn read(&mut self, port: u8) -> u8;

    /// Wait long enough for the chip to latch the previous bus phase.
    fn settle(&mut self) {
        for _ in 0..SETTLE_SPINS {
            std::hint::spin_loop();
        }
    }

    /// Mask interrupts. Hosts without interrupt control keep the no-op.
    fn mask_interrupts(&mut self) {}

    /// Unmask interrupts.
    fn unmask_interrupts(&mut self) {}
}

impl<P: PortIo + ?Sized> PortIo for Box<P> {
    fn write(&mut self, port: u8, value: u8) {
        (**self).write(port, value)
    }

    fn read(&mut self, port: u8) -> u8 {
        (**self).read(port)
    }

    fn settle(&mut self) {
        (**self).settle()
    }

    fn mask_interrupts(&mut self) {
        (**self).mask_interrupts()
    }

    fn unmask_interrupts(&mut self) {
        (**self).unmask_interrupts()
    }
}

/// Two-phase register access over a pair of I/O ports.
#[derive(Debug)]
pub struct RegisterBus<P> {
    io: P,
    ports: PortConfig,
}

impl<P: PortIo> RegisterBus<P> {
    /// Create a bus on the given port pair.
    pub fn new(io: P, ports: PortConfig) -> Self {
        RegisterBus { io, ports }
    }

    /// Port pair in use.
    pub fn ports(&self) -> PortConfig {
        self.ports
    }

    /// Underlying port implementation.
    pub fn io(&self) -> &P {
        &self.io
    }

    /// Mutable access to the underlying port implementation.
    pub fn io_mut(&mut self) -> &mut P {
        &mut self.io
    }

    /// Release the port implementation.
    pub fn into_inner(self) -> P {
        self.io
    }

    /// Latch `reg` and write `value` into it.
    pub fn write_register(&mut self, reg: u8, value: u8) {
        self.io.write(self.ports.addr_port, reg);
        self.io.settle();
        self.io.write(self.ports.data_port, value);
        self.io.settle();
    }

    /// Latch `reg` and read it back.
    ///
    /// Read-back goes through the address port; the data port is write-only
    /// on this bus.
    pub fn read_register(&mut self, reg: u8) -> u8 {
        self.io.write(self.ports.addr_port, reg);
        self.io.settle();
        self.io.read(self.ports.addr_port)
    }

    /// Mask interrupts until the returned guard is dropped.
    pub fn critical_section(&mut self) -> CriticalSection<'_, P> {
        CriticalSection::new(self)
    }
}

/// Interrupts stay masked for the lifetime of this guard.
///
/// Unmasking happens in `Drop`, so every exit path of the guarded sequence
/// (including early returns) restores interrupts.
pub struct CriticalSection<'a, P: PortIo> {
    bus: &'a mut RegisterBus<P>,
}

impl<'a, P: PortIo> CriticalSection<'a, P> {
    fn new(bus: &'a mut RegisterBus<P>) -> Self {
        bus.io.mask_interrupts();
        CriticalSection { bus }
    }
}

impl<P: PortIo> Deref for CriticalSection<'_, P> {
    type Target = RegisterBus<P>;

    fn deref(&self) -> &Self::Target {
        self.bus
    }
}

impl<P: PortIo> DerefMut for CriticalSection<'_, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.bus
    }
}

impl<P: PortIo> Drop for CriticalSection<'_, P> {
    fn drop(&mut self) {
        self.bus.io.unmask_interrupts();
    }
}
