//! Synthesizer context
//!
//! [`Synth`] ties the byte parser, the dispatcher and the chip registry
//! together. It is driven cooperatively: every call to [`Synth::poll`] takes at
//! most one byte from a [`ByteSource`] and returns immediately when none is
//! waiting, so a caller can interleave other work between bytes.

use std::sync::mpsc::{Receiver, TryRecvError};

use crate::backend::{AllocationClock, ChipKind, ChipSet, SynthesisBackend};
use crate::bus::PortIo;
use crate::config::PortConfig;
use crate::dispatch::Dispatcher;
use crate::midi::{Event, ParserState};
use crate::registry::{ChipRegistry, SelectionError};
use crate::ym2149::Ym2149Driver;

/// Non-blocking source of MIDI bytes.
pub trait ByteSource {
    /// Next byte if one is waiting.
    fn try_read_byte(&mut self) -> Option<u8>;
}

/// Byte source over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Source yielding `bytes` in order.
    pub fn new(bytes: &'a [u8]) -> Self {
        SliceSource { bytes, pos: 0 }
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

impl ByteSource for SliceSource<'_> {
    fn try_read_byte(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }
}

/// Byte source fed by another thread through a channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Receiver<u8>,
    closed: bool,
}

impl ChannelSource {
    /// Source reading from `rx`.
    pub fn new(rx: Receiver<u8>) -> Self {
        ChannelSource { rx, closed: false }
    }

    /// Sender has gone away and every byte has been read.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ByteSource for ChannelSource {
    fn try_read_byte(&mut self) -> Option<u8> {
        match self.rx.try_recv() {
            Ok(byte) => Some(byte),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }
}

/// Parser, dispatcher and chip registry behind one entry point.
#[derive(Debug)]
pub struct Synth {
    registry: ChipRegistry,
    parser: ParserState,
    dispatcher: Dispatcher,
    clock: AllocationClock,
}

impl Synth {
    /// Context over `backends`, which must stamp allocations from `clock`.
    ///
    /// Nothing is detected until [`reinit`](Self::reinit) is called.
    pub fn new(backends: Vec<Box<dyn SynthesisBackend>>, clock: AllocationClock) -> Self {
        Synth {
            registry: ChipRegistry::new(backends),
            parser: ParserState::new(),
            dispatcher: Dispatcher::new(),
            clock,
        }
    }

    /// Context with a single YM2149 driver on `io`.
    pub fn with_ym2149<P: PortIo + 'static>(io: P, ports: PortConfig) -> Self {
        let clock = AllocationClock::new();
        let driver = Ym2149Driver::new(io, ports, clock.clone());
        let backends: Vec<Box<dyn SynthesisBackend>> = vec![Box::new(driver)];
        Self::new(backends, clock)
    }

    /// Rerun detection and select the default chip.
    ///
    /// Parser state, controller positions and allocation stamps start over.
    pub fn reinit(&mut self) -> ChipSet {
        self.parser = ParserState::new();
        self.dispatcher.reset();
        self.clock.reset();
        let detected = self.registry.init();
        match self.registry.active_kind() {
            Some(kind) => tracing::info!(chip = %kind, "synth ready"),
            None => tracing::warn!("no sound chip detected, events will be dropped"),
        }
        detected
    }

    /// Run one byte through the parser and dispatch any completed event.
    pub fn feed(&mut self, byte: u8) -> Option<Event> {
        let (next, event) = self.parser.step(byte);
        self.parser = next;
        if let Some(event) = event {
            self.dispatcher.dispatch(&mut self.registry, event);
        }
        event
    }

    /// Feed every byte of `bytes`, returning the events they completed.
    pub fn feed_all(&mut self, bytes: &[u8]) -> Vec<Event> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// Consume at most one byte from `source`. Returns `false` when none was waiting.
    pub fn poll(&mut self, source: &mut impl ByteSource) -> bool {
        match source.try_read_byte() {
            Some(byte) => {
                self.feed(byte);
                true
            }
            None => false,
        }
    }

    /// Switch the active chip.
    pub fn select(&mut self, kind: ChipKind) -> Result<(), SelectionError> {
        self.registry.select(kind)
    }

    /// Switch the active chip by numeric identifier.
    pub fn select_id(&mut self, id: u8) -> crate::Result<ChipKind> {
        let kind = ChipKind::from_id(id).ok_or(SelectionError::Unknown(id))?;
        self.registry.select(kind)?;
        Ok(kind)
    }

    /// Silence the active chip.
    pub fn panic(&mut self) {
        if let Some(backend) = self.registry.active_mut() {
            backend.panic();
        }
    }

    /// Chip registry.
    pub fn registry(&self) -> &ChipRegistry {
        &self.registry
    }

    /// Mutable chip registry.
    pub fn registry_mut(&mut self) -> &mut ChipRegistry {
        &mut self.registry
    }

    /// Current parser state.
    pub fn parser(&self) -> &ParserState {
        &self.parser
    }

    /// Dispatcher and its control surface.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Allocation clock shared with the backends.
    pub fn clock(&self) -> &AllocationClock {
        &self.clock
    }
}
