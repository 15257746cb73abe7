//! Chip registry
//!
//! Owns every registered backend, records which ones answered detection, and
//! keeps at most one of them active. Switching always silences the outgoing
//! chip before the incoming one is initialised, so no note can hang across a
//! chip change.

use thiserror::Error;

use crate::backend::{ChipKind, ChipSet, SynthesisBackend};

/// Reasons a backend cannot be selected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionError {
    /// Known kind that failed detection
    #[error("{0} was not detected")]
    NotDetected(ChipKind),

    /// Identifier that names no backend kind
    #[error("Unknown chip id {0}")]
    Unknown(u8),
}

/// Registered backends, the detected set and the active selection.
pub struct ChipRegistry {
    backends: Vec<Box<dyn SynthesisBackend>>,
    detected: ChipSet,
    active: Option<usize>,
}

impl ChipRegistry {
    /// Registry over the given drivers. Nothing is detected or selected yet.
    pub fn new(backends: Vec<Box<dyn SynthesisBackend>>) -> Self {
        ChipRegistry {
            backends,
            detected: ChipSet::empty(),
            active: None,
        }
    }

    /// Detect chips and select the preferred one that answered.
    ///
    /// Safe to call again: any active chip is silenced and the registry starts
    /// over from an empty detected set.
    pub fn init(&mut self) -> ChipSet {
        if let Some(active) = self.active_mut() {
            active.panic();
        }
        self.active = None;

        let detected = self.detect();
        if let Some(kind) = detected.kinds().next() {
            if let Err(err) = self.select(kind) {
                tracing::warn!("default selection failed: {err}");
            }
        }
        detected
    }

    /// Run every registered driver's detection routine.
    fn detect(&mut self) -> ChipSet {
        let mut detected = ChipSet::empty();
        for backend in &mut self.backends {
            let kind = backend.kind();
            if backend.detect() {
                tracing::info!(chip = %kind, "detected");
                detected |= kind.flag();
            } else {
                tracing::info!(chip = %kind, "not detected");
            }
        }
        self.detected = detected;
        detected
    }

    /// Chips that answered the last detection pass.
    pub fn detected(&self) -> ChipSet {
        self.detected
    }

    /// Make `kind` the active backend.
    ///
    /// The outgoing backend is silenced first, then the incoming one is
    /// initialised. On error the active backend is left untouched.
    pub fn select(&mut self, kind: ChipKind) -> Result<(), SelectionError> {
        // Only registered backends ever enter the detected set
        let index = self
            .backends
            .iter()
            .position(|b| b.kind() == kind)
            .filter(|_| self.detected.has(kind));
        let Some(index) = index else {
            tracing::warn!(chip = %kind, "selection rejected: not detected");
            return Err(SelectionError::NotDetected(kind));
        };

        if let Some(outgoing) = self.active_mut() {
            outgoing.panic();
        }

        self.active = Some(index);
        self.backends[index].init();
        tracing::info!(chip = %kind, "selected");
        Ok(())
    }

    /// Select by numeric chip identifier.
    pub fn select_id(&mut self, id: u8) -> Result<(), SelectionError> {
        let kind = ChipKind::from_id(id).ok_or(SelectionError::Unknown(id))?;
        self.select(kind)
    }

    /// Kind of the active backend.
    pub fn active_kind(&self) -> Option<ChipKind> {
        self.active().map(|b| b.kind())
    }

    /// Active backend.
    pub fn active(&self) -> Option<&dyn SynthesisBackend> {
        self.active.map(|idx| self.backends[idx].as_ref())
    }

    /// Mutable active backend.
    pub fn active_mut(&mut self) -> Option<&mut (dyn SynthesisBackend + 'static)> {
        match self.active {
            Some(idx) => Some(self.backends[idx].as_mut()),
            None => None,
        }
    }
}

impl std::fmt::Debug for ChipRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChipRegistry")
            .field(
                "backends",
                &self.backends.iter().map(|b| b.kind()).collect::<Vec<_>>(),
            )
            .field("detected", &self.detected)
            .field("active", &self.active_kind())
            .finish()
    }
}
