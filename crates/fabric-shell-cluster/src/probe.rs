//! Bookkeeping for one run of the identity-provider metadata probe.
//!
//! A run moves through `Idle -> InFlight -> {MetadataCaptured | ErrorCaptured} -> Done`.
//! Whichever of the metadata callback or the background failure arrives
//! first records the outcome and sets the signal; later arrivals are dropped.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use fabric_shell_client::ClientError;
use tracing::debug;

use crate::signal::CompletionSignal;

/// The first event observed by a probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The claims callback delivered identity-provider metadata.
    MetadataObtained,
    /// The background existence check failed before any metadata arrived.
    Failed(ClientError),
}

/// Observable state of the most recent probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Idle,
    InFlight,
    MetadataCaptured,
    ErrorCaptured,
    Done,
}

#[derive(Debug, Default)]
pub(crate) struct ProbeAttempt {
    signal: CompletionSignal,
    outcome: OnceLock<ProbeOutcome>,
    finished: AtomicBool,
}

impl ProbeAttempt {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn signal(&self) -> &CompletionSignal {
        &self.signal
    }

    /// Records `outcome` if none has been recorded yet and sets the signal.
    ///
    /// Returns `false` when an earlier outcome already won.
    pub(crate) fn record(&self, outcome: ProbeOutcome) -> bool {
        match self.outcome.set(outcome) {
            Ok(()) => {
                self.signal.set();
                true
            }
            Err(dropped) => {
                debug!(?dropped, "probe outcome already recorded, dropping");
                false
            }
        }
    }

    pub(crate) fn outcome(&self) -> Option<&ProbeOutcome> {
        self.outcome.get()
    }

    /// Marks the foreground wait as finished.
    pub(crate) fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub(crate) fn state(&self) -> ProbeState {
        if self.finished.load(Ordering::Acquire) {
            return ProbeState::Done;
        }
        match self.outcome.get() {
            None => ProbeState::InFlight,
            Some(ProbeOutcome::MetadataObtained) => ProbeState::MetadataCaptured,
            Some(ProbeOutcome::Failed(_)) => ProbeState::ErrorCaptured,
        }
    }
}
