//! Host callbacks collected while state is locked, run after it is released

use std::sync::Arc;

use tracing::trace;

use crate::{
    adapter::{AdapterStateListener, AdapterStatus},
    dispatch::{DispatchCommand, DispatchPlatform},
    session::{SessionListener, SessionOutcome},
};

#[derive(Debug)]
enum Pending {
    Session { listener: Arc<dyn SessionListener>, outcome: SessionOutcome },
    State { listener: Arc<dyn AdapterStateListener>, status: AdapterStatus },
    Dispatch { platform: Arc<dyn DispatchPlatform>, command: DispatchCommand },
}

/// Listeners and platform hooks may call straight back into the session, so they
/// must never run while the session context is borrowed
#[derive(Debug, Default)]
#[must_use = "pending callbacks are lost unless delivered"]
pub struct Outbox {
    pending: Vec<Pending>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn session_outcome(
        &mut self,
        listener: Arc<dyn SessionListener>,
        outcome: SessionOutcome,
    ) {
        self.pending.push(Pending::Session { listener, outcome });
    }

    pub(crate) fn state_changed(&mut self, listener: Arc<dyn AdapterStateListener>, status: AdapterStatus) {
        self.pending.push(Pending::State { listener, status });
    }

    pub(crate) fn dispatch(&mut self, platform: Arc<dyn DispatchPlatform>, command: DispatchCommand) {
        self.pending.push(Pending::Dispatch { platform, command });
    }

    /// Runs every callback in the order it was queued
    pub fn deliver(self) {
        for pending in self.pending {
            match pending {
                Pending::Session { listener, outcome } => {
                    trace!("delivering session outcome");
                    listener.on_outcome(outcome);
                }
                Pending::State { listener, status } => {
                    trace!("delivering adapter status {status}");
                    listener.on_state_changed(status);
                }
                Pending::Dispatch { platform, command } => {
                    trace!("running dispatch command {command:?}");
                    command.run(platform.as_ref());
                }
            }
        }
    }
}
