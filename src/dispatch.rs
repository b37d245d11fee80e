//! Foreground dispatch, routing tag discoveries to this process while it is visible

use std::{fmt::Debug, sync::Arc};

use tracing::{debug, info};

use crate::outbox::Outbox;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, uniffi::Enum)]
pub enum DispatchFilter {
    /// Any tag holding an ndef message
    AnyNdef,
    MimeType { mime_type: String },
}

#[uniffi::export(callback_interface)]
pub trait DispatchPlatform: Send + Sync + Debug + 'static {
    /// Start routing discoveries matching any of `filters` to this process
    fn enable_dispatch(&self, filters: Vec<DispatchFilter>);

    fn disable_dispatch(&self);
}

/// A platform call, queued and run once the session is unlocked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchCommand {
    Enable(Vec<DispatchFilter>),
    Disable,
}

impl DispatchCommand {
    pub(crate) fn run(self, platform: &dyn DispatchPlatform) {
        match self {
            Self::Enable(filters) => platform.enable_dispatch(filters),
            Self::Disable => platform.disable_dispatch(),
        }
    }
}

/// What a call did to the platform registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum DispatchChange {
    Unchanged,
    Started,
    Restarted,
    Stopped,
}

/// Keeps the platform registration in line with two gates, host foreground and
/// adapter enabled, listening only while both are open
#[derive(Debug)]
pub struct DispatchController {
    platform: Arc<dyn DispatchPlatform>,
    foreground: bool,
    adapter_enabled: bool,
    wanted: Vec<DispatchFilter>,
    active: Option<Vec<DispatchFilter>>,
}

impl DispatchController {
    pub fn new(platform: Arc<dyn DispatchPlatform>, foreground: bool, adapter_enabled: bool) -> Self {
        Self {
            platform,
            foreground,
            adapter_enabled,
            wanted: vec![DispatchFilter::AnyNdef],
            active: None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_filters(&self) -> Option<&[DispatchFilter]> {
        self.active.as_deref()
    }

    /// Listen with `filters`, an identical active set is left untouched and a
    /// different one is torn down and registered again
    pub fn activate(&mut self, filters: Vec<DispatchFilter>, outbox: &mut Outbox) -> DispatchChange {
        self.wanted = filters;
        self.reconcile(outbox)
    }

    pub fn deactivate(&mut self, outbox: &mut Outbox) -> DispatchChange {
        match self.active.take() {
            Some(_) => {
                self.send(DispatchCommand::Disable, outbox);
                info!("foreground dispatch stopped");
                DispatchChange::Stopped
            }
            None => DispatchChange::Unchanged,
        }
    }

    pub fn set_foreground(&mut self, foreground: bool, outbox: &mut Outbox) -> DispatchChange {
        self.foreground = foreground;
        self.reconcile(outbox)
    }

    pub fn set_adapter_enabled(&mut self, enabled: bool, outbox: &mut Outbox) -> DispatchChange {
        self.adapter_enabled = enabled;
        self.reconcile(outbox)
    }

    fn reconcile(&mut self, outbox: &mut Outbox) -> DispatchChange {
        if !(self.foreground && self.adapter_enabled) {
            return self.deactivate(outbox);
        }

        let change = match &self.active {
            Some(active) if *active == self.wanted => {
                debug!("foreground dispatch already active");
                return DispatchChange::Unchanged;
            }
            Some(_) => {
                self.send(DispatchCommand::Disable, outbox);
                DispatchChange::Restarted
            }
            None => DispatchChange::Started,
        };

        self.send(DispatchCommand::Enable(self.wanted.clone()), outbox);
        self.active = Some(self.wanted.clone());
        info!("foreground dispatch {change} with {:?}", self.wanted);

        change
    }

    fn send(&self, command: DispatchCommand, outbox: &mut Outbox) {
        outbox.dispatch(self.platform.clone(), command);
    }
}
