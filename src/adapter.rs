//! Adapter presence and enablement, with edge triggered change notifications

use std::{fmt::Debug, sync::Arc};

use derive_more::{Display, From, Into};
use flume::{Receiver, Sender};
use tracing::{debug, info, trace, warn};

use crate::{error::TagError, outbox::Outbox};

/// Resolved adapter state, its display form is the host facing status string
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    uniffi::Enum,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum AdapterState {
    #[strum(serialize = "NO_NFC")]
    Absent,
    #[strum(serialize = "NFC_DISABLED")]
    Disabled,
    #[strum(serialize = "NFC_OK")]
    Enabled,
}

/// Payload of a change notification, an absent adapter never changes
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    uniffi::Enum,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum AdapterStatus {
    #[strum(serialize = "NFC_OK")]
    Enabled,
    #[strum(serialize = "NFC_DISABLED")]
    Disabled,
}

impl From<AdapterStatus> for AdapterState {
    fn from(status: AdapterStatus) -> Self {
        match status {
            AdapterStatus::Enabled => Self::Enabled,
            AdapterStatus::Disabled => Self::Disabled,
        }
    }
}

impl AdapterState {
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }

    pub fn status(self) -> Option<AdapterStatus> {
        match self {
            Self::Absent => None,
            Self::Disabled => Some(AdapterStatus::Disabled),
            Self::Enabled => Some(AdapterStatus::Enabled),
        }
    }

    /// Gate for hosts that want to fail fast before starting a session
    pub fn require_enabled(self) -> Result<(), TagError> {
        match self {
            Self::Absent => Err(TagError::AdapterAbsent),
            Self::Disabled => Err(TagError::AdapterDisabled),
            Self::Enabled => Ok(()),
        }
    }
}

#[uniffi::export(callback_interface)]
pub trait AdapterProbe: Send + Sync + Debug + 'static {
    fn is_present(&self) -> bool;
    fn is_enabled(&self) -> bool;
}

#[uniffi::export(callback_interface)]
pub trait AdapterStateListener: Send + Sync + Debug + 'static {
    fn on_state_changed(&self, status: AdapterStatus);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
pub struct SubscriptionId(u64);

/// A state change the monitor accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterTransition {
    pub from: AdapterState,
    pub to: AdapterState,
}

/// Channel backed stream of state changes, dropping it ends the subscription
#[derive(Debug)]
pub struct StateChanges {
    receiver: Receiver<AdapterStatus>,
}

impl StateChanges {
    /// Everything received so far
    pub fn drain(&self) -> Vec<AdapterStatus> {
        self.receiver.try_iter().collect()
    }
}

#[derive(Debug)]
enum Subscriber {
    Listener(Arc<dyn AdapterStateListener>),
    Channel(Sender<AdapterStatus>),
}

impl Subscriber {
    /// Returns false once the subscriber can no longer receive
    fn notify(&self, status: AdapterStatus, outbox: &mut Outbox) -> bool {
        match self {
            Self::Listener(listener) => {
                outbox.state_changed(listener.clone(), status);
                true
            }
            Self::Channel(sender) => sender.send(status).is_ok(),
        }
    }
}

#[derive(Debug)]
pub struct AdapterStateMonitor {
    probe: Arc<dyn AdapterProbe>,
    last: AdapterState,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl AdapterStateMonitor {
    pub fn new(probe: Arc<dyn AdapterProbe>) -> Self {
        let last = resolve(probe.as_ref());
        info!("nfc adapter starts {last}");

        Self { probe, last, subscribers: Vec::new(), next_subscription: 0 }
    }

    /// Queries the adapter, an absent adapter is never queried again
    pub fn current_state(&self) -> AdapterState {
        if self.last == AdapterState::Absent {
            return AdapterState::Absent;
        }

        resolve(self.probe.as_ref())
    }

    pub fn last_observed(&self) -> AdapterState {
        self.last
    }

    /// Record a newly resolved state, subscribers only hear about actual changes
    pub fn observe(&mut self, state: AdapterState, outbox: &mut Outbox) -> Option<AdapterTransition> {
        if self.last == AdapterState::Absent {
            trace!("adapter absent, ignoring {state}");
            return None;
        }

        if state == self.last {
            trace!("adapter still {state}");
            return None;
        }

        let transition = AdapterTransition { from: self.last, to: state };
        self.last = state;

        match state.status() {
            Some(status) => {
                info!("nfc adapter changed {} -> {}", transition.from, transition.to);
                self.notify(status, outbox);
            }
            None => warn!("nfc adapter disappeared"),
        }

        Some(transition)
    }

    pub fn subscribe(&mut self, listener: Arc<dyn AdapterStateListener>) -> SubscriptionId {
        self.add(Subscriber::Listener(listener))
    }

    pub fn subscribe_channel(&mut self) -> StateChanges {
        let (sender, receiver) = flume::unbounded();
        self.add(Subscriber::Channel(sender));

        StateChanges { receiver }
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(subscriber, _)| *subscriber != id);

        before != self.subscribers.len()
    }

    fn add(&mut self, subscriber: Subscriber) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, subscriber));

        debug!("added state subscriber {id}");
        id
    }

    fn notify(&mut self, status: AdapterStatus, outbox: &mut Outbox) {
        self.subscribers.retain(|(id, subscriber)| {
            let alive = subscriber.notify(status, outbox);
            if !alive {
                debug!("dropping closed state subscriber {id}");
            }

            alive
        });
    }
}

/// Ask the host, no absent latch applied
pub fn resolve(probe: &dyn AdapterProbe) -> AdapterState {
    if !probe.is_present() {
        return AdapterState::Absent;
    }

    if probe.is_enabled() { AdapterState::Enabled } else { AdapterState::Disabled }
}
