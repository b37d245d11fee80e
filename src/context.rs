//! Everything a host needs for nfc, owned in one place instead of in globals
//!
//! Calls that reach the host take an [`Outbox`], deliver it once the context is
//! no longer borrowed.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    adapter::{
        AdapterProbe, AdapterState, AdapterStateListener, AdapterStateMonitor, StateChanges,
        SubscriptionId,
    },
    config::TapperConfig,
    dispatch::{DispatchController, DispatchPlatform},
    error::{Result, TagError},
    mime_filter::MimeFilterRegistry,
    outbox::Outbox,
    session::{SessionId, SessionIntent, SessionListener, SessionState, TagSessionManager},
    tag::TagHandle,
    writer::WriteCoordinator,
};

#[derive(Debug)]
pub struct SessionContext {
    monitor: AdapterStateMonitor,
    dispatch: DispatchController,
    filters: MimeFilterRegistry,
    sessions: TagSessionManager,
    writer: Arc<WriteCoordinator>,
}

impl SessionContext {
    /// Registers dispatch right away when both gates start open
    pub fn new(
        config: &TapperConfig,
        probe: Arc<dyn AdapterProbe>,
        platform: Arc<dyn DispatchPlatform>,
    ) -> Self {
        let monitor = AdapterStateMonitor::new(probe);
        let filters = MimeFilterRegistry::new();

        let adapter_enabled = monitor.last_observed().is_enabled();
        let mut dispatch = DispatchController::new(platform, config.start_in_foreground, adapter_enabled);

        // nothing can hold this context yet
        let mut outbox = Outbox::new();
        let change = dispatch.activate(filters.dispatch_filters(), &mut outbox);
        outbox.deliver();
        debug!("initial dispatch {change}");

        Self {
            monitor,
            dispatch,
            filters,
            sessions: TagSessionManager::new(),
            writer: Arc::new(WriteCoordinator::new(config.format_blank_tags)),
        }
    }

    pub fn writer(&self) -> Arc<WriteCoordinator> {
        self.writer.clone()
    }

    /// Last state the monitor accepted, never asks the host
    pub fn last_adapter_state(&self) -> AdapterState {
        self.monitor.last_observed()
    }

    pub fn begin_session(
        &mut self,
        intent: SessionIntent,
        listener: Arc<dyn SessionListener>,
    ) -> Result<SessionId> {
        if self.writer.is_busy() {
            return Err(TagError::WriteBusy);
        }

        self.sessions.begin_session(intent, listener)
    }

    pub fn end_session(&mut self) -> bool {
        self.sessions.end_session()
    }

    pub fn session_state(&self) -> SessionState {
        self.sessions.state()
    }

    pub fn sessions_mut(&mut self) -> &mut TagSessionManager {
        &mut self.sessions
    }

    pub fn subscribe_state_changes(&mut self) -> StateChanges {
        self.monitor.subscribe_channel()
    }

    pub fn add_state_listener(&mut self, listener: Arc<dyn AdapterStateListener>) -> SubscriptionId {
        self.monitor.subscribe(listener)
    }

    pub fn remove_state_listener(&mut self, id: SubscriptionId) -> bool {
        self.monitor.unsubscribe(id)
    }

    /// Replace the mime filters, restarting dispatch only when it is listening
    pub fn set_mime_filter<I, S>(&mut self, mime_types: I, outbox: &mut Outbox) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.filters.set(mime_types)? {
            return Ok(());
        }

        let change = self.dispatch.activate(self.filters.dispatch_filters(), outbox);
        debug!("mime filter update, dispatch {change}");
        Ok(())
    }

    pub fn mime_filter(&self) -> Vec<String> {
        self.filters.to_vec()
    }

    pub fn on_foreground(&mut self, foreground: bool, outbox: &mut Outbox) {
        let change = self.dispatch.set_foreground(foreground, outbox);
        info!(foreground, "host visibility changed, dispatch {change}");
    }

    /// Platform reported an adapter event, re-resolve it and follow the result
    pub fn on_adapter_broadcast(&mut self, outbox: &mut Outbox) {
        let state = self.monitor.current_state();
        self.apply_adapter_state(state, outbox);
    }

    /// Follow an adapter state the caller already resolved
    pub fn apply_adapter_state(&mut self, state: AdapterState, outbox: &mut Outbox) {
        if let Some(transition) = self.monitor.observe(state, outbox) {
            let change = self.dispatch.set_adapter_enabled(transition.to.is_enabled(), outbox);
            debug!("adapter now {}, dispatch {change}", transition.to);
        }
    }

    pub fn on_tag_discovered(&mut self, tag: TagHandle, outbox: &mut Outbox) {
        self.sessions.on_tag_discovered(tag, &self.writer, outbox);
    }

    pub fn is_listening(&self) -> bool {
        self.dispatch.is_listening()
    }
}
