//! Host facing session object
//!
//! Tag i/o, adapter queries, dispatch registration and listener callbacks all
//! run with the context unlocked, so hosts may call back into the session from
//! any callback or from another thread while a tag is being handled.

use std::sync::Arc;

use parking_lot::Mutex;
use tapper_ndef::{NdefMessage, NdefRecord};
use tracing::debug;

use crate::{
    adapter::{self, AdapterProbe, AdapterState, AdapterStateListener},
    config::TapperConfig,
    context::SessionContext,
    dispatch::DispatchPlatform,
    error::{Result, TagError},
    logging,
    outbox::Outbox,
    session::{self, SessionIntent, SessionListener, SessionState},
    tag::{TagHandle, TagTransport},
    wire,
};

type State = SessionContext;

#[derive(Debug, Clone, uniffi::Object)]
pub struct NfcSession {
    state: Arc<Mutex<State>>,
    probe: Arc<dyn AdapterProbe>,
}

#[uniffi::export]
impl NfcSession {
    #[uniffi::constructor]
    pub fn new(
        probe: Box<dyn AdapterProbe>,
        platform: Box<dyn DispatchPlatform>,
        config: Option<TapperConfig>,
    ) -> Self {
        let config = config.unwrap_or_default();
        logging::init(&config.log_filter);

        let probe: Arc<dyn AdapterProbe> = Arc::from(probe);
        let state = SessionContext::new(&config, probe.clone(), Arc::from(platform));

        Self { state: Arc::new(Mutex::new(state)), probe }
    }

    /// One of `NFC_OK`, `NFC_DISABLED` or `NO_NFC`
    pub fn status(&self) -> String {
        self.adapter_state().to_string()
    }

    pub fn adapter_state(&self) -> AdapterState {
        self.resolve_adapter()
    }

    pub fn ensure_enabled(&self) -> Result<()> {
        self.adapter_state().require_enabled()
    }

    pub fn begin_read(&self, listener: Box<dyn SessionListener>) -> Result<()> {
        self.begin(SessionIntent::ReadOnce, listener)
    }

    /// Read every tag until the session is ended
    pub fn begin_subscribe(&self, listener: Box<dyn SessionListener>) -> Result<()> {
        self.begin(SessionIntent::Subscribe, listener)
    }

    pub fn begin_write(&self, records: Vec<NdefRecord>, listener: Box<dyn SessionListener>) -> Result<()> {
        let message = NdefMessage::try_new(records).map_err(TagError::from_input)?;
        self.begin(SessionIntent::Write(message), listener)
    }

    /// Same as `begin_write` with records in the json wire shape
    pub fn begin_write_json(&self, records_json: String, listener: Box<dyn SessionListener>) -> Result<()> {
        let message = wire::message_from_json(&records_json)?;
        self.begin(SessionIntent::Write(message), listener)
    }

    pub fn end_session(&self) {
        self.state.lock().end_session();
    }

    pub fn session_state(&self) -> SessionState {
        self.state.lock().session_state()
    }

    pub fn listen_for_state_changes(&self, listener: Box<dyn AdapterStateListener>) -> u64 {
        self.state.lock().add_state_listener(Arc::from(listener)).into()
    }

    pub fn stop_listening(&self, subscription: u64) -> bool {
        self.state.lock().remove_state_listener(subscription.into())
    }

    pub fn set_mime_filter(&self, mime_types: Vec<String>) -> Result<()> {
        let mut outbox = Outbox::new();
        let result = self.state.lock().set_mime_filter(mime_types, &mut outbox);
        outbox.deliver();

        result
    }

    pub fn mime_filter(&self) -> Vec<String> {
        self.state.lock().mime_filter()
    }

    pub fn on_resume(&self) {
        self.set_foreground(true);
    }

    pub fn on_pause(&self) {
        self.set_foreground(false);
    }

    pub fn on_adapter_broadcast(&self) {
        let resolved = self.resolve_adapter();

        let mut outbox = Outbox::new();
        self.state.lock().apply_adapter_state(resolved, &mut outbox);
        outbox.deliver();
    }

    pub fn on_tag_discovered(&self, tag: Box<dyn TagTransport>) {
        let tag = TagHandle::new(tag);

        let (claim, writer) = {
            let mut state = self.state.lock();
            let Some(claim) = state.sessions_mut().claim() else {
                debug!(serial = %tag.serial(), "no session waiting, ignoring tag");
                return;
            };

            (claim, state.writer())
        };

        let advance = |next: SessionState| self.state.lock().sessions_mut().advance(claim.id, next);
        let Some(result) = session::run_claim(&claim, tag, &writer, advance) else {
            return;
        };

        let mut outbox = Outbox::new();
        self.state.lock().sessions_mut().finish(claim.id, result, &mut outbox);
        outbox.deliver();
    }

    pub fn is_listening(&self) -> bool {
        self.state.lock().is_listening()
    }
}

impl NfcSession {
    /// Asks the host without holding the lock, an absent adapter stays absent
    fn resolve_adapter(&self) -> AdapterState {
        let last = self.state.lock().last_adapter_state();
        if last == AdapterState::Absent {
            return last;
        }

        adapter::resolve(self.probe.as_ref())
    }

    fn set_foreground(&self, foreground: bool) {
        let mut outbox = Outbox::new();
        self.state.lock().on_foreground(foreground, &mut outbox);
        outbox.deliver();
    }

    fn begin(&self, intent: SessionIntent, listener: Box<dyn SessionListener>) -> Result<()> {
        let id = self.state.lock().begin_session(intent, Arc::from(listener))?;
        debug!("started {id}");
        Ok(())
    }
}
