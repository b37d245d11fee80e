//! Scripted stand-ins for the host callback interfaces

use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use tapper_ndef::NdefMessage;

use crate::{
    adapter::{AdapterProbe, AdapterState, AdapterStateListener, AdapterStatus},
    dispatch::{DispatchCommand, DispatchFilter, DispatchPlatform},
    session::{SessionListener, SessionOutcome},
    tag::{TagTechnology, TagTransport, TransportError},
};

type Hook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug)]
struct TagState {
    serial: Vec<u8>,
    technologies: Vec<TagTechnology>,
    writable: bool,
    capacity: u32,
    stored: Vec<u8>,
    connect_error: Option<TransportError>,
    read_error: Option<TransportError>,
    write_error: Option<TransportError>,
    format_error: Option<TransportError>,
    close_calls: u32,
    writes: Vec<Vec<u8>>,
    formats: Vec<Vec<u8>>,
}

/// In memory tag, clones share state so a test can inspect it after handing it over
#[derive(Clone)]
pub struct MockTag {
    state: Arc<Mutex<TagState>>,
    on_io: Option<Hook>,
}

impl fmt::Debug for MockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTag").field("state", &self.state).finish_non_exhaustive()
    }
}

impl MockTag {
    pub fn new(serial: &[u8]) -> Self {
        let state = TagState {
            serial: serial.to_vec(),
            technologies: vec![TagTechnology::Ndef],
            writable: true,
            capacity: 8192,
            stored: Vec::new(),
            connect_error: None,
            read_error: None,
            write_error: None,
            format_error: None,
            close_calls: 0,
            writes: Vec::new(),
            formats: Vec::new(),
        };

        Self { state: Arc::new(Mutex::new(state)), on_io: None }
    }

    pub fn with_message(self, message: &NdefMessage) -> Self {
        self.with_raw(message.encode())
    }

    pub fn with_raw(self, bytes: Vec<u8>) -> Self {
        self.state.lock().stored = bytes;
        self
    }

    pub fn with_capacity(self, capacity: u32) -> Self {
        self.state.lock().capacity = capacity;
        self
    }

    pub fn read_only(self) -> Self {
        self.state.lock().writable = false;
        self
    }

    /// Unformatted tag, only offers the formattable technology
    pub fn blank(self) -> Self {
        self.state.lock().technologies = vec![TagTechnology::NdefFormatable];
        self
    }

    pub fn failing_connect(self) -> Self {
        self.state.lock().connect_error = Some(TransportError::Io("connect refused".into()));
        self
    }

    pub fn failing_read(self, error: TransportError) -> Self {
        self.state.lock().read_error = Some(error);
        self
    }

    pub fn failing_write(self, error: TransportError) -> Self {
        self.state.lock().write_error = Some(error);
        self
    }

    pub fn failing_format(self, error: TransportError) -> Self {
        self.state.lock().format_error = Some(error);
        self
    }

    /// Runs before every read, write or format, with no locks held
    pub fn on_io(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_io = Some(Arc::new(hook));
        self
    }

    pub fn boxed(&self) -> Box<dyn TagTransport> {
        Box::new(self.clone())
    }

    pub fn close_calls(&self) -> u32 {
        self.state.lock().close_calls
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    pub fn formats(&self) -> Vec<Vec<u8>> {
        self.state.lock().formats.clone()
    }

    fn run_hook(&self) {
        if let Some(hook) = &self.on_io {
            hook();
        }
    }
}

impl TagTransport for MockTag {
    fn serial(&self) -> Vec<u8> {
        self.state.lock().serial.clone()
    }

    fn technologies(&self) -> Vec<TagTechnology> {
        self.state.lock().technologies.clone()
    }

    fn connect(&self, technology: TagTechnology) -> Result<(), TransportError> {
        let state = self.state.lock();
        if let Some(error) = &state.connect_error {
            return Err(error.clone());
        }

        if !state.technologies.contains(&technology) {
            return Err(TransportError::Unsupported);
        }

        Ok(())
    }

    fn is_writable(&self) -> Result<bool, TransportError> {
        Ok(self.state.lock().writable)
    }

    fn max_size(&self) -> Result<u32, TransportError> {
        Ok(self.state.lock().capacity)
    }

    fn read_ndef(&self) -> Result<Vec<u8>, TransportError> {
        self.run_hook();

        let state = self.state.lock();
        match &state.read_error {
            Some(error) => Err(error.clone()),
            None => Ok(state.stored.clone()),
        }
    }

    fn write_ndef(&self, message: Vec<u8>) -> Result<(), TransportError> {
        self.run_hook();

        let mut state = self.state.lock();
        if let Some(error) = &state.write_error {
            return Err(error.clone());
        }

        if !state.writable {
            return Err(TransportError::ReadOnly);
        }

        state.stored = message.clone();
        state.writes.push(message);
        Ok(())
    }

    fn format_ndef(&self, message: Vec<u8>) -> Result<(), TransportError> {
        self.run_hook();

        let mut state = self.state.lock();
        if let Some(error) = &state.format_error {
            return Err(error.clone());
        }

        state.stored = message.clone();
        state.formats.push(message);
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        self.state.lock().close_calls += 1;
        Ok(())
    }
}

type OutcomeHook = Arc<dyn Fn(&SessionOutcome) + Send + Sync>;

#[derive(Clone, Default)]
pub struct RecordingListener {
    outcomes: Arc<Mutex<Vec<SessionOutcome>>>,
    hook: Option<OutcomeHook>,
}

impl fmt::Debug for RecordingListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingListener").field("outcomes", &self.outcomes).finish_non_exhaustive()
    }
}

impl RecordingListener {
    /// Runs after each outcome is recorded
    pub fn on_outcome(mut self, hook: impl Fn(&SessionOutcome) + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn outcomes(&self) -> Vec<SessionOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn arc(&self) -> Arc<dyn SessionListener> {
        Arc::new(self.clone())
    }

    pub fn boxed(&self) -> Box<dyn SessionListener> {
        Box::new(self.clone())
    }
}

impl SessionListener for RecordingListener {
    fn on_outcome(&self, outcome: SessionOutcome) {
        self.outcomes.lock().push(outcome.clone());

        if let Some(hook) = &self.hook {
            hook(&outcome);
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingPlatform {
    calls: Arc<Mutex<Vec<DispatchCommand>>>,
    hook: Option<Hook>,
}

impl fmt::Debug for RecordingPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingPlatform").field("calls", &self.calls).finish_non_exhaustive()
    }
}

impl RecordingPlatform {
    /// Runs after each enable or disable is recorded
    pub fn on_call(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<DispatchCommand> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn arc(&self) -> Arc<dyn DispatchPlatform> {
        Arc::new(self.clone())
    }

    pub fn boxed(&self) -> Box<dyn DispatchPlatform> {
        Box::new(self.clone())
    }

    fn record(&self, command: DispatchCommand) {
        self.calls.lock().push(command);

        if let Some(hook) = &self.hook {
            hook();
        }
    }
}

impl DispatchPlatform for RecordingPlatform {
    fn enable_dispatch(&self, filters: Vec<DispatchFilter>) {
        self.record(DispatchCommand::Enable(filters));
    }

    fn disable_dispatch(&self) {
        self.record(DispatchCommand::Disable);
    }
}

#[derive(Clone)]
pub struct ScriptedProbe {
    state: Arc<Mutex<AdapterState>>,
    hook: Option<Hook>,
}

impl fmt::Debug for ScriptedProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedProbe").field("state", &self.state).finish_non_exhaustive()
    }
}

impl ScriptedProbe {
    pub fn new(state: AdapterState) -> Self {
        Self { state: Arc::new(Mutex::new(state)), hook: None }
    }

    /// Runs before each presence query is answered
    pub fn on_query(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn set(&self, state: AdapterState) {
        *self.state.lock() = state;
    }

    pub fn arc(&self) -> Arc<dyn AdapterProbe> {
        Arc::new(self.clone())
    }

    pub fn boxed(&self) -> Box<dyn AdapterProbe> {
        Box::new(self.clone())
    }
}

impl AdapterProbe for ScriptedProbe {
    fn is_present(&self) -> bool {
        if let Some(hook) = &self.hook {
            hook();
        }

        *self.state.lock() != AdapterState::Absent
    }

    fn is_enabled(&self) -> bool {
        *self.state.lock() == AdapterState::Enabled
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingStateListener(Arc<Mutex<Vec<AdapterStatus>>>);

impl RecordingStateListener {
    pub fn statuses(&self) -> Vec<AdapterStatus> {
        self.0.lock().clone()
    }

    pub fn arc(&self) -> Arc<dyn AdapterStateListener> {
        Arc::new(self.clone())
    }

    pub fn boxed(&self) -> Box<dyn AdapterStateListener> {
        Box::new(self.clone())
    }
}

impl AdapterStateListener for RecordingStateListener {
    fn on_state_changed(&self, status: AdapterStatus) {
        self.0.lock().push(status);
    }
}
