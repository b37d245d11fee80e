//! Tag session lifecycle
//!
//! A session waits for a discovered tag, runs one read or write against it and
//! reports the outcome to its listener. The tag i/O runs on a [`Claim`] outside of
//! the manager, so a session can be ended or replaced while a tag is being handled.
//! Results for a session that is no longer current are dropped.

use std::{fmt::Debug, sync::Arc};

use derive_more::Display;
use tap::TapFallible as _;
use tapper_ndef::{NdefMessage, NdefRecord};
use tracing::{debug, info, trace, warn};

use crate::{
    error::{Result, TagError},
    outbox::Outbox,
    tag::{TagHandle, TagSerial, TagTechnology, TransportError},
    writer::{self, WriteCoordinator},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum, strum::Display)]
pub enum SessionState {
    Idle,
    AwaitingDiscovery,
    Connected,
    Reading,
    Writing,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionIntent {
    /// Read the next tag then close
    ReadOnce,
    /// Read every tag until the session is ended
    Subscribe,
    Write(NdefMessage),
}

/// A tag that was read, records in tag order
#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Record)]
pub struct ScannedTag {
    pub serial: String,
    pub records: Vec<NdefRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum SessionOutcome {
    Read { tag: ScannedTag },
    Written { serial: String },
    Failed { error: TagError },
}

#[uniffi::export(callback_interface)]
pub trait SessionListener: Send + Sync + Debug + 'static {
    fn on_outcome(&self, outcome: SessionOutcome);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("session-{_0}")]
pub struct SessionId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSuccess {
    Read(ScannedTag),
    Written { serial: TagSerial },
}

/// Permission to run a session's intent against one discovered tag
#[derive(Debug, Clone)]
pub struct Claim {
    pub id: SessionId,
    pub intent: SessionIntent,
}

#[derive(Debug)]
struct Session {
    id: SessionId,
    intent: SessionIntent,
    state: SessionState,
    listener: Option<Arc<dyn SessionListener>>,
    claimed: bool,
}

impl Session {
    fn is_live(&self) -> bool {
        self.state != SessionState::Closed
    }

    fn is_write(&self) -> bool {
        matches!(self.intent, SessionIntent::Write(_))
    }
}

/// Owns at most one session at a time
#[derive(Debug, Default)]
pub struct TagSessionManager {
    session: Option<Session>,
    next_id: u64,
}

impl TagSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.session.as_ref().map_or(SessionState::Idle, |session| session.state)
    }

    /// Starts a new session, replacing a live read session
    ///
    /// Fails with `WriteBusy` while a write session is live, whatever the new intent
    pub fn begin_session(
        &mut self,
        intent: SessionIntent,
        listener: Arc<dyn SessionListener>,
    ) -> Result<SessionId> {
        if let SessionIntent::Write(message) = &intent {
            if message.is_empty() {
                return Err(TagError::InvalidInput("refusing to write an empty message".into()));
            }
        }

        if let Some(live) = self.live() {
            if live.is_write() {
                debug!("{} still writing, rejecting new session", live.id);
                return Err(TagError::WriteBusy);
            }

            debug!("replacing {}", live.id);
            self.close();
        }

        self.next_id += 1;
        let id = SessionId(self.next_id);
        let mut session = Session {
            id,
            intent,
            state: SessionState::Idle,
            listener: Some(listener),
            claimed: false,
        };

        transition(&mut session, SessionState::AwaitingDiscovery);
        info!("{id} waiting for a tag");
        self.session = Some(session);

        Ok(id)
    }

    /// Closes the live session without notifying its listener, safe to repeat
    pub fn end_session(&mut self) -> bool {
        let ended = self.close();
        if !ended {
            trace!("no live session to end");
        }

        ended
    }

    /// Hand the next discovered tag to the waiting session, if any
    pub fn claim(&mut self) -> Option<Claim> {
        let session = self.session.as_mut().filter(|session| session.is_live())?;
        if session.claimed || session.state != SessionState::AwaitingDiscovery {
            debug!("{} is busy with another tag", session.id);
            return None;
        }

        session.claimed = true;
        Some(Claim { id: session.id, intent: session.intent.clone() })
    }

    /// Moves a claimed session forward, false once it was ended or replaced
    pub fn advance(&mut self, id: SessionId, state: SessionState) -> bool {
        match self.session.as_mut() {
            Some(session) if session.id == id && session.is_live() => {
                transition(session, state);
                true
            }
            _ => {
                debug!("{id} is no longer current");
                false
            }
        }
    }

    /// Report the result of a claim, queueing the listener callback
    ///
    /// Subscriptions go back to waiting after a successful read, everything else closes
    pub fn finish(&mut self, id: SessionId, result: Result<SessionSuccess>, outbox: &mut Outbox) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|session| session.id == id && session.is_live())
        else {
            debug!("dropping result for {id}, session was closed");
            return;
        };

        let keep_listening = matches!(session.intent, SessionIntent::Subscribe) && result.is_ok();
        let outcome = match result {
            Ok(SessionSuccess::Read(tag)) => SessionOutcome::Read { tag },
            Ok(SessionSuccess::Written { serial }) => {
                SessionOutcome::Written { serial: serial.to_string() }
            }
            Err(error) => {
                warn!("{id} failed: {error}");
                SessionOutcome::Failed { error }
            }
        };

        let listener = if keep_listening {
            session.claimed = false;
            transition(session, SessionState::AwaitingDiscovery);
            session.listener.clone()
        } else {
            transition(session, SessionState::Closed);
            session.listener.take()
        };

        if let Some(listener) = listener {
            outbox.session_outcome(listener, outcome);
        }
    }

    /// Claim, run and finish in one step, for callers that already have exclusive access
    pub fn on_tag_discovered(&mut self, tag: TagHandle, writer: &WriteCoordinator, outbox: &mut Outbox) {
        let Some(claim) = self.claim() else {
            debug!(serial = %tag.serial(), "no session waiting, ignoring tag");
            return;
        };

        let result = run_claim(&claim, tag, writer, |state| self.advance(claim.id, state));
        if let Some(result) = result {
            self.finish(claim.id, result, outbox);
        }
    }

    fn live(&self) -> Option<&Session> {
        self.session.as_ref().filter(|session| session.is_live())
    }

    fn close(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) if session.is_live() => {
                transition(session, SessionState::Closed);
                session.listener = None;
                info!("{} closed", session.id);
                true
            }
            _ => false,
        }
    }
}

fn transition(session: &mut Session, state: SessionState) {
    trace!("{} {} -> {state}", session.id, session.state);
    session.state = state;
}

/// Perform the claimed intent against `tag`
///
/// `advance` reports each step back to the manager, `None` is returned as soon as
/// the session is no longer current. The tag is closed on every path.
pub fn run_claim(
    claim: &Claim,
    tag: TagHandle,
    writer: &WriteCoordinator,
    mut advance: impl FnMut(SessionState) -> bool,
) -> Option<Result<SessionSuccess>> {
    info!(serial = %tag.serial(), "tag discovered for {}", claim.id);

    match &claim.intent {
        SessionIntent::ReadOnce | SessionIntent::Subscribe => read_tag(tag, &mut advance),
        SessionIntent::Write(message) => write_tag(tag, message, writer, &mut advance),
    }
}

fn read_tag(
    tag: TagHandle,
    advance: &mut impl FnMut(SessionState) -> bool,
) -> Option<Result<SessionSuccess>> {
    if !tag.supports(TagTechnology::Ndef) {
        return Some(Err(TagError::UnsupportedTag));
    }

    let serial = tag.serial().clone();
    let connection = match tag.connect(TagTechnology::Ndef) {
        Ok(connection) => connection,
        Err(error) => return Some(Err(TagError::ConnectFailed(error.to_string()))),
    };

    if !advance(SessionState::Connected) || !advance(SessionState::Reading) {
        return None;
    }

    let bytes = match connection.read_ndef() {
        Ok(bytes) => bytes,
        Err(error) => return Some(Err(read_failed(error))),
    };

    let _ = connection
        .close()
        .tap_err(|error| warn!(%serial, "unable to close tag after read: {error}"));

    let result = NdefMessage::decode(&bytes).map_err(TagError::from).map(|message| {
        debug!(%serial, "read {} records", message.len());
        SessionSuccess::Read(ScannedTag { serial: serial.to_string(), records: message.into_records() })
    });

    Some(result)
}

fn write_tag(
    tag: TagHandle,
    message: &NdefMessage,
    writer: &WriteCoordinator,
    advance: &mut impl FnMut(SessionState) -> bool,
) -> Option<Result<SessionSuccess>> {
    let _guard = match writer.acquire() {
        Ok(guard) => guard,
        Err(error) => return Some(Err(error)),
    };

    let serial = tag.serial().clone();
    let target = match writer.connect(tag) {
        Ok(target) => target,
        Err(error) => return Some(Err(error)),
    };

    if !advance(SessionState::Connected) || !advance(SessionState::Writing) {
        return None;
    }

    let result = writer::write_to(target, message).map(|()| SessionSuccess::Written { serial });
    Some(result)
}

fn read_failed(error: TransportError) -> TagError {
    match error {
        TransportError::Unsupported => TagError::UnsupportedTag,
        other => TagError::IoError(other.to_string()),
    }
}
