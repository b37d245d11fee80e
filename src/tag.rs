//! Handle to a discovered tag and the transport the host implements for it

use std::{fmt::Debug, str::FromStr};

use derive_more::{AsRef, From};
use itertools::Itertools as _;
use tracing::{debug, warn};

/// Technologies a discovered tag can be opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum, strum::Display)]
pub enum TagTechnology {
    /// Tag already holds an ndef container
    Ndef,
    /// Blank tag that can be formatted to hold ndef
    NdefFormatable,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error, uniffi::Error)]
pub enum TransportError {
    #[error("tag left the field")]
    TagLost,

    #[error("transport failure: {0}")]
    Io(String),

    #[error("tag rejected the data: {0}")]
    Format(String),

    #[error("tag is read only")]
    ReadOnly,

    #[error("operation not supported by this tag")]
    Unsupported,
}

impl From<uniffi::UnexpectedUniFFICallbackError> for TransportError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Io(error.reason)
    }
}

// Implemented by the host on top of its platform nfc stack
#[uniffi::export(callback_interface)]
pub trait TagTransport: Send + Sync + Debug + 'static {
    /// Hardware identifier, may be empty
    fn serial(&self) -> Vec<u8>;

    fn technologies(&self) -> Vec<TagTechnology>;

    fn connect(&self, technology: TagTechnology) -> Result<(), TransportError>;

    fn is_writable(&self) -> Result<bool, TransportError>;

    /// Largest ndef message in bytes the tag can store
    fn max_size(&self) -> Result<u32, TransportError>;

    /// Raw ndef message bytes, empty when the tag holds no message
    fn read_ndef(&self) -> Result<Vec<u8>, TransportError>;

    fn write_ndef(&self, message: Vec<u8>) -> Result<(), TransportError>;

    /// Format a blank tag with `message` as its initial content
    fn format_ndef(&self, message: Vec<u8>) -> Result<(), TransportError>;

    fn close(&self) -> Result<(), TransportError>;
}

/// Tag hardware id, displayed as colon separated upper case hex, `04:A2:3F:01`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, From, AsRef)]
pub struct TagSerial(Vec<u8>);

impl TagSerial {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for TagSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let serial = self.0.iter().map(|byte| format!("{byte:02X}")).join(":");
        f.write_str(&serial)
    }
}

impl FromStr for TagSerial {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.replace(':', ""))?;
        Ok(Self(bytes))
    }
}

/// A discovered tag that has not been connected yet
#[derive(Debug)]
pub struct TagHandle {
    transport: Box<dyn TagTransport>,
    serial: TagSerial,
    technologies: Vec<TagTechnology>,
}

impl TagHandle {
    pub fn new(transport: Box<dyn TagTransport>) -> Self {
        let serial = TagSerial::from(transport.serial());
        let technologies = transport.technologies();

        Self { transport, serial, technologies }
    }

    pub fn serial(&self) -> &TagSerial {
        &self.serial
    }

    pub fn supports(&self, technology: TagTechnology) -> bool {
        self.technologies.contains(&technology)
    }

    /// A failed connect leaves nothing open, so nothing is closed
    pub fn connect(self, technology: TagTechnology) -> Result<Connection, TransportError> {
        self.transport.connect(technology)?;
        debug!(serial = %self.serial, "connected with {technology}");

        Ok(Connection { tag: self, closed: false })
    }
}

/// Open connection to a tag, closed exactly once, either explicitly or on drop
#[derive(Debug)]
pub struct Connection {
    tag: TagHandle,
    closed: bool,
}

impl Connection {
    pub fn serial(&self) -> &TagSerial {
        &self.tag.serial
    }

    pub fn is_writable(&self) -> Result<bool, TransportError> {
        self.tag.transport.is_writable()
    }

    pub fn max_size(&self) -> Result<u32, TransportError> {
        self.tag.transport.max_size()
    }

    pub fn read_ndef(&self) -> Result<Vec<u8>, TransportError> {
        self.tag.transport.read_ndef()
    }

    pub fn write_ndef(&self, message: &[u8]) -> Result<(), TransportError> {
        self.tag.transport.write_ndef(message.to_vec())
    }

    pub fn format_ndef(&self, message: &[u8]) -> Result<(), TransportError> {
        self.tag.transport.format_ndef(message.to_vec())
    }

    pub fn close(mut self) -> Result<(), TransportError> {
        self.closed = true;
        self.tag.transport.close()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        self.closed = true;
        if let Err(error) = self.tag.transport.close() {
            warn!(serial = %self.tag.serial, "error closing tag: {error}");
        }
    }
}
