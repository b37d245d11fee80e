use tapper_ndef::NdefError;

/// Every failure a tag session can report to its listener
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error, uniffi::Error)]
pub enum TagError {
    #[error("this device has no nfc adapter")]
    AdapterAbsent,

    #[error("nfc is turned off")]
    AdapterDisabled,

    #[error("permission to use nfc was denied")]
    PermissionDenied,

    #[error("tag does not support ndef")]
    UnsupportedTag,

    #[error("unable to connect to tag: {0}")]
    ConnectFailed(String),

    /// Tag moved out of range or the transport failed mid operation
    #[error("tag i/o failed: {0}")]
    IoError(String),

    #[error("ndef tag is not writable")]
    NotWritable,

    #[error("unable to format tag: {0}")]
    FormatFailed(String),

    #[error("malformed ndef data: {0}")]
    MalformedRecord(String),

    #[error("a write is already in progress")]
    WriteBusy,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("message needs {needed} bytes but the tag holds {capacity}")]
    CapacityExceeded { needed: u32, capacity: u32 },
}

pub type Error = TagError;
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl TagError {
    /// For records the caller built, as opposed to bytes read off a tag
    pub fn from_input(error: NdefError) -> Self {
        Self::InvalidInput(error.to_string())
    }
}

/// Bytes read from a tag that fail to decode
impl From<NdefError> for TagError {
    fn from(error: NdefError) -> Self {
        Self::MalformedRecord(error.to_string())
    }
}
