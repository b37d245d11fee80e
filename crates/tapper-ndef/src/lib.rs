//! NDEF record codec
//!
//! Encodes and decodes NFC Data Exchange Format messages, the structured record
//! sets stored on proximity tags.

uniffi::setup_scaffolding!();

pub mod ffi;
pub mod header;
pub mod message;
pub mod ndef_type;
pub mod parser;
pub mod payload;
pub mod record;
pub mod writer;

pub use message::NdefMessage;
pub use ndef_type::NdefType;
pub use record::NdefRecord;

/// Largest payload the decoder will accept, checked before any allocation
pub const MAX_PAYLOAD_SIZE: u32 = 10 * 1024 * 1024;

/// Longest type or id field, both are length prefixed with a single byte
pub const MAX_FIELD_LENGTH: usize = u8::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, uniffi::Error)]
pub enum NdefError {
    /// Input ended before the record framing said it would
    #[error("record data ended early, missing {missing:?} bytes")]
    Truncated { missing: Option<u32> },

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("payload of {size} bytes is larger than the {max} byte limit")]
    PayloadTooLarge { size: u64, max: u32 },

    /// Record fields break the rules of its type name format
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("{remaining} bytes left over after the last record")]
    TrailingData { remaining: u32 },
}

pub type Error = NdefError;
pub type Result<T, E = Error> = std::result::Result<T, E>;
