//! NFC tag sessions for mobile hosts
//!
//! The host supplies the platform pieces, adapter probing, foreground dispatch
//! and tag transports, through callback interfaces and drives everything from a
//! single [`ffi::NfcSession`].

uniffi::setup_scaffolding!();

pub mod adapter;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod mime_filter;
pub mod outbox;
pub mod session;
pub mod tag;
pub mod wire;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use tapper_ndef::{self as ndef, NdefMessage, NdefRecord, NdefType};
