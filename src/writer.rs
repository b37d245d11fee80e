//! Single flight ndef writes

use std::sync::atomic::{AtomicBool, Ordering};

use tap::TapFallible as _;
use tapper_ndef::NdefMessage;
use tracing::{debug, info, warn};

use crate::{
    error::{Result, TagError},
    tag::{Connection, TagHandle, TagTechnology, TransportError},
};

/// Allows at most one outstanding write, process wide for the owning context
#[derive(Debug, Default)]
pub struct WriteCoordinator {
    in_flight: AtomicBool,
    format_blank_tags: bool,
}

/// Held for the duration of a write, releases the coordinator on drop
#[derive(Debug)]
pub struct WriteGuard<'a> {
    in_flight: &'a AtomicBool,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// A tag connected for writing, through whichever technology it offered
#[derive(Debug)]
pub enum WriteTarget {
    Ndef(Connection),
    Formattable(Connection),
}

impl WriteCoordinator {
    pub fn new(format_blank_tags: bool) -> Self {
        Self { in_flight: AtomicBool::new(false), format_blank_tags }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn acquire(&self) -> Result<WriteGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TagError::WriteBusy)?;

        Ok(WriteGuard { in_flight: &self.in_flight })
    }

    /// Connect, check and write `message` to `tag` in one go
    pub fn write(&self, tag: TagHandle, message: &NdefMessage) -> Result<()> {
        if message.is_empty() {
            return Err(TagError::InvalidInput("refusing to write an empty message".into()));
        }

        let _guard = self.acquire()?;
        let target = self.connect(tag)?;

        write_to(target, message)
    }

    /// Prefers an existing ndef container, falls back to formatting a blank tag
    pub fn connect(&self, tag: TagHandle) -> Result<WriteTarget> {
        if tag.supports(TagTechnology::Ndef) {
            let connection = tag.connect(TagTechnology::Ndef).map_err(connect_failed)?;
            return Ok(WriteTarget::Ndef(connection));
        }

        if self.format_blank_tags && tag.supports(TagTechnology::NdefFormatable) {
            let connection = tag.connect(TagTechnology::NdefFormatable).map_err(connect_failed)?;
            return Ok(WriteTarget::Formattable(connection));
        }

        debug!(serial = %tag.serial(), "tag offers nothing to write ndef with");
        Err(TagError::UnsupportedTag)
    }
}

/// Performs the write on an already connected tag, the connection is closed on every path
pub fn write_to(target: WriteTarget, message: &NdefMessage) -> Result<()> {
    let bytes = message.encode();

    match target {
        WriteTarget::Ndef(connection) => {
            if !connection.is_writable().map_err(io_error)? {
                return Err(TagError::NotWritable);
            }

            let capacity = connection.max_size().map_err(io_error)?;
            if bytes.len() > capacity as usize {
                return Err(TagError::CapacityExceeded {
                    needed: u32::try_from(bytes.len()).unwrap_or(u32::MAX),
                    capacity,
                });
            }

            connection.write_ndef(&bytes).map_err(write_failed)?;
            info!(serial = %connection.serial(), "wrote {} byte ndef message", bytes.len());
            close_after_write(connection);
        }

        WriteTarget::Formattable(connection) => {
            connection.format_ndef(&bytes).map_err(format_failed)?;
            info!(serial = %connection.serial(), "formatted tag with {} byte message", bytes.len());
            close_after_write(connection);
        }
    }

    Ok(())
}

// the data is already on the tag, a failed close does not undo that
fn close_after_write(connection: Connection) {
    let _ = connection
        .close()
        .tap_err(|error| warn!("unable to close tag after write: {error}"));
}

fn connect_failed(error: TransportError) -> TagError {
    TagError::ConnectFailed(error.to_string())
}

fn io_error(error: TransportError) -> TagError {
    match error {
        TransportError::Unsupported => TagError::UnsupportedTag,
        other => TagError::IoError(other.to_string()),
    }
}

fn write_failed(error: TransportError) -> TagError {
    match error {
        TransportError::ReadOnly => TagError::NotWritable,
        other => io_error(other),
    }
}

fn format_failed(error: TransportError) -> TagError {
    match error {
        TransportError::TagLost => TagError::IoError(error.to_string()),
        other => TagError::FormatFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTag;
    use pretty_assertions::assert_eq;
    use tapper_ndef::NdefRecord;

    fn message(payload_len: usize) -> NdefMessage {
        let record = NdefRecord::mime("text/plain", vec![b'x'; payload_len]).unwrap();
        NdefMessage::try_new(vec![record]).unwrap()
    }

    #[test]
    fn writes_to_ndef_tag() {
        let tag = MockTag::new(&[1]);
        let msg = message(10);

        WriteCoordinator::new(true).write(TagHandle::new(tag.boxed()), &msg).unwrap();

        assert_eq!(tag.writes(), vec![msg.encode()]);
        assert_eq!(tag.close_calls(), 1);
    }

    #[test]
    fn read_only_tag_is_not_writable_and_closed() {
        let tag = MockTag::new(&[1]).read_only();
        let coordinator = WriteCoordinator::new(true);

        let error = coordinator.write(TagHandle::new(tag.boxed()), &message(200)).unwrap_err();

        assert_eq!(error, TagError::NotWritable);
        assert!(tag.writes().is_empty());
        assert_eq!(tag.close_calls(), 1);
        assert!(!coordinator.is_busy());
    }

    #[test]
    fn oversized_message_exceeds_capacity() {
        let tag = MockTag::new(&[1]).with_capacity(64);
        let msg = message(100);
        let needed = msg.encode().len() as u32;

        let error = WriteCoordinator::new(true).write(TagHandle::new(tag.boxed()), &msg).unwrap_err();

        assert_eq!(error, TagError::CapacityExceeded { needed, capacity: 64 });
        assert!(tag.writes().is_empty());
    }

    #[test]
    fn blank_tag_is_formatted() {
        let tag = MockTag::new(&[1]).blank();
        let msg = message(4);

        WriteCoordinator::new(true).write(TagHandle::new(tag.boxed()), &msg).unwrap();

        assert_eq!(tag.formats(), vec![msg.encode()]);
        assert_eq!(tag.close_calls(), 1);
    }

    #[test]
    fn blank_tag_unsupported_without_formatting() {
        let tag = MockTag::new(&[1]).blank();

        let error = WriteCoordinator::new(false)
            .write(TagHandle::new(tag.boxed()), &message(4))
            .unwrap_err();

        assert_eq!(error, TagError::UnsupportedTag);
        assert_eq!(tag.close_calls(), 0);
    }

    #[test]
    fn format_fault_is_format_failed() {
        let tag = MockTag::new(&[1])
            .blank()
            .failing_format(TransportError::Format("locked".into()));

        let error = WriteCoordinator::new(true)
            .write(TagHandle::new(tag.boxed()), &message(4))
            .unwrap_err();

        assert!(matches!(error, TagError::FormatFailed(_)));
        assert_eq!(tag.close_calls(), 1);
    }

    #[test]
    fn lost_tag_is_io_error() {
        let tag = MockTag::new(&[1]).failing_write(TransportError::TagLost);

        let error = WriteCoordinator::new(true)
            .write(TagHandle::new(tag.boxed()), &message(4))
            .unwrap_err();

        assert_eq!(error, TagError::IoError("tag left the field".into()));
        assert_eq!(tag.close_calls(), 1);
    }

    #[test]
    fn connect_fault_is_connect_failed() {
        let tag = MockTag::new(&[1]).failing_connect();

        let error = WriteCoordinator::new(true)
            .write(TagHandle::new(tag.boxed()), &message(4))
            .unwrap_err();

        assert!(matches!(error, TagError::ConnectFailed(_)));
    }

    #[test]
    fn second_acquire_is_busy() {
        let coordinator = WriteCoordinator::new(true);
        let guard = coordinator.acquire().unwrap();

        assert_eq!(coordinator.acquire().unwrap_err(), TagError::WriteBusy);
        assert_eq!(
            coordinator.write(TagHandle::new(MockTag::new(&[1]).boxed()), &message(1)).unwrap_err(),
            TagError::WriteBusy
        );

        drop(guard);
        assert!(coordinator.acquire().is_ok());
    }

    #[test]
    fn empty_message_is_invalid_input() {
        let error = WriteCoordinator::new(true)
            .write(TagHandle::new(MockTag::new(&[1]).boxed()), &NdefMessage::default())
            .unwrap_err();

        assert!(matches!(error, TagError::InvalidInput(_)));
    }
}
