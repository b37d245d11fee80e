use crate::{NdefError, Result, parser, record::NdefRecord, writer};

/// An ordered, immutable set of records exchanged with a tag in one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NdefMessage {
    records: Vec<NdefRecord>,
}

impl NdefMessage {
    /// Validates every record, the order given is the order written to the tag
    pub fn try_new(records: Vec<NdefRecord>) -> Result<Self> {
        for (index, record) in records.iter().enumerate() {
            record.validate().map_err(|error| match error {
                NdefError::InvalidRecord(reason) => {
                    NdefError::InvalidRecord(format!("record {index}: {reason}"))
                }
                error => error,
            })?;
        }

        Ok(Self { records })
    }

    pub(crate) fn from_validated(records: Vec<NdefRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[NdefRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<NdefRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Wire form, an empty message encodes to no bytes at all
    pub fn encode(&self) -> Vec<u8> {
        let capacity = self.records.iter().map(writer::encoded_record_len).sum();

        let mut out = Vec::with_capacity(capacity);
        writer::write_records(&self.records, &mut out);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        parser::parse_ndef_message(bytes)
    }
}

impl<'a> IntoIterator for &'a NdefMessage {
    type Item = &'a NdefRecord;
    type IntoIter = std::slice::Iter<'a, NdefRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl TryFrom<Vec<NdefRecord>> for NdefMessage {
    type Error = NdefError;

    fn try_from(records: Vec<NdefRecord>) -> Result<Self> {
        Self::try_new(records)
    }
}
