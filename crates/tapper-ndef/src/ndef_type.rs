use crate::NdefError;

/// Type name format, the 3 bit TNF field of a record header
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum NdefType {
    Empty,
    WellKnown,
    Mime,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
}

impl NdefType {
    pub const fn tnf(self) -> u8 {
        match self {
            NdefType::Empty => 0,
            NdefType::WellKnown => 1,
            NdefType::Mime => 2,
            NdefType::AbsoluteUri => 3,
            NdefType::External => 4,
            NdefType::Unknown => 5,
            NdefType::Unchanged => 6,
        }
    }

    /// Returns `None` for the reserved value 7 and anything that does not fit in 3 bits
    pub const fn from_tnf(tnf: u8) -> Option<Self> {
        let ndef_type = match tnf {
            0 => NdefType::Empty,
            1 => NdefType::WellKnown,
            2 => NdefType::Mime,
            3 => NdefType::AbsoluteUri,
            4 => NdefType::External,
            5 => NdefType::Unknown,
            6 => NdefType::Unchanged,
            _ => return None,
        };

        Some(ndef_type)
    }
}

impl TryFrom<u8> for NdefType {
    type Error = NdefError;

    fn try_from(tnf: u8) -> Result<Self, Self::Error> {
        Self::from_tnf(tnf)
            .ok_or_else(|| NdefError::Malformed(format!("unsupported type name format {tnf}")))
    }
}

impl From<NdefType> for u8 {
    fn from(ndef_type: NdefType) -> Self {
        ndef_type.tnf()
    }
}
