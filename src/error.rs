use core::fmt;
use std::io;

/// Failures surfaced while building or operating a card instance.
///
/// Protocol-level anomalies (bad framing bytes, unknown commands,
/// oversized transfers) never show up here; those degrade to logged
/// fallback responses instead.
#[derive(Debug)]
pub enum Error {
    /// The requested capacity has no legal (C_SIZE, C_SIZE_MULT,
    /// READ_BL_LEN) encoding in the CSD layout.
    CapacityNotEncodable { requested: u64 },
    /// The backing store failed underneath the card.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CapacityNotEncodable { requested } => {
                write!(f, "capacity of {} bytes not encodable in CSD geometry", requested)
            }
            Error::Io(error) => write!(f, "backing store error: {}", error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}
