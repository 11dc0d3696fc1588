use chrono::NaiveDate;

use crate::model::RecordId;
use crate::store::StoreError;

#[derive(Debug)]
pub enum BookingError {
    /// Missing or malformed input.
    Validation(String),
    /// Nobody signed in, or a non-admin attempting a privileged operation.
    Authorization(&'static str),
    NotFound(RecordId),
    SlotTaken { date: NaiveDate, time: String },
    DateBlocked(NaiveDate),
    Store(StoreError),
}

impl BookingError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        BookingError::Validation(msg.into())
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation",
            BookingError::Authorization(_) => "authorization",
            BookingError::NotFound(_) => "not_found",
            BookingError::SlotTaken { .. } => "slot_taken",
            BookingError::DateBlocked(_) => "date_blocked",
            BookingError::Store(_) => "store",
        }
    }
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::Validation(msg) => write!(f, "invalid input: {msg}"),
            BookingError::Authorization(msg) => write!(f, "not authorized: {msg}"),
            BookingError::NotFound(id) => write!(f, "not found: {id}"),
            BookingError::SlotTaken { date, time } => {
                write!(f, "slot {date} {time} is already booked")
            }
            BookingError::DateBlocked(date) => write!(f, "date {date} is blocked"),
            BookingError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for BookingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BookingError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        BookingError::Store(e)
    }
}
