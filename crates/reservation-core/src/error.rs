use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickerError {
    #[error("invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("date window is empty")]
    EmptyWindow,

    #[error("dates {first}..={last} do not fit {side} of the window")]
    OutOfOrder {
        side: &'static str,
        first: NaiveDate,
        last: NaiveDate,
    },

    #[error("failed to encode picker state: {0}")]
    Encode(String),

    #[error("failed to decode saved picker state: {0}")]
    Decode(String),

    #[error("saved picker state has version {found}, expected {expected}")]
    IncompatibleVersion { found: u32, expected: u32 },
}
