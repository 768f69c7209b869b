//! Save/restore blob for the whole picker.
//!
//! The window is stored as its two bounds and rebuilt with
//! [`calendar::enumerate`](crate::calendar::enumerate) on decode.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::calendar::enumerate;
use crate::error::PickerError;
use crate::model::{AvailabilityMap, PriceMap};

pub const STATE_VERSION: u32 = 1;

/// Widest window a saved blob may describe, roughly a century.
pub const MAX_WINDOW_DAYS: i64 = 36_600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickerState {
    #[serde(default)]
    pub availability: AvailabilityMap,

    #[serde(default)]
    pub prices: PriceMap,

    #[serde(default)]
    pub selected_date: Option<NaiveDate>,

    #[serde(default)]
    pub selected_time: Option<NaiveDateTime>,

    pub window_start: NaiveDate,

    pub window_end: NaiveDate,

    #[serde(default, with = "scroll_position_serde")]
    pub scroll_position: Option<usize>,
}

impl PickerState {
    pub fn window_dates(&self) -> Result<Vec<NaiveDate>, PickerError> {
        self.validate_window()?;
        enumerate(self.window_start, self.window_end)
    }

    /// Checks the window bounds without materializing the dates.
    pub fn validate_window(&self) -> Result<(), PickerError> {
        let (start, end) = (self.window_start, self.window_end);
        if start > end {
            return Err(PickerError::InvalidRange {
                from: start,
                to: end,
            });
        }
        let width = (end - start).num_days();
        if width >= MAX_WINDOW_DAYS {
            return Err(PickerError::Decode(format!(
                "window {start}..={end} spans {} days, limit is {MAX_WINDOW_DAYS}",
                width + 1
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedRecord {
    version: u32,
    state: PickerState,
}

#[tracing::instrument(skip(state))]
pub fn encode(state: &PickerState) -> Result<String, PickerError> {
    if let Some((date, price)) = state
        .prices
        .iter()
        .find(|(_, price)| !price.value.is_finite())
    {
        return Err(PickerError::Encode(format!(
            "price for {date} is not a finite number: {}",
            price.value
        )));
    }

    let record = SavedRecord {
        version: STATE_VERSION,
        state: state.clone(),
    };
    let blob = serde_json::to_string(&record).map_err(|err| PickerError::Encode(err.to_string()))?;
    debug!(bytes = blob.len(), "encoded picker state");
    Ok(blob)
}

#[tracing::instrument(skip(blob))]
pub fn decode(blob: &str) -> Result<PickerState, PickerError> {
    let raw: Value =
        serde_json::from_str(blob).map_err(|err| PickerError::Decode(err.to_string()))?;

    let found = raw
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| PickerError::Decode("missing version".to_string()))?;
    if found != u64::from(STATE_VERSION) {
        return Err(PickerError::IncompatibleVersion {
            found: u32::try_from(found).unwrap_or(u32::MAX),
            expected: STATE_VERSION,
        });
    }

    let record: SavedRecord =
        serde_json::from_value(raw).map_err(|err| PickerError::Decode(err.to_string()))?;
    record.state.validate_window()?;

    debug!(
        start = %record.state.window_start,
        end = %record.state.window_end,
        days = record.state.availability.len(),
        "decoded picker state"
    );
    Ok(record.state)
}

/// `None` is written as `-1`; any negative value reads back as `None`.
pub mod scroll_position_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(position: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match position {
            Some(value) => {
                let value = i64::try_from(*value).map_err(serde::ser::Error::custom)?;
                serializer.serialize_i64(value)
            }
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        if raw < 0 {
            return Ok(None);
        }
        usize::try_from(raw)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Price;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).expect("valid date")
    }

    fn sample() -> PickerState {
        let mut availability = AvailabilityMap::new();
        availability.insert(
            day(1, 10),
            vec![
                day(1, 10).and_hms_opt(8, 30, 0).expect("valid time"),
                day(1, 10).and_hms_opt(8, 30, 0).expect("valid time"),
                day(1, 10).and_hms_opt(20, 15, 0).expect("valid time"),
            ],
        );
        availability.insert(day(1, 11), Vec::new());
        let mut prices = PriceMap::new();
        prices.insert(day(1, 10), Price::new(8.3, "$"));
        prices.insert(day(1, 12), Price::new(0.1 + 0.2, "EUR"));

        PickerState {
            availability,
            prices,
            selected_date: Some(day(1, 10)),
            selected_time: day(1, 10).and_hms_opt(20, 15, 0),
            window_start: day(1, 1),
            window_end: day(3, 31),
            scroll_position: Some(12),
        }
    }

    #[test]
    fn round_trip_preserves_everything() {
        let state = sample();
        let blob = encode(&state).expect("encode");
        let decoded = decode(&blob).expect("decode");
        assert_eq!(decoded, state);
        assert_eq!(decoded.window_dates().expect("window").len(), 91);
    }

    #[test]
    fn missing_scroll_position_is_minus_one_on_the_wire() {
        let mut state = sample();
        state.scroll_position = None;
        let blob = encode(&state).expect("encode");
        let raw: Value = serde_json::from_str(&blob).expect("json");
        assert_eq!(raw["state"]["scroll_position"], Value::from(-1));
        assert_eq!(decode(&blob).expect("decode").scroll_position, None);
    }

    #[test]
    fn rejects_other_versions() {
        let blob = encode(&sample()).expect("encode").replacen("\"version\":1", "\"version\":7", 1);
        assert_eq!(
            decode(&blob),
            Err(PickerError::IncompatibleVersion {
                found: 7,
                expected: STATE_VERSION
            })
        );
    }

    #[test]
    fn rejects_garbage_and_reversed_windows() {
        assert!(matches!(decode("not json"), Err(PickerError::Decode(_))));
        assert!(matches!(decode("{}"), Err(PickerError::Decode(_))));

        let mut state = sample();
        state.window_start = day(4, 1);
        let blob = encode(&state).expect("encode");
        assert!(matches!(decode(&blob), Err(PickerError::InvalidRange { .. })));
    }

    #[test]
    fn rejects_windows_wider_than_the_limit() {
        let mut state = sample();
        state.window_start = NaiveDate::from_ymd_opt(-100_000, 1, 1).expect("valid date");
        state.window_end = NaiveDate::from_ymd_opt(100_000, 1, 1).expect("valid date");
        let blob = encode(&state).expect("encode");
        assert!(matches!(decode(&blob), Err(PickerError::Decode(_))));

        state.window_start = day(1, 1);
        state.window_end = state.window_start + chrono::Duration::days(MAX_WINDOW_DAYS - 1);
        let blob = encode(&state).expect("encode");
        assert_eq!(
            decode(&blob).expect("decode").window_dates().expect("window").len(),
            MAX_WINDOW_DAYS as usize
        );
    }

    #[test]
    fn refuses_to_encode_non_finite_prices() {
        let mut state = sample();
        state.prices.insert(day(1, 13), Price::new(f64::NAN, "$"));
        assert!(matches!(encode(&state), Err(PickerError::Encode(_))));

        state.prices.insert(day(1, 13), Price::new(f64::INFINITY, "$"));
        assert!(matches!(encode(&state), Err(PickerError::Encode(_))));
    }
}
