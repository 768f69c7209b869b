use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Slots offered for each day, in the order the host supplied them.
pub type AvailabilityMap = BTreeMap<NaiveDate, Vec<NaiveDateTime>>;

/// Minimum price shown under each day.
pub type PriceMap = BTreeMap<NaiveDate, Price>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Price {
    pub value: f64,
    pub currency: String,
}

impl Price {
    pub fn new(value: f64, currency: impl Into<String>) -> Self {
        Self {
            value,
            currency: currency.into(),
        }
    }

    /// Formats the value with at most two fractional digits, e.g. `8.3 $`.
    pub fn label(&self) -> String {
        let rounded = format!("{:.2}", self.value);
        let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
        format!("{trimmed} {}", self.currency)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    Replace,
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveDateTime>,
}

impl SelectionState {
    pub fn phase(&self) -> SelectionPhase {
        match (self.date, self.time) {
            (None, _) => SelectionPhase::NoSelection,
            (Some(_), None) => SelectionPhase::DateSelected,
            (Some(_), Some(_)) => SelectionPhase::DateAndTimeSelected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    NoSelection,
    DateSelected,
    DateAndTimeSelected,
}

/// What a renderer needs to draw one cell of the date strip.
#[derive(Debug, Clone, PartialEq)]
pub struct DateCell {
    pub date: NaiveDate,
    pub price: Option<Price>,
    pub selectable: bool,
    pub selected: bool,
}

impl DateCell {
    pub fn price_label(&self) -> String {
        self.price
            .as_ref()
            .map(Price::label)
            .unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCell {
    pub slot: NaiveDateTime,
    pub selected: bool,
}
