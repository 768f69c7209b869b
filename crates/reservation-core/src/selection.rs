use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, trace, warn};

use crate::model::{AvailabilityMap, IngestMode, Price, PriceMap, SelectionState};
use crate::slots::TimeSlotList;

/// Side effects of a selection or ingestion call, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEffect {
    DateCellChanged(NaiveDate),
    TimeCellChanged(usize),
    AllDatesChanged,
    SlotsShown,
    SlotsHidden,
    DateSelected(Option<NaiveDate>),
    TimeSelected(Option<NaiveDateTime>),
}

impl SelectionEffect {
    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            SelectionEffect::DateSelected(_) | SelectionEffect::TimeSelected(_)
        )
    }
}

/// Owns availability, prices and the date/time selection.
///
/// A selected time always belongs to the slot list of the selected date;
/// ingestion that removes it clears the time and reports `TimeSelected(None)`.
#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    availability: AvailabilityMap,
    prices: PriceMap,
    state: SelectionState,
    slots: TimeSlotList,
}

impl SelectionModel {
    pub fn availability(&self) -> &AvailabilityMap {
        &self.availability
    }

    pub fn prices(&self) -> &PriceMap {
        &self.prices
    }

    pub fn price_for(&self, date: NaiveDate) -> Option<&Price> {
        self.prices.get(&date)
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.state.date
    }

    pub fn selected_time(&self) -> Option<NaiveDateTime> {
        self.state.time
    }

    pub fn slots(&self) -> &TimeSlotList {
        &self.slots
    }

    pub fn ingest_availability(
        &mut self,
        mode: IngestMode,
        data: AvailabilityMap,
    ) -> Vec<SelectionEffect> {
        debug!(?mode, days = data.len(), "ingesting availability");
        match mode {
            IngestMode::Replace => self.availability = data,
            IngestMode::Merge => self.availability.extend(data),
        }

        let mut effects = Vec::new();
        self.refresh_slots(&mut effects);
        effects
    }

    /// Entries whose value is not finite are dropped.
    pub fn ingest_price(&mut self, mode: IngestMode, mut data: PriceMap) -> Vec<SelectionEffect> {
        debug!(?mode, days = data.len(), "ingesting prices");
        data.retain(|date, price| {
            let finite = price.value.is_finite();
            if !finite {
                warn!(%date, value = price.value, "dropping non-finite price");
            }
            finite
        });
        match mode {
            IngestMode::Replace => self.prices = data,
            IngestMode::Merge => self.prices.extend(data),
        }
        vec![SelectionEffect::AllDatesChanged]
    }

    pub fn select_date(&mut self, date: NaiveDate) -> Vec<SelectionEffect> {
        let mut effects = Vec::new();

        if self.state.date == Some(date) {
            trace!(%date, "deselecting date");
            self.state = SelectionState::default();
            self.slots.clear();
            effects.push(SelectionEffect::DateCellChanged(date));
            effects.push(SelectionEffect::SlotsHidden);
            effects.push(SelectionEffect::DateSelected(None));
            return effects;
        }

        trace!(%date, previous = ?self.state.date, "selecting date");
        let previous = self.state.date.replace(date);
        let dropped_time = self.state.time.take().is_some();

        if let Some(previous) = previous {
            effects.push(SelectionEffect::DateCellChanged(previous));
        }
        effects.push(SelectionEffect::DateCellChanged(date));
        self.refresh_slots(&mut effects);
        effects.push(SelectionEffect::DateSelected(Some(date)));
        if dropped_time {
            effects.push(SelectionEffect::TimeSelected(None));
        }
        effects
    }

    pub fn select_time(&mut self, time: NaiveDateTime) -> Vec<SelectionEffect> {
        let mut effects = Vec::new();

        if self.state.time == Some(time) {
            trace!(%time, "deselecting time");
            self.state.time = None;
            if let Some(index) = self.slots.index_of(time) {
                effects.push(SelectionEffect::TimeCellChanged(index));
            }
            effects.push(SelectionEffect::TimeSelected(None));
            return effects;
        }

        trace!(%time, previous = ?self.state.time, "selecting time");
        let previous = self.state.time.replace(time);
        if let Some(index) = previous.and_then(|slot| self.slots.index_of(slot)) {
            effects.push(SelectionEffect::TimeCellChanged(index));
        }
        if let Some(index) = self.slots.index_of(time) {
            effects.push(SelectionEffect::TimeCellChanged(index));
        }
        effects.push(SelectionEffect::TimeSelected(Some(time)));
        effects
    }

    pub fn clear_date(&mut self) -> Vec<SelectionEffect> {
        match self.state.date {
            Some(date) => self.select_date(date),
            None => Vec::new(),
        }
    }

    pub fn clear_time(&mut self) -> Vec<SelectionEffect> {
        match self.state.time {
            Some(time) => self.select_time(time),
            None => Vec::new(),
        }
    }

    /// Installs saved data without producing listener notifications.
    ///
    /// A saved time that is no longer offered for the saved date is dropped.
    pub fn restore(
        &mut self,
        availability: AvailabilityMap,
        prices: PriceMap,
        state: SelectionState,
    ) -> Vec<SelectionEffect> {
        self.availability = availability;
        self.prices = prices;
        self.state = match state.date {
            Some(_) => state,
            None => SelectionState::default(),
        };

        let mut effects = vec![SelectionEffect::AllDatesChanged];
        if self.state.date.is_none() {
            self.slots.clear();
            effects.push(SelectionEffect::SlotsHidden);
        }
        self.refresh_slots(&mut effects);
        effects.retain(|effect| !effect.is_notification());
        effects
    }

    fn refresh_slots(&mut self, effects: &mut Vec<SelectionEffect>) {
        let Some(date) = self.state.date else {
            return;
        };

        match self.availability.get(&date) {
            Some(list) => {
                self.slots.replace(list.clone());
                effects.push(SelectionEffect::SlotsShown);
            }
            None => {
                self.slots.clear();
                effects.push(SelectionEffect::SlotsHidden);
            }
        }

        if let Some(time) = self.state.time
            && !self.slots.contains(time)
        {
            debug!(%time, %date, "selected time no longer offered; clearing");
            self.state.time = None;
            effects.push(SelectionEffect::TimeSelected(None));
        }
    }
}
