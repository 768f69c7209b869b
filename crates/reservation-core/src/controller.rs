use std::fmt;
use std::ops::Range;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::calendar::CalendarRange;
use crate::codec::{self, PickerState};
use crate::config::PickerConfig;
use crate::datetime::Clock;
use crate::error::PickerError;
use crate::listeners::{Listener, ListenerId, ListenerSet};
use crate::model::{
    AvailabilityMap, DateCell, IngestMode, PriceMap, SelectionState, TimeCell,
};
use crate::render::{RenderInstruction, RenderSink, Strip};
use crate::scheduler::{DeferredTask, Edge, Scheduler};
use crate::selection::{SelectionEffect, SelectionModel};
use crate::slots::TimeSlotList;
use crate::window::{DateWindow, InsertedRange};

/// Entry point for host commands and user gestures.
///
/// Render instructions accumulate until the host drains them with
/// [`take_render_instructions`](Self::take_render_instructions) or
/// [`flush_to`](Self::flush_to). Listener callbacks fire synchronously.
pub struct PickerController {
    range: CalendarRange,
    edge_threshold: usize,
    date_toggle_off: bool,
    validate_time_taps: bool,
    clock: Box<dyn Clock>,
    window: DateWindow,
    selection: SelectionModel,
    scheduler: Scheduler,
    date_listeners: ListenerSet<NaiveDate>,
    time_listeners: ListenerSet<NaiveDateTime>,
    pending: Vec<RenderInstruction>,
    restored: bool,
    attached: bool,
    first_visible: Option<usize>,
}

impl fmt::Debug for PickerController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PickerController")
            .field("range", &self.range)
            .field("window_len", &self.window.len())
            .field("selection", self.selection.state())
            .field("restored", &self.restored)
            .field("attached", &self.attached)
            .field("first_visible", &self.first_visible)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl PickerController {
    pub fn new(cfg: &PickerConfig, clock: Box<dyn Clock>) -> Self {
        let range = cfg.calendar_range();
        let window = DateWindow::new(range.default_window(clock.today()));
        debug!(
            span = range.span_days(),
            lead = range.lead_days(),
            len = window.len(),
            "created picker controller"
        );

        Self {
            range,
            edge_threshold: cfg.window.edge_threshold,
            date_toggle_off: cfg.selection.date_toggle_off,
            validate_time_taps: cfg.selection.validate_time_taps,
            clock,
            window,
            selection: SelectionModel::default(),
            scheduler: Scheduler::default(),
            date_listeners: ListenerSet::default(),
            time_listeners: ListenerSet::default(),
            pending: Vec::new(),
            restored: false,
            attached: false,
            first_visible: None,
        }
    }

    // Lifecycle

    /// Positions the date strip: on the restored scroll index when state was
    /// restored, otherwise on today.
    #[instrument(skip(self))]
    pub fn on_attach(&mut self) {
        self.attached = true;
        if self.restored {
            if let Some(index) = self.first_visible {
                info!(index, "attached with restored state");
                self.request_scroll(index);
            }
            return;
        }

        let today = self.clock.today();
        info!(%today, "attached without restored state");
        self.scroll_to_date(today);
    }

    #[instrument(skip(self))]
    pub fn on_save_state(&self) -> Result<PickerState, PickerError> {
        let state = self.selection.state();
        Ok(PickerState {
            availability: self.selection.availability().clone(),
            prices: self.selection.prices().clone(),
            selected_date: state.date,
            selected_time: state.time,
            window_start: self.window.first()?,
            window_end: self.window.last()?,
            scroll_position: self.first_visible,
        })
    }

    /// Encodes the current state into a blob for [`on_restore_state`](Self::on_restore_state).
    pub fn save_blob(&self) -> Result<String, PickerError> {
        codec::encode(&self.on_save_state()?)
    }

    /// Restores from a saved blob. An absent or unreadable blob leaves the
    /// default construction in place and returns `false`.
    #[instrument(skip(self, blob))]
    pub fn on_restore_state(&mut self, blob: Option<&str>) -> bool {
        let Some(blob) = blob else {
            debug!("no saved state to restore");
            return false;
        };

        match codec::decode(blob).and_then(|state| self.restore_state(state)) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "discarding saved picker state");
                false
            }
        }
    }

    pub fn restore_state(&mut self, state: PickerState) -> Result<(), PickerError> {
        let dates = state.window_dates()?;
        self.window.init(dates);
        self.scheduler.reset();

        let effects = self.selection.restore(
            state.availability,
            state.prices,
            SelectionState {
                date: state.selected_date,
                time: state.selected_time,
            },
        );
        self.apply(effects);

        self.restored = true;
        self.first_visible = state
            .scroll_position
            .filter(|index| *index < self.window.len());
        info!(
            len = self.window.len(),
            scroll = ?self.first_visible,
            "restored picker state"
        );

        if self.attached
            && let Some(index) = self.first_visible
        {
            self.request_scroll(index);
        }
        Ok(())
    }

    // Gestures

    /// Raw scroll report from the date strip.
    pub fn on_visible_range_changed(&mut self, first: usize, last: usize) {
        self.first_visible = Some(first);
        if self.window.is_empty() {
            return;
        }

        if first <= self.edge_threshold {
            self.on_near_start_of_visible_range();
        } else if last.saturating_add(self.edge_threshold) >= self.window.len() {
            self.on_near_end_of_visible_range();
        }
    }

    pub fn on_near_start_of_visible_range(&mut self) -> bool {
        self.scheduler.post_extension(Edge::Start)
    }

    pub fn on_near_end_of_visible_range(&mut self) -> bool {
        self.scheduler.post_extension(Edge::End)
    }

    /// Runs posted extension tasks. The host calls this once the current
    /// layout/scroll pass is over. Returns how many tasks ran.
    #[instrument(skip(self))]
    pub fn run_deferred(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.scheduler.next_task() {
            match task {
                DeferredTask::Extend(edge) => {
                    if let Err(err) = self.extend(edge) {
                        tracing::error!(?edge, error = %err, "window extension failed");
                    }
                    self.scheduler.finish_extension(edge);
                }
            }
            ran += 1;
        }
        ran
    }

    pub fn has_deferred(&self) -> bool {
        self.scheduler.pending() > 0
    }

    #[instrument(skip(self))]
    pub fn on_date_tapped(&mut self, date: NaiveDate) {
        if !self.is_selectable(date) {
            debug!(%date, "ignoring tap on past date");
            return;
        }
        if !self.date_toggle_off && self.selection.selected_date() == Some(date) {
            debug!(%date, "toggle-off disabled; ignoring tap on selected date");
            return;
        }
        let effects = self.selection.select_date(date);
        self.apply(effects);
    }

    #[instrument(skip(self))]
    pub fn on_time_tapped(&mut self, time: NaiveDateTime) {
        if self.validate_time_taps && !self.selection.slots().contains(time) {
            debug!(%time, "ignoring tap on slot that is not offered");
            return;
        }
        let effects = self.selection.select_time(time);
        self.apply(effects);
    }

    /// Dates from today onwards are selectable; today is read on every call.
    pub fn is_selectable(&self, date: NaiveDate) -> bool {
        date >= self.clock.today()
    }

    // Host commands

    pub fn set_time_availability_data(&mut self, data: AvailabilityMap) {
        self.ingest_availability(IngestMode::Replace, data);
    }

    pub fn put_time_availability_data(&mut self, data: AvailabilityMap) {
        self.ingest_availability(IngestMode::Merge, data);
    }

    pub fn clear_time_availability_data(&mut self) {
        self.ingest_availability(IngestMode::Replace, AvailabilityMap::new());
    }

    #[instrument(skip(self, data))]
    pub fn ingest_availability(&mut self, mode: IngestMode, data: AvailabilityMap) {
        let effects = self.selection.ingest_availability(mode, data);
        self.apply(effects);
    }

    pub fn set_price_data(&mut self, data: PriceMap) {
        self.ingest_price(IngestMode::Replace, data);
    }

    pub fn put_price_data(&mut self, data: PriceMap) {
        self.ingest_price(IngestMode::Merge, data);
    }

    pub fn clear_price_data(&mut self) {
        self.ingest_price(IngestMode::Replace, PriceMap::new());
    }

    #[instrument(skip(self, data))]
    pub fn ingest_price(&mut self, mode: IngestMode, data: PriceMap) {
        let effects = self.selection.ingest_price(mode, data);
        self.apply(effects);
    }

    /// Selects `date` unless it is already selected. Past dates are allowed.
    #[instrument(skip(self))]
    pub fn set_selected_date(&mut self, date: NaiveDate) {
        if self.selection.selected_date() == Some(date) {
            return;
        }
        let effects = self.selection.select_date(date);
        self.apply(effects);
    }

    pub fn clear_selected_date(&mut self) {
        let effects = self.selection.clear_date();
        self.apply(effects);
    }

    #[instrument(skip(self))]
    pub fn set_selected_time(&mut self, time: NaiveDateTime) {
        if self.selection.selected_time() == Some(time) {
            return;
        }
        if self.validate_time_taps && !self.selection.slots().contains(time) {
            warn!(%time, "slot is not offered for the selected date; ignoring");
            return;
        }
        let effects = self.selection.select_time(time);
        self.apply(effects);
    }

    pub fn clear_selected_time(&mut self) {
        let effects = self.selection.clear_time();
        self.apply(effects);
    }

    /// Scrolls the date strip to `date`, growing the window first when the
    /// date lies outside it. Returns the index scrolled to.
    #[instrument(skip(self))]
    pub fn scroll_to_date(&mut self, date: NaiveDate) -> Option<usize> {
        if let Some(index) = self.window.index_of(date) {
            self.request_scroll(index);
            return Some(index);
        }

        let (Ok(start), Ok(end)) = (self.window.first(), self.window.last()) else {
            warn!("date window is empty; rebuilding around target");
            self.window.init(self.range.default_window(date));
            self.pending.push(RenderInstruction::Invalidate(Strip::Dates));
            let index = self.window.index_of(date)?;
            self.request_scroll(index);
            return Some(index);
        };

        let grown = if date < start {
            let fill = self.range.fill_to_date_before_start(start, date);
            self.window.prepend(fill)
        } else if date > end {
            let fill = self.range.fill_to_date_after_end(end, date);
            self.window.append(fill)
        } else {
            Ok(None)
        };

        match grown {
            Ok(Some(inserted)) => self.note_inserted(inserted),
            Ok(None) => {}
            Err(err) => {
                warn!(%date, error = %err, "failed to grow window for scroll target");
                return None;
            }
        }

        let index = self.window.index_of(date)?;
        self.request_scroll(index);
        Some(index)
    }

    pub fn add_on_date_selected_listener(&mut self, listener: Listener<NaiveDate>) -> ListenerId {
        self.date_listeners.add(listener)
    }

    pub fn remove_on_date_selected_listener(&mut self, id: ListenerId) -> bool {
        self.date_listeners.remove(id)
    }

    pub fn add_on_time_selected_listener(
        &mut self,
        listener: Listener<NaiveDateTime>,
    ) -> ListenerId {
        self.time_listeners.add(listener)
    }

    pub fn remove_on_time_selected_listener(&mut self, id: ListenerId) -> bool {
        self.time_listeners.remove(id)
    }

    // Queries

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn time_availability_data(&self) -> &AvailabilityMap {
        self.selection.availability()
    }

    pub fn price_data(&self) -> &PriceMap {
        self.selection.prices()
    }

    pub fn selection(&self) -> &SelectionState {
        self.selection.state()
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    pub fn time_slots(&self) -> &TimeSlotList {
        self.selection.slots()
    }

    pub fn first_visible(&self) -> Option<usize> {
        self.first_visible
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    pub fn date_cells(&self, positions: Range<usize>) -> Vec<DateCell> {
        let today = self.clock.today();
        let selected = self.selection.selected_date();
        let end = positions.end.min(self.window.len());
        let start = positions.start.min(end);

        self.window.dates()[start..end]
            .iter()
            .map(|date| DateCell {
                date: *date,
                price: self.selection.price_for(*date).cloned(),
                selectable: *date >= today,
                selected: selected == Some(*date),
            })
            .collect()
    }

    pub fn time_cells(&self) -> Vec<TimeCell> {
        let selected = self.selection.selected_time();
        self.selection
            .slots()
            .slots()
            .iter()
            .map(|slot| TimeCell {
                slot: *slot,
                selected: selected == Some(*slot),
            })
            .collect()
    }

    pub fn take_render_instructions(&mut self) -> Vec<RenderInstruction> {
        std::mem::take(&mut self.pending)
    }

    pub fn flush_to(&mut self, sink: &mut dyn RenderSink) {
        for instruction in self.pending.drain(..) {
            sink.apply(instruction);
        }
    }

    fn extend(&mut self, edge: Edge) -> Result<(), PickerError> {
        let inserted = match edge {
            Edge::Start => {
                let first = self.window.first()?;
                self.window.prepend(self.range.extend_before(first))?
            }
            Edge::End => {
                let last = self.window.last()?;
                self.window.append(self.range.extend_after(last))?
            }
        };

        if let Some(inserted) = inserted {
            debug!(?edge, index = inserted.index, count = inserted.count, "extended window");
            self.note_inserted(inserted);
        }
        Ok(())
    }

    fn note_inserted(&mut self, inserted: InsertedRange) {
        if inserted.index == 0
            && let Some(first) = self.first_visible.as_mut()
        {
            *first += inserted.count;
        }
        self.pending.push(RenderInstruction::RangeInserted {
            strip: Strip::Dates,
            index: inserted.index,
            count: inserted.count,
        });
    }

    fn request_scroll(&mut self, index: usize) {
        self.first_visible = Some(index);
        self.pending.push(RenderInstruction::ScrollTo { index });
    }

    fn apply(&mut self, effects: Vec<SelectionEffect>) {
        for effect in effects {
            match effect {
                SelectionEffect::DateCellChanged(date) => {
                    if let Some(index) = self.window.index_of(date) {
                        self.pending.push(RenderInstruction::ItemChanged {
                            strip: Strip::Dates,
                            index,
                        });
                    }
                }
                SelectionEffect::TimeCellChanged(index) => {
                    self.pending.push(RenderInstruction::ItemChanged {
                        strip: Strip::Times,
                        index,
                    });
                }
                SelectionEffect::AllDatesChanged => {
                    self.pending.push(RenderInstruction::Invalidate(Strip::Dates));
                }
                SelectionEffect::SlotsShown => {
                    self.pending.push(RenderInstruction::Invalidate(Strip::Times));
                    self.pending.push(RenderInstruction::ShowTimeStrip);
                }
                SelectionEffect::SlotsHidden => {
                    self.pending.push(RenderInstruction::Invalidate(Strip::Times));
                    self.pending.push(RenderInstruction::HideTimeStrip);
                }
                SelectionEffect::DateSelected(value) => self.date_listeners.notify(value),
                SelectionEffect::TimeSelected(value) => self.time_listeners.notify(value),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::datetime::FixedClock;
    use crate::model::Price;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn controller(today: NaiveDate) -> PickerController {
        PickerController::new(&PickerConfig::default(), Box::new(FixedClock(today)))
    }

    fn narrow(controller: &mut PickerController, start: NaiveDate, end: NaiveDate) {
        controller
            .restore_state(PickerState {
                availability: AvailabilityMap::new(),
                prices: PriceMap::new(),
                selected_date: None,
                selected_time: None,
                window_start: start,
                window_end: end,
                scroll_position: None,
            })
            .expect("restore narrow window");
        controller.take_render_instructions();
    }

    #[test]
    fn attach_without_state_scrolls_to_today() {
        let today = day(2024, 3, 15);
        let mut picker = controller(today);
        picker.on_attach();

        assert_eq!(picker.window().len(), 91);
        assert_eq!(
            picker.take_render_instructions(),
            vec![RenderInstruction::ScrollTo { index: 45 }]
        );
        assert_eq!(picker.first_visible(), Some(45));
    }

    #[test]
    fn near_edge_requests_are_single_flight() {
        let mut picker = controller(day(2024, 3, 15));
        assert!(picker.on_near_end_of_visible_range());
        assert!(!picker.on_near_end_of_visible_range());
        assert!(picker.on_near_start_of_visible_range());

        assert_eq!(picker.run_deferred(), 2);
        assert_eq!(picker.window().len(), 91 * 3);
        assert!(picker.on_near_end_of_visible_range());
    }

    #[test]
    fn visible_range_checks_thresholds() {
        let mut picker = controller(day(2024, 3, 15));
        picker.on_visible_range_changed(40, 50);
        assert!(!picker.has_deferred());

        picker.on_visible_range_changed(10, 20);
        assert!(picker.has_deferred());
        picker.run_deferred();
        assert_eq!(picker.window().first(), Ok(day(2023, 10, 31)));

        let len = picker.window().len();
        picker.on_visible_range_changed(len - 15, len - 10);
        assert!(picker.has_deferred());
        picker.run_deferred();
        assert_eq!(picker.window().len(), len + 91);
    }

    #[test]
    fn prepend_shifts_recorded_scroll_position() {
        let mut picker = controller(day(2024, 3, 15));
        picker.on_visible_range_changed(5, 12);
        picker.run_deferred();
        assert_eq!(picker.first_visible(), Some(96));
    }

    #[test]
    fn scroll_before_window_start_prepends_fill() {
        let mut picker = controller(day(2024, 1, 10));
        narrow(&mut picker, day(2024, 3, 1), day(2024, 3, 5));

        let index = picker.scroll_to_date(day(2024, 2, 1)).expect("scrolled");
        assert_eq!(picker.window().first(), Ok(day(2024, 1, 12)));
        assert_eq!(index, 20);
        assert_eq!(
            picker.take_render_instructions(),
            vec![
                RenderInstruction::RangeInserted {
                    strip: Strip::Dates,
                    index: 0,
                    count: 49
                },
                RenderInstruction::ScrollTo { index: 20 }
            ]
        );
    }

    #[test]
    fn toggle_off_can_be_disabled() {
        let mut cfg = PickerConfig::default();
        cfg.selection.date_toggle_off = false;
        let mut picker = PickerController::new(&cfg, Box::new(FixedClock(day(2024, 1, 1))));

        picker.on_date_tapped(day(2024, 1, 2));
        picker.on_date_tapped(day(2024, 1, 2));
        assert_eq!(picker.selection().date, Some(day(2024, 1, 2)));

        picker.clear_selected_date();
        assert_eq!(picker.selection().date, None);
    }

    #[test]
    fn unoffered_time_tap_is_ignored_when_validating() {
        let today = day(2024, 1, 1);
        let mut picker = controller(today);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        picker.add_on_time_selected_listener(Rc::new(move |time: Option<NaiveDateTime>| {
            sink.borrow_mut().push(time)
        }));

        picker.on_date_tapped(today);
        picker.on_time_tapped(today.and_hms_opt(9, 0, 0).expect("valid time"));
        assert!(seen.borrow().is_empty());
        assert_eq!(picker.selection().time, None);
    }

    #[test]
    fn host_set_selected_date_is_idempotent_and_allows_past() {
        let mut picker = controller(day(2024, 1, 10));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        picker.add_on_date_selected_listener(Rc::new(move |date: Option<NaiveDate>| {
            sink.borrow_mut().push(date)
        }));

        picker.set_selected_date(day(2024, 1, 2));
        picker.set_selected_date(day(2024, 1, 2));
        assert_eq!(*seen.borrow(), vec![Some(day(2024, 1, 2))]);
    }

    #[test]
    fn date_cells_carry_price_and_flags() {
        let today = day(2024, 1, 10);
        let mut picker = controller(today);
        let mut prices = PriceMap::new();
        prices.insert(today, Price::new(8.3, "$"));
        picker.put_price_data(prices);
        picker.set_selected_date(today);

        let cells = picker.date_cells(44..47);
        assert_eq!(cells.len(), 3);
        assert!(!cells[0].selectable);
        assert_eq!(cells[1].date, today);
        assert!(cells[1].selected);
        assert_eq!(cells[1].price_label(), "8.3 $");
        assert_eq!(cells[2].price_label(), "-");
        assert!(picker.date_cells(500..600).is_empty());
    }

    #[test]
    fn oversized_scroll_report_extends_end_without_overflow() {
        let mut picker = controller(day(2024, 3, 15));
        picker.on_visible_range_changed(50, usize::MAX);
        assert!(picker.has_deferred());
        picker.run_deferred();
        assert_eq!(picker.window().len(), 182);
    }

    #[test]
    fn non_finite_price_does_not_break_save_and_restore() {
        let today = day(2024, 1, 10);
        let mut picker = controller(today);
        let mut prices = PriceMap::new();
        prices.insert(today, Price::new(f64::NAN, "$"));
        prices.insert(day(2024, 1, 11), Price::new(9.0, "$"));
        picker.set_price_data(prices);
        picker.set_selected_date(today);

        let blob = picker.save_blob().expect("save blob");
        let mut restored = controller(today);
        assert!(restored.on_restore_state(Some(&blob)));
        assert_eq!(restored.selection().date, Some(today));
        assert_eq!(restored.price_data().len(), 1);
    }

    #[test]
    fn price_ingest_invalidates_date_strip_only() {
        let mut picker = controller(day(2024, 1, 10));
        picker.set_price_data(PriceMap::new());
        assert_eq!(
            picker.take_render_instructions(),
            vec![RenderInstruction::Invalidate(Strip::Dates)]
        );
    }

    #[test]
    fn garbage_blob_falls_back_to_default() {
        let today = day(2024, 1, 10);
        let mut picker = controller(today);
        assert!(!picker.on_restore_state(Some("{\"version\":1}")));
        assert!(!picker.on_restore_state(None));
        assert!(!picker.is_restored());

        picker.on_attach();
        assert_eq!(
            picker.take_render_instructions(),
            vec![RenderInstruction::ScrollTo { index: 45 }]
        );
    }
}
