//! Date range arithmetic for the date strip.
//!
//! All ranges are inclusive on both ends and ascending.

use chrono::{Duration, NaiveDate};

use crate::error::PickerError;

pub const DEFAULT_SPAN_DAYS: u32 = 91;
pub const DEFAULT_LEAD_DAYS: u32 = 45;
pub const DEFAULT_DISPLAY_BUFFER_DAYS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarRange {
    span_days: u32,
    lead_days: u32,
    display_buffer_days: u32,
}

impl Default for CalendarRange {
    fn default() -> Self {
        Self {
            span_days: DEFAULT_SPAN_DAYS,
            lead_days: DEFAULT_LEAD_DAYS,
            display_buffer_days: DEFAULT_DISPLAY_BUFFER_DAYS,
        }
    }
}

impl CalendarRange {
    /// A zero span is bumped to one day and the lead is clamped inside the span.
    pub fn new(span_days: u32, lead_days: u32, display_buffer_days: u32) -> Self {
        let span_days = span_days.max(1);
        Self {
            span_days,
            lead_days: lead_days.min(span_days - 1),
            display_buffer_days,
        }
    }

    pub fn span_days(&self) -> u32 {
        self.span_days
    }

    pub fn lead_days(&self) -> u32 {
        self.lead_days
    }

    pub fn display_buffer_days(&self) -> u32 {
        self.display_buffer_days
    }

    pub fn default_window(&self, today: NaiveDate) -> Vec<NaiveDate> {
        let start = shift_days(today, -i64::from(self.lead_days));
        self.run_from(start)
    }

    pub fn extend_after(&self, date: NaiveDate) -> Vec<NaiveDate> {
        match date.succ_opt() {
            Some(start) => self.run_from(start),
            None => Vec::new(),
        }
    }

    pub fn extend_before(&self, date: NaiveDate) -> Vec<NaiveDate> {
        let Some(end) = date.pred_opt() else {
            return Vec::new();
        };
        let start = shift_days(date, -i64::from(self.span_days));
        days_between(start, end)
    }

    /// Dates from `current_end + 1` to `target + buffer`; empty when the
    /// target is already covered.
    pub fn fill_to_date_after_end(&self, current_end: NaiveDate, target: NaiveDate) -> Vec<NaiveDate> {
        let Some(start) = current_end.succ_opt() else {
            return Vec::new();
        };
        let end = shift_days(target, i64::from(self.display_buffer_days));
        days_between(start, end)
    }

    /// Dates from `target - buffer` to `current_start - 1`; empty when the
    /// target is already covered.
    pub fn fill_to_date_before_start(
        &self,
        current_start: NaiveDate,
        target: NaiveDate,
    ) -> Vec<NaiveDate> {
        let Some(end) = current_start.pred_opt() else {
            return Vec::new();
        };
        let start = shift_days(target, -i64::from(self.display_buffer_days));
        days_between(start, end)
    }

    fn run_from(&self, start: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take(self.span_days as usize)
            .collect()
    }
}

/// Every date in `[from, to]`.
pub fn enumerate(from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>, PickerError> {
    if from > to {
        return Err(PickerError::InvalidRange { from, to });
    }
    Ok(days_between(from, to))
}

/// Adds `days`, saturating at the ends of the representable calendar.
pub fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 {
            NaiveDate::MIN
        } else {
            NaiveDate::MAX
        })
}

fn days_between(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    if from > to {
        return Vec::new();
    }
    from.iter_days().take_while(|day| *day <= to).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn assert_contiguous(dates: &[NaiveDate]) {
        for pair in dates.windows(2) {
            assert_eq!(pair[1], pair[0] + Duration::days(1));
        }
    }

    #[test]
    fn default_window_is_91_days_from_45_before_today() {
        let today = day(2024, 3, 15);
        let window = CalendarRange::default().default_window(today);
        assert_eq!(window.len(), 91);
        assert_eq!(window[0], today - Duration::days(45));
        assert_eq!(window[45], today);
        assert_eq!(window[90], today + Duration::days(45));
        assert_contiguous(&window);
    }

    #[test]
    fn extend_after_starts_the_next_day() {
        let range = CalendarRange::default().extend_after(day(2024, 1, 5));
        assert_eq!(range.len(), 91);
        assert_eq!(range[0], day(2024, 1, 6));
        assert_eq!(range[90], day(2024, 1, 6) + Duration::days(90));
        assert_contiguous(&range);
    }

    #[test]
    fn extend_before_ends_the_previous_day() {
        let range = CalendarRange::default().extend_before(day(2024, 4, 1));
        assert_eq!(range.len(), 91);
        assert_eq!(range[0], day(2024, 4, 1) - Duration::days(91));
        assert_eq!(range[90], day(2024, 3, 31));
        assert_contiguous(&range);
    }

    #[test]
    fn enumerate_counts_both_ends() {
        let from = day(2023, 12, 20);
        let to = day(2024, 2, 10);
        let dates = enumerate(from, to).expect("ordered range");
        assert_eq!(dates.len() as i64, (to - from).num_days() + 1);
        assert_eq!(dates.first(), Some(&from));
        assert_eq!(dates.last(), Some(&to));
        assert_contiguous(&dates);
    }

    #[test]
    fn enumerate_single_day() {
        let only = day(2024, 2, 29);
        assert_eq!(enumerate(only, only), Ok(vec![only]));
    }

    #[test]
    fn enumerate_rejects_reversed_range() {
        let err = enumerate(day(2024, 1, 2), day(2024, 1, 1)).expect_err("reversed");
        assert!(matches!(err, PickerError::InvalidRange { .. }));
    }

    #[test]
    fn fill_after_end_reaches_past_target() {
        let end = day(2024, 1, 5);
        let target = day(2024, 2, 1);
        let fill = CalendarRange::default().fill_to_date_after_end(end, target);
        assert_eq!(fill.first(), Some(&day(2024, 1, 6)));
        assert_eq!(fill.last(), Some(&day(2024, 2, 21)));
        assert!(fill.contains(&target));
        assert_contiguous(&fill);
    }

    #[test]
    fn fill_before_start_reaches_before_target() {
        let start = day(2024, 3, 1);
        let target = day(2024, 2, 1);
        let fill = CalendarRange::default().fill_to_date_before_start(start, target);
        assert_eq!(fill.first(), Some(&day(2024, 1, 12)));
        assert_eq!(fill.last(), Some(&day(2024, 2, 29)));
        assert!(fill.contains(&target));
    }

    #[test]
    fn custom_span_and_clamped_lead() {
        let range = CalendarRange::new(7, 30, 2);
        assert_eq!(range.lead_days(), 6);
        let window = range.default_window(day(2024, 1, 10));
        assert_eq!(window.len(), 7);
        assert_eq!(window[0], day(2024, 1, 4));
    }

    #[test]
    fn extension_at_calendar_edge_is_empty() {
        let range = CalendarRange::default();
        assert!(range.extend_after(NaiveDate::MAX).is_empty());
        assert!(range.extend_before(NaiveDate::MIN).is_empty());
    }
}
