use chrono::NaiveDate;

use crate::error::PickerError;

/// Positions inserted into the date strip by a prepend or append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertedRange {
    pub index: usize,
    pub count: usize,
}

/// Ascending, duplicate-free run of dates backing the date strip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateWindow {
    dates: Vec<NaiveDate>,
}

impl DateWindow {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        let mut window = Self::default();
        window.init(dates);
        window
    }

    /// Replaces the contents wholesale. Input is sorted and de-duplicated.
    pub fn init(&mut self, mut dates: Vec<NaiveDate>) {
        dates.sort_unstable();
        dates.dedup();
        self.dates = dates;
    }

    pub fn prepend(&mut self, dates: Vec<NaiveDate>) -> Result<Option<InsertedRange>, PickerError> {
        let Some((first, last)) = ascending_bounds(&dates, "start")? else {
            return Ok(None);
        };
        if let Some(current) = self.dates.first()
            && last >= *current
        {
            return Err(PickerError::OutOfOrder {
                side: "start",
                first,
                last,
            });
        }

        let count = dates.len();
        self.dates.splice(0..0, dates);
        Ok(Some(InsertedRange { index: 0, count }))
    }

    pub fn append(&mut self, dates: Vec<NaiveDate>) -> Result<Option<InsertedRange>, PickerError> {
        let Some((first, last)) = ascending_bounds(&dates, "end")? else {
            return Ok(None);
        };
        if let Some(current) = self.dates.last()
            && first <= *current
        {
            return Err(PickerError::OutOfOrder {
                side: "end",
                first,
                last,
            });
        }

        let index = self.dates.len();
        let count = dates.len();
        self.dates.extend(dates);
        Ok(Some(InsertedRange { index, count }))
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.index_of(date).is_some()
    }

    pub fn first(&self) -> Result<NaiveDate, PickerError> {
        self.dates.first().copied().ok_or(PickerError::EmptyWindow)
    }

    pub fn last(&self) -> Result<NaiveDate, PickerError> {
        self.dates.last().copied().ok_or(PickerError::EmptyWindow)
    }

    pub fn get(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }
}

fn ascending_bounds(
    dates: &[NaiveDate],
    side: &'static str,
) -> Result<Option<(NaiveDate, NaiveDate)>, PickerError> {
    let (Some(first), Some(last)) = (dates.first().copied(), dates.last().copied()) else {
        return Ok(None);
    };
    if dates.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(PickerError::OutOfOrder { side, first, last });
    }
    Ok(Some((first, last)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::enumerate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn january() -> DateWindow {
        DateWindow::new(enumerate(day(2024, 1, 10), day(2024, 1, 20)).expect("range"))
    }

    #[test]
    fn init_sorts_and_deduplicates() {
        let window = DateWindow::new(vec![day(2024, 1, 3), day(2024, 1, 1), day(2024, 1, 3)]);
        assert_eq!(window.dates(), &[day(2024, 1, 1), day(2024, 1, 3)]);
    }

    #[test]
    fn prepend_reports_range_at_zero_and_shifts_indexes() {
        let mut window = january();
        assert_eq!(window.index_of(day(2024, 1, 10)), Some(0));

        let inserted = window
            .prepend(enumerate(day(2024, 1, 5), day(2024, 1, 9)).expect("range"))
            .expect("prepend");
        assert_eq!(inserted, Some(InsertedRange { index: 0, count: 5 }));
        assert_eq!(window.first(), Ok(day(2024, 1, 5)));
        assert_eq!(window.index_of(day(2024, 1, 10)), Some(5));
    }

    #[test]
    fn append_reports_range_at_old_len() {
        let mut window = january();
        let inserted = window
            .append(enumerate(day(2024, 1, 21), day(2024, 1, 23)).expect("range"))
            .expect("append");
        assert_eq!(inserted, Some(InsertedRange { index: 11, count: 3 }));
        assert_eq!(window.last(), Ok(day(2024, 1, 23)));
        assert_eq!(window.len(), 14);
    }

    #[test]
    fn overlapping_runs_are_rejected() {
        let mut window = january();
        let err = window
            .append(vec![day(2024, 1, 20), day(2024, 1, 21)])
            .expect_err("overlap");
        assert!(matches!(err, PickerError::OutOfOrder { side: "end", .. }));

        let err = window
            .prepend(vec![day(2024, 1, 9), day(2024, 1, 10)])
            .expect_err("overlap");
        assert!(matches!(err, PickerError::OutOfOrder { side: "start", .. }));
        assert_eq!(window.len(), 11);
    }

    #[test]
    fn empty_input_inserts_nothing() {
        let mut window = january();
        assert_eq!(window.append(Vec::new()), Ok(None));
        assert_eq!(window.prepend(Vec::new()), Ok(None));
    }

    #[test]
    fn empty_window_bounds_fail() {
        let window = DateWindow::default();
        assert_eq!(window.first(), Err(PickerError::EmptyWindow));
        assert_eq!(window.last(), Err(PickerError::EmptyWindow));
        assert_eq!(window.index_of(day(2024, 1, 1)), None);
    }
}
