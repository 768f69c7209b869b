use chrono::NaiveDateTime;

/// Slots rendered in the time strip for the selected date.
///
/// The strip is shown whenever the selected date has an availability entry,
/// even an empty one, and hidden otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSlotList {
    slots: Vec<NaiveDateTime>,
    visible: bool,
}

impl TimeSlotList {
    pub fn replace(&mut self, slots: Vec<NaiveDateTime>) {
        self.slots = slots;
        self.visible = true;
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.visible = false;
    }

    pub fn index_of(&self, slot: NaiveDateTime) -> Option<usize> {
        self.slots.iter().position(|candidate| *candidate == slot)
    }

    pub fn contains(&self, slot: NaiveDateTime) -> bool {
        self.index_of(slot).is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn slots(&self) -> &[NaiveDateTime] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
