use std::sync::Arc;

use chrono::NaiveDate;
use foundation::date::{Clock, add_days, days_before};

/// Inputs a [`FrameSet`] is derived from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub step_days: u32,
}

impl FrameRange {
    pub fn new(from: NaiveDate, to: NaiveDate, step_days: u32) -> Self {
        Self {
            from,
            to,
            step_days,
        }
    }

    /// The week ending on `today`, one frame per day.
    pub fn last_week(today: NaiveDate) -> Self {
        Self::new(days_before(today, 6), today, 1)
    }
}

/// Ordered playback dates.
///
/// Never empty. Dates increase strictly by the step, start at the range's
/// `from`, and include `to` only when it lands exactly on a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    frames: Vec<NaiveDate>,
}

impl FrameSet {
    /// Derive frames from `range`. An inverted range yields `[today]`.
    pub fn build(range: FrameRange, today: NaiveDate) -> Self {
        let step = u64::from(range.step_days.max(1));

        let mut frames = Vec::new();
        let mut cursor = Some(range.from);
        while let Some(day) = cursor {
            if day > range.to {
                break;
            }
            frames.push(day);
            cursor = add_days(day, step);
        }

        if frames.is_empty() {
            frames.push(today);
        }
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first(&self) -> NaiveDate {
        self.frames[0]
    }

    pub fn get(&self, index: usize) -> Option<NaiveDate> {
        self.frames.get(index).copied()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.frames.binary_search(&date).ok()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.index_of(date).is_some()
    }

    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.frames.len() - 1)
    }

    /// Index after `index`, wrapping to 0 when `looping`.
    pub fn advance(&self, index: usize, looping: bool) -> Option<usize> {
        let next = index + 1;
        if next < self.frames.len() {
            Some(next)
        } else if looping {
            Some(0)
        } else {
            None
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.frames
    }
}

/// Builds frame sets against an injectable notion of "today".
#[derive(Debug, Clone)]
pub struct FrameSequencer {
    clock: Arc<dyn Clock>,
}

impl FrameSequencer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn build(&self, range: FrameRange) -> FrameSet {
        FrameSet::build(range, self.clock.today())
    }

    pub fn default_range(&self) -> FrameRange {
        FrameRange::last_week(self.clock.today())
    }
}
