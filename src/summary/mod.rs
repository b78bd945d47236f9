use time::{Date, Duration, OffsetDateTime, UtcOffset};

use crate::meals::model::Meal;
use crate::nutrition::MacroTotals;

mod dto;
pub mod handlers;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SummaryError {
    #[error("unsupported window of {0} days (expected 7, 30 or 90)")]
    UnsupportedWindow(u32),
}

/// Trailing report window, in calendar days including today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Week,
    Month,
    Quarter,
}

impl Window {
    pub fn days(self) -> u32 {
        match self {
            Window::Week => 7,
            Window::Month => 30,
            Window::Quarter => 90,
        }
    }
}

impl TryFrom<u32> for Window {
    type Error = SummaryError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        match days {
            7 => Ok(Window::Week),
            30 => Ok(Window::Month),
            90 => Ok(Window::Quarter),
            other => Err(SummaryError::UnsupportedWindow(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayBucket {
    pub date: Date,
    pub totals: MacroTotals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSummary {
    /// One bucket per day, oldest first, empty days included.
    pub series: Vec<DayBucket>,
    pub total: MacroTotals,
}

/// Calendar date of `ts` as seen from `zone`.
pub fn local_date(ts: OffsetDateTime, zone: UtcOffset) -> Date {
    ts.to_offset(zone).date()
}

/// Sum every meal logged on `day` in `zone`. Totals are not rounded.
pub fn summarize_day(meals: &[Meal], day: Date, zone: UtcOffset) -> MacroTotals {
    meals
        .iter()
        .filter(|m| local_date(m.created_at, zone) == day)
        .map(Meal::macros)
        .sum()
}

/// Per-day totals for the `window` days ending on `today` (inclusive).
///
/// Buckets exist for every day in range before any meal is applied, so the
/// series always has `window.days()` entries. Meals outside the range are
/// ignored.
pub fn summarize_window(
    meals: &[Meal],
    window: Window,
    today: Date,
    zone: UtcOffset,
) -> WindowSummary {
    let days = i64::from(window.days());
    let start = today - Duration::days(days - 1);

    let mut series: Vec<DayBucket> = (0..days)
        .map(|offset| DayBucket {
            date: start + Duration::days(offset),
            totals: MacroTotals::ZERO,
        })
        .collect();

    for meal in meals {
        let date = local_date(meal.created_at, zone);
        if date < start || date > today {
            continue;
        }
        let idx = (date - start).whole_days() as usize;
        series[idx].totals += meal.macros();
    }

    let total = series.iter().map(|b| b.totals).sum();
    WindowSummary { series, total }
}
