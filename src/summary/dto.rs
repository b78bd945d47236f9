use serde::{Deserialize, Serialize};

use super::{DayBucket, WindowSummary};
use crate::nutrition::MacroTotals;

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    /// `YYYY-MM-DD`; today in the caller's zone when absent.
    pub date: Option<String>,
    pub tz_offset_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    #[serde(default = "default_days")]
    pub days: u32,
    pub tz_offset_minutes: Option<i32>,
}

fn default_days() -> u32 {
    7
}

#[derive(Debug, Serialize)]
pub struct DaySummaryResponse {
    pub date: String,
    pub tz_offset_minutes: i32,
    pub totals: MacroTotals,
}

#[derive(Debug, Serialize)]
pub struct BucketResponse {
    pub date: String,
    pub totals: MacroTotals,
}

impl From<&DayBucket> for BucketResponse {
    fn from(b: &DayBucket) -> Self {
        Self {
            date: b.date.to_string(),
            totals: b.totals,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WindowSummaryResponse {
    pub days: u32,
    pub tz_offset_minutes: i32,
    pub series: Vec<BucketResponse>,
    pub total: MacroTotals,
}

impl WindowSummaryResponse {
    pub fn new(days: u32, tz_offset_minutes: i32, summary: &WindowSummary) -> Self {
        Self {
            days,
            tz_offset_minutes,
            series: summary.series.iter().map(BucketResponse::from).collect(),
            total: summary.total,
        }
    }
}
