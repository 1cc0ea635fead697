use chrono::{Duration, NaiveDate};

use crate::error::ReportError;

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

/// Caller-facing period selector. Day counts follow the fixed window
/// choices the reporting UI offers; calendar selectors carry their own
/// validity ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSpec {
    FixedDays { days: i64 },
    Month { month: u32, year: i32 },
    Quarter { quarter: u32, year: i32 },
    Year { year: i32 },
}

/// Half-open date interval with its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPeriod {
    pub start: NaiveDate,
    pub end_exclusive: NaiveDate,
    pub label: String,
}

impl ResolvedPeriod {
    pub fn num_days(&self) -> i64 {
        (self.end_exclusive - self.start).num_days()
    }
}

/// Resolve a period spec against today's date. Window comparisons are
/// half-open: `start <= ts < end_exclusive`.
pub fn resolve(spec: &PeriodSpec, today: NaiveDate) -> Result<ResolvedPeriod, ReportError> {
    match *spec {
        PeriodSpec::FixedDays { days } => {
            if !matches!(days, 30 | 60 | 90) {
                return Err(ReportError::invalid_period(format!(
                    "unsupported day window {days} (expected 30, 60 or 90)"
                )));
            }
            Ok(ResolvedPeriod {
                start: today - Duration::days(days),
                // today itself is part of the window
                end_exclusive: today + Duration::days(1),
                label: format!("Last {days} Days"),
            })
        }
        PeriodSpec::Month { month, year } => {
            check_year(year)?;
            if !(1..=12).contains(&month) {
                return Err(ReportError::invalid_period(format!(
                    "month {month} out of range 1-12"
                )));
            }
            let start = first_of_month(year, month)?;
            let end_exclusive = if month == 12 {
                first_of_month(year + 1, 1)?
            } else {
                first_of_month(year, month + 1)?
            };
            Ok(ResolvedPeriod {
                start,
                end_exclusive,
                label: start.format("%B %Y").to_string(),
            })
        }
        PeriodSpec::Quarter { quarter, year } => {
            check_year(year)?;
            if !(1..=4).contains(&quarter) {
                return Err(ReportError::invalid_period(format!(
                    "quarter {quarter} out of range 1-4"
                )));
            }
            let start_month = (quarter - 1) * 3 + 1;
            let start = first_of_month(year, start_month)?;
            let end_exclusive = if quarter == 4 {
                first_of_month(year + 1, 1)?
            } else {
                first_of_month(year, start_month + 3)?
            };
            Ok(ResolvedPeriod {
                start,
                end_exclusive,
                label: format!("Q{quarter} {year}"),
            })
        }
        PeriodSpec::Year { year } => {
            check_year(year)?;
            Ok(ResolvedPeriod {
                start: first_of_month(year, 1)?,
                end_exclusive: first_of_month(year + 1, 1)?,
                label: year.to_string(),
            })
        }
    }
}

fn check_year(year: i32) -> Result<(), ReportError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ReportError::invalid_period(format!(
            "year {year} out of range {MIN_YEAR}-{MAX_YEAR}"
        )));
    }
    Ok(())
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, ReportError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ReportError::invalid_period(format!("no first day for {year}-{month:02}")))
}
