//! Staff scheduling: shift codes, activity periods and the monthly grid.
//!
//! A schedule entry places one shift code on one staff member for one
//! activity period of a day. `full_day` occupies the whole day, so it
//! conflicts with every other period on the same date; the partial periods
//! (`morning`, `afternoon`, `night`) only conflict with themselves.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveTime};
use serde::Serialize;

use crate::dates::month_bounds;
use crate::error::CoreError;
use crate::types::{Date, DbId};

define_text_enum! {
    /// Portion of a day covered by a schedule entry.
    ActivityPeriod("activity period") {
        FullDay = "full_day",
        Morning = "morning",
        Afternoon = "afternoon",
        Night = "night",
    }
}

/// Whether two entries on the same user and date would collide.
pub fn periods_conflict(a: ActivityPeriod, b: ActivityPeriod) -> bool {
    a == b || a == ActivityPeriod::FullDay || b == ActivityPeriod::FullDay
}

/// Validate a shift code: 1..=8 chars, uppercase letters and digits.
pub fn validate_shift_code(code: &str) -> Result<(), CoreError> {
    if code.is_empty() || code.len() > 8 {
        return Err(CoreError::Validation(
            "Shift code must be between 1 and 8 characters".into(),
        ));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(CoreError::Validation(format!(
            "Shift code '{code}' must contain only uppercase letters and digits"
        )));
    }
    Ok(())
}

/// A working shift needs both a start and an end time; a non-working code
/// (day off, annual leave) may omit them.
pub fn validate_shift_times(
    is_working: bool,
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
) -> Result<(), CoreError> {
    match (is_working, start, end) {
        (true, Some(s), Some(e)) if s == e => Err(CoreError::Validation(
            "Shift start and end time must differ".into(),
        )),
        (true, Some(_), Some(_)) => Ok(()),
        (true, _, _) => Err(CoreError::Validation(
            "Working shifts require start_time and end_time".into(),
        )),
        (false, _, _) => Ok(()),
    }
}

/// Length of a shift in hours. An end time at or before the start wraps past
/// midnight (22:00 -> 06:00 is 8 hours).
pub fn shift_hours(start: NaiveTime, end: NaiveTime) -> f64 {
    let mut minutes = (end - start).num_minutes();
    if minutes <= 0 {
        minutes += 24 * 60;
    }
    minutes as f64 / 60.0
}

/// Hours credited for a shift definition; non-working codes count zero.
pub fn credited_hours(is_working: bool, start: Option<NaiveTime>, end: Option<NaiveTime>) -> f64 {
    match (is_working, start, end) {
        (true, Some(s), Some(e)) => shift_hours(s, e),
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Monthly grid
// ---------------------------------------------------------------------------

/// One column header of the grid.
#[derive(Debug, Clone, Serialize)]
pub struct GridDay {
    pub day: u32,
    pub date: Date,
    /// ISO weekday name (`Mon` .. `Sun`).
    pub weekday: String,
}

/// A staff member shown as a grid row.
#[derive(Debug, Clone)]
pub struct GridStaff {
    pub user_id: DbId,
    pub full_name: String,
    pub position: Option<String>,
    pub department: Option<String>,
}

/// A schedule entry placed in a grid cell.
#[derive(Debug, Clone, Serialize)]
pub struct GridEntry {
    pub id: DbId,
    pub user_id: DbId,
    pub work_date: Date,
    pub shift_code: String,
    pub period: String,
    pub note: Option<String>,
}

/// Hours and working flag for a shift code.
#[derive(Debug, Clone, Copy)]
pub struct ShiftInfo {
    pub hours: f64,
    pub is_working: bool,
}

/// One staff row of the grid.
#[derive(Debug, Clone, Serialize)]
pub struct GridRow {
    pub user_id: DbId,
    pub full_name: String,
    pub position: Option<String>,
    pub department: Option<String>,
    /// Day of month -> entries on that day.
    pub cells: BTreeMap<u32, Vec<GridEntry>>,
    pub total_hours: f64,
    pub working_days: usize,
}

/// The monthly schedule grid.
#[derive(Debug, Clone, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub days_in_month: u32,
    pub days: Vec<GridDay>,
    pub rows: Vec<GridRow>,
}

/// Column headers for every day of a month.
pub fn month_days(year: i32, month: u32) -> Result<Vec<GridDay>, CoreError> {
    let (first, last) = month_bounds(year, month)?;
    Ok(first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| GridDay {
            day: date.day(),
            date,
            weekday: date.weekday().to_string(),
        })
        .collect())
}

/// Assemble the grid. Entries for users not in `staff` or outside the month
/// are ignored; unknown shift codes credit zero hours.
pub fn build_month_grid(
    year: i32,
    month: u32,
    staff: &[GridStaff],
    entries: &[GridEntry],
    shifts: &HashMap<String, ShiftInfo>,
) -> Result<MonthGrid, CoreError> {
    let days = month_days(year, month)?;
    let (first, last) = month_bounds(year, month)?;

    let mut by_user: HashMap<DbId, Vec<&GridEntry>> = HashMap::new();
    for e in entries
        .iter()
        .filter(|e| e.work_date >= first && e.work_date <= last)
    {
        by_user.entry(e.user_id).or_default().push(e);
    }

    let rows = staff
        .iter()
        .map(|s| {
            let mut cells: BTreeMap<u32, Vec<GridEntry>> = BTreeMap::new();
            let mut total_hours = 0.0;
            let mut worked: BTreeSet<Date> = BTreeSet::new();

            for e in by_user.get(&s.user_id).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(info) = shifts.get(&e.shift_code) {
                    total_hours += info.hours;
                    if info.is_working {
                        worked.insert(e.work_date);
                    }
                }
                cells
                    .entry(e.work_date.day())
                    .or_default()
                    .push((*e).clone());
            }

            GridRow {
                user_id: s.user_id,
                full_name: s.full_name.clone(),
                position: s.position.clone(),
                department: s.department.clone(),
                cells,
                total_hours,
                working_days: worked.len(),
            }
        })
        .collect();

    Ok(MonthGrid {
        year,
        month,
        days_in_month: days.len() as u32,
        days,
        rows,
    })
}
