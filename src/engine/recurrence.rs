// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pure recurrence expansion. No storage, no clocks: a definition plus a
//! half-open window in, concrete occurrence dates out. Occurrence `i` is
//! always derived from the start date, never from the previous (possibly
//! clipped) occurrence, so a Jan 31 monthly series yields Feb 28 and then
//! Mar 31 rather than drifting to the 28th forever.

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{CalendarEvent, Frequency};

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A recurring definition reduced to what expansion needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    pub start: NaiveDate,
    pub frequency: Frequency,
    /// Hard stop: at most this many occurrences, counted from the start.
    /// Wins over `until` when both are present and it is reached first.
    pub count: Option<u32>,
    /// Inclusive last admissible date.
    pub until: Option<NaiveDate>,
}

impl Recurrence {
    /// Date of the 0-based occurrence `index`.
    pub fn occurrence(&self, index: u32) -> NaiveDate {
        step(self.frequency, self.start, index)
    }

    /// Lazy, restartable expansion over `window`. Repeated calls with
    /// adjacent windows partition the full sequence exactly.
    pub fn expand(&self, window: Window) -> Occurrences {
        Occurrences {
            rule: *self,
            window,
            next_index: if window.is_empty() {
                0
            } else {
                first_candidate_index(self, window.start)
            },
        }
    }
}

pub struct Occurrences {
    rule: Recurrence,
    window: Window,
    next_index: u32,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.window.is_empty() {
            return None;
        }
        loop {
            if let Some(count) = self.rule.count {
                if self.next_index >= count {
                    return None;
                }
            }
            let date = self.rule.occurrence(self.next_index);
            if date >= self.window.end {
                return None;
            }
            if let Some(until) = self.rule.until {
                if date > until {
                    return None;
                }
            }
            self.next_index = self.next_index.saturating_add(1);
            if date >= self.window.start {
                return Some(date);
            }
            // Still before the window: only happens for the few indexes the
            // conservative fast-forward undershoots by.
        }
    }
}

/// All in-window dates for an event: full expansion for recurring
/// definitions, the bare start date otherwise.
pub fn event_dates(event: &CalendarEvent, window: Window) -> Vec<NaiveDate> {
    match recurrence_of(event) {
        Some(rule) => rule.expand(window).collect(),
        None => {
            if window.contains(event.start_date) {
                vec![event.start_date]
            } else {
                Vec::new()
            }
        }
    }
}

/// The recurrence rule of an event, if it is well-formed recurring.
/// (Recurring rows without a frequency are rejected at write time; if one
/// is ever met here it degrades to a single occurrence and `doctor` will
/// flag the row.)
pub fn recurrence_of(event: &CalendarEvent) -> Option<Recurrence> {
    if !event.is_recurring {
        return None;
    }
    event.frequency.map(|frequency| Recurrence {
        start: event.start_date,
        frequency,
        count: event.recurrence_count,
        until: event.end_date,
    })
}

fn step(freq: Frequency, start: NaiveDate, index: u32) -> NaiveDate {
    match freq {
        Frequency::Daily => start + Duration::days(index as i64),
        Frequency::Weekly => start + Duration::days(7 * index as i64),
        Frequency::BiWeekly => start + Duration::days(14 * index as i64),
        Frequency::Monthly => shift_months(start, index as i32),
        Frequency::Quarterly => shift_months(start, 3 * index as i32),
        Frequency::Yearly => shift_months(start, 12 * index as i32),
    }
}

/// Lower bound on the first occurrence index that can land on or after
/// `from`. May undershoot (day-of-month clipping), never overshoots.
fn first_candidate_index(rule: &Recurrence, from: NaiveDate) -> u32 {
    if from <= rule.start {
        return 0;
    }
    let diff_days = (from - rule.start).num_days();
    let steps = match rule.frequency {
        Frequency::Daily => diff_days,
        Frequency::Weekly => diff_days / 7,
        Frequency::BiWeekly => diff_days / 14,
        Frequency::Monthly | Frequency::Quarterly | Frequency::Yearly => {
            let span = match rule.frequency {
                Frequency::Monthly => 1,
                Frequency::Quarterly => 3,
                _ => 12,
            };
            let months = (from.year() - rule.start.year()) as i64 * 12
                + (from.month() as i64 - rule.start.month() as i64);
            (months / span - 1).max(0)
        }
    };
    u32::try_from(steps).unwrap_or(u32::MAX)
}

/// `months` whole months after `date`, clipping the day to the target
/// month's length (Jan 31 + 1 month = Feb 28/29).
fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let zero_based = date.year() * 12 + date.month() as i32 - 1 + months;
    let year = zero_based.div_euclid(12);
    let month = (zero_based.rem_euclid(12) + 1) as u32;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_shift_clips_to_short_months() {
        assert_eq!(shift_months(d(2024, 1, 31), 1), d(2024, 2, 29));
        assert_eq!(shift_months(d(2023, 1, 31), 1), d(2023, 2, 28));
        assert_eq!(shift_months(d(2023, 1, 31), 2), d(2023, 3, 31));
        assert_eq!(shift_months(d(2023, 11, 30), 3), d(2024, 2, 29));
    }

    #[test]
    fn month_shift_crosses_year_boundaries() {
        assert_eq!(shift_months(d(2023, 12, 15), 1), d(2024, 1, 15));
        assert_eq!(shift_months(d(2023, 10, 1), 5), d(2024, 3, 1));
    }

    #[test]
    fn fast_forward_never_overshoots() {
        let rule = Recurrence {
            start: d(2020, 1, 31),
            frequency: Frequency::Monthly,
            count: None,
            until: None,
        };
        // First in-window occurrence must still be produced even though the
        // index estimate starts before the window.
        let got: Vec<_> = rule
            .expand(Window::new(d(2024, 2, 1), d(2024, 4, 1)))
            .collect();
        assert_eq!(got, vec![d(2024, 2, 29), d(2024, 3, 31)]);
    }
}
