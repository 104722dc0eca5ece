//! # Calendar — Season Window Calculator
//!
//! Pure functions of the season configuration and the wall-clock date. Doors
//! open progressively: a door is open only once its own date has arrived, and
//! only while the season itself has not ended. No door is ever open outside
//! `[season.start, season.end]`.

use crate::config::SeasonConfig;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;

/// One calendar slot as presented to users.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CalendarDay {
    pub day: u32,
    pub date: NaiveDate,
    /// Human-readable label, e.g. "December 15".
    pub label: String,
}

/// Calendar date of a door, or None when `day` is outside `[1, days]`.
pub fn door_date(season: &SeasonConfig, day: u32) -> Option<NaiveDate> {
    if day < 1 || day > season.days {
        return None;
    }
    Some(season.start + Duration::days(i64::from(day) - 1))
}

/// A door is open iff its own date has arrived and the season has not ended:
/// `start <= door_date <= today <= end`. Invalid days are always closed.
pub fn is_day_open(season: &SeasonConfig, day: u32, today: NaiveDate) -> bool {
    match door_date(season, day) {
        Some(date) => date <= today && today <= season.end,
        None => false,
    }
}

/// All doors currently open, for the calendar overview payload.
pub fn open_days(season: &SeasonConfig, today: NaiveDate) -> BTreeSet<u32> {
    (1..=season.days)
        .filter(|&day| is_day_open(season, day, today))
        .collect()
}

/// The full ordered door list with display labels.
pub fn calendar_days(season: &SeasonConfig) -> Vec<CalendarDay> {
    (1..=season.days)
        .filter_map(|day| door_date(season, day).map(|date| (day, date)))
        .map(|(day, date)| CalendarDay {
            day,
            date,
            label: format!("{} {}", month_name(date.month()), date.day()),
        })
        .collect()
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeasonConfig;

    fn season() -> SeasonConfig {
        // Long-season shape: 31 doors starting Dec 15, season ends Jan 14 —
        // the end date is earlier than start + 31 days would imply.
        SeasonConfig {
            start: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 1, 14).unwrap(),
            days: 31,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn door_dates_advance_from_season_start() {
        let s = season();
        assert_eq!(door_date(&s, 1), Some(d(2025, 12, 15)));
        assert_eq!(door_date(&s, 17), Some(d(2025, 12, 31)));
        assert_eq!(door_date(&s, 18), Some(d(2026, 1, 1)));
        assert_eq!(door_date(&s, 31), Some(d(2026, 1, 14)));
    }

    #[test]
    fn invalid_days_have_no_date_and_are_closed() {
        let s = season();
        assert_eq!(door_date(&s, 0), None);
        assert_eq!(door_date(&s, 32), None);
        assert!(!is_day_open(&s, 0, d(2025, 12, 20)));
        assert!(!is_day_open(&s, 32, d(2025, 12, 20)));
    }

    #[test]
    fn doors_open_progressively() {
        let s = season();
        let today = d(2025, 12, 17);
        assert!(is_day_open(&s, 1, today));
        assert!(is_day_open(&s, 3, today));
        // Door 4 dates Dec 18 — tomorrow.
        assert!(!is_day_open(&s, 4, today));
    }

    #[test]
    fn nothing_is_open_before_the_season() {
        let s = season();
        assert!(!is_day_open(&s, 1, d(2025, 12, 14)));
        assert!(open_days(&s, d(2025, 11, 1)).is_empty());
    }

    #[test]
    fn season_end_is_inclusive_and_end_plus_one_is_closed() {
        let s = season();
        assert!(is_day_open(&s, 1, d(2026, 1, 14)));
        assert!(is_day_open(&s, 31, d(2026, 1, 14)));
        assert!(!is_day_open(&s, 1, d(2026, 1, 15)));
        assert!(!is_day_open(&s, 31, d(2026, 1, 15)));
    }

    #[test]
    fn short_end_date_truncates_late_doors() {
        // End date cuts the season before start + days would.
        let s = SeasonConfig {
            start: d(2025, 12, 1),
            end: d(2025, 12, 20),
            days: 24,
        };
        // Door 24 dates Dec 24, after the end — never open.
        for offset in 0..40 {
            let today = d(2025, 12, 1) + Duration::days(offset);
            assert!(!is_day_open(&s, 24, today));
        }
        // Door 20 dates Dec 20 — open exactly on the final day.
        assert!(is_day_open(&s, 20, d(2025, 12, 20)));
        assert!(!is_day_open(&s, 20, d(2025, 12, 21)));
    }

    #[test]
    fn open_days_on_a_mid_season_date() {
        let s = season();
        let open = open_days(&s, d(2025, 12, 20));
        assert_eq!(open, (1..=6).collect());
    }

    #[test]
    fn labels_span_the_year_boundary() {
        let s = season();
        let days = calendar_days(&s);
        assert_eq!(days.len(), 31);
        assert_eq!(days[0].label, "December 15");
        assert_eq!(days[17].label, "January 1");
        assert_eq!(days[30].label, "January 14");
    }
}
