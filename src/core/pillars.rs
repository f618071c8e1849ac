//! Year/month/day/hour pillar arithmetic. Everything here is pure; locating
//! the solar-term boundaries is the resolver's job.

use crate::domain::ganji::{Branch, Pillar, Stem};
use crate::utils::error::{Result, SajuError};
use crate::utils::validation::validate_input_range;
use chrono::{Datelike, NaiveDate};

/// 1984 is 甲子.
pub const YEAR_ANCHOR: i32 = 1984;

/// `num_days_from_ce` of 2000-01-01 (戊午, cycle index 54) is 730120.
const DAY_OFFSET: i64 = 14;

/// Clock minute (after the hour shift) at which the day pillar rolls over.
const DAY_ROLLOVER_MINUTE: i32 = 23 * 60;

fn pillar_of(stem: usize, branch: usize) -> Pillar {
    debug_assert_eq!(stem % 2, branch % 2);
    Pillar::from_cycle_index((6 * stem as i64 - 5 * branch as i64).rem_euclid(60))
}

/// Pillar of a sexagenary year (the year that starts at 입춘, not on 1 January).
pub fn year_pillar(sexagenary_year: i32) -> Pillar {
    Pillar::from_cycle_index((sexagenary_year - YEAR_ANCHOR) as i64)
}

/// Stem of the 寅 month for a year stem (甲己 → 丙, 乙庚 → 戊, 丙辛 → 庚, 丁壬 → 壬, 戊癸 → 甲).
pub fn month_stem_start(year_stem: Stem) -> Stem {
    Stem::from_index((year_stem.index() % 5 * 2 + 2) % 10)
}

/// `ordinal` counts solar months from 寅 (0) to 丑 (11); larger values wrap.
pub fn month_pillar(year_stem: Stem, ordinal: usize) -> Pillar {
    let stem = (month_stem_start(year_stem).index() + ordinal) % 10;
    let branch = (Branch::In.index() + ordinal) % 12;
    pillar_of(stem, branch)
}

pub fn day_pillar(date: NaiveDate) -> Pillar {
    Pillar::from_cycle_index(date.num_days_from_ce() as i64 + DAY_OFFSET)
}

fn shifted_minutes(hour: u32, minute: u32, shift_minutes: i32) -> i32 {
    (hour as i32 * 60 + minute as i32 - shift_minutes).rem_euclid(24 * 60)
}

/// Two-hour bucket of a wall-clock time. 子 covers 23:00–00:59; a positive
/// `shift_minutes` moves every boundary later (30 gives 23:30, 01:30, …).
pub fn hour_branch_for_clock(hour: u32, minute: u32, shift_minutes: i32) -> Branch {
    let minutes = shifted_minutes(hour, minute, shift_minutes);
    Branch::from_index((((minutes + 60) / 120) % 12) as usize)
}

/// Late 子 hour: the day pillar belongs to the following calendar day. The
/// whole stretch from the start of 子 up to midnight rolls over; a 子 that only
/// starts after midnight (shift of an hour or more) never does.
pub fn rolls_over_to_next_day(hour: u32, minute: u32, shift_minutes: i32) -> bool {
    let raw = hour as i32 * 60 + minute as i32;
    raw >= DAY_ROLLOVER_MINUTE + shift_minutes
}

/// Stem of the 子 hour for a day stem (甲己 → 甲, 乙庚 → 丙, 丙辛 → 戊, 丁壬 → 庚, 戊癸 → 壬).
pub fn hour_stem_start(day_stem: Stem) -> Stem {
    Stem::from_index(day_stem.index() % 5 * 2)
}

pub fn hour_pillar(day_stem: Stem, branch: Branch) -> Pillar {
    let stem = (hour_stem_start(day_stem).index() + branch.index()) % 10;
    pillar_of(stem, branch.index())
}

/// The 12 month pillars of a year, 寅 first.
pub fn month_pillars_for_year_stem(year_stem: Stem) -> Vec<Pillar> {
    (0..12).map(|ordinal| month_pillar(year_stem, ordinal)).collect()
}

/// The 12 hour pillars of a day, 子 first.
pub fn hour_pillars_for_day_stem(day_stem: Stem) -> Vec<Pillar> {
    Branch::ALL
        .iter()
        .map(|b| hour_pillar(day_stem, *b))
        .collect()
}

/// Rejects out-of-range Gregorian fields without clamping.
pub fn validate_solar_date(year: i32, month: u32, day: u32, min_year: i32, max_year: i32) -> Result<NaiveDate> {
    if year < min_year || year > max_year {
        return Err(SajuError::UnsupportedYear {
            year,
            min: min_year,
            max: max_year,
        });
    }
    validate_input_range("month", month, 1, 12)?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        SajuError::validation("day", day, format!("{}-{:02} has no day {}", year, month, day))
    })
}

/// Lunar months have 29 or 30 days; the table lookup decides which.
pub fn validate_lunar_fields(year: i32, month: u32, day: u32, min_year: i32, max_year: i32) -> Result<()> {
    if year < min_year || year > max_year {
        return Err(SajuError::UnsupportedYear {
            year,
            min: min_year,
            max: max_year,
        });
    }
    validate_input_range("month", month, 1, 12)?;
    validate_input_range("day", day, 1, 30)
}

pub fn validate_clock(hour: u32, minute: u32) -> Result<()> {
    validate_input_range("hour", hour, 0, 23)?;
    validate_input_range("minute", minute, 0, 59)
}
