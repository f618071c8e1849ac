//! Annual (세운) and monthly (월운) fortune windows.
//!
//! Both are lazy, finite and restartable: cloning a window or calling
//! `restart` replays it from the first entry without recomputing anything
//! up front.

use crate::core::pillars::{month_pillar, year_pillar};
use crate::domain::model::{SaeunEntry, WolunEntry};
use crate::utils::error::{Result, SajuError};

#[derive(Debug, Clone)]
pub struct SaeunWindow {
    birth_year: i32,
    first_year: i32,
    len: usize,
    pos: usize,
}

/// `offset` is relative to the birth year and may be negative; ages are
/// counted the Korean way (birth year = 1).
pub fn saeun(birth_year: i32, offset: i32, len: usize) -> SaeunWindow {
    SaeunWindow {
        birth_year,
        first_year: birth_year + offset,
        len,
        pos: 0,
    }
}

impl SaeunWindow {
    pub fn restart(&mut self) {
        self.pos = 0;
    }

    /// Same window shifted by `years`.
    pub fn shifted(&self, years: i32) -> SaeunWindow {
        SaeunWindow {
            first_year: self.first_year + years,
            pos: 0,
            ..*self
        }
    }

    fn entry(&self, i: usize) -> SaeunEntry {
        let year = self.first_year + i as i32;
        SaeunEntry {
            age: year - self.birth_year + 1,
            year,
            pillar: year_pillar(year),
        }
    }
}

impl Iterator for SaeunWindow {
    type Item = SaeunEntry;

    fn next(&mut self) -> Option<SaeunEntry> {
        if self.pos >= self.len {
            return None;
        }
        let entry = self.entry(self.pos);
        self.pos += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len - self.pos;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SaeunWindow {}

#[derive(Debug, Clone)]
pub struct WolunWindow {
    year: i32,
    len: usize,
    pos: usize,
}

/// 12 months of a sexagenary year from 寅, or 13 to include the following
/// year's 寅 month.
pub fn wolun(year: i32, len: usize) -> Result<WolunWindow> {
    if !(12..=13).contains(&len) {
        return Err(SajuError::validation("wolun length", len, "must be 12 or 13"));
    }
    Ok(WolunWindow { year, len, pos: 0 })
}

impl WolunWindow {
    pub fn restart(&mut self) {
        self.pos = 0;
    }
}

impl Iterator for WolunWindow {
    type Item = WolunEntry;

    fn next(&mut self) -> Option<WolunEntry> {
        if self.pos >= self.len {
            return None;
        }
        let ordinal = self.pos;
        self.pos += 1;
        // Month pillars run unbroken across years, so ordinal 12 is the
        // next year's 寅 month.
        let first = month_pillar(year_pillar(self.year).stem(), 0);
        Some(WolunEntry {
            month_ordinal: ordinal % 12,
            year: self.year + (ordinal / 12) as i32,
            pillar: first.offset(ordinal as i64),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len - self.pos;
        (left, Some(left))
    }
}

impl ExactSizeIterator for WolunWindow {}
