//! The 24 solar terms (절기), in calendar order starting at 소한 (Minor Cold).
//!
//! Even positions are the 12 month-opening terms (절, jeol); odd positions are
//! the mid-month terms (중기). 입춘 opens sexagenary month ordinal 0 (寅).

use crate::utils::error::{Result, SajuError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SolarTerm {
    MinorCold,
    MajorCold,
    StartOfSpring,
    RainWater,
    AwakeningOfInsects,
    SpringEquinox,
    ClearAndBright,
    GrainRain,
    StartOfSummer,
    GrainBuds,
    GrainInEar,
    SummerSolstice,
    MinorHeat,
    MajorHeat,
    StartOfAutumn,
    EndOfHeat,
    WhiteDew,
    AutumnEquinox,
    ColdDew,
    FrostDescent,
    StartOfWinter,
    MinorSnow,
    MajorSnow,
    WinterSolstice,
}

const HANGUL: [&str; 24] = [
    "소한", "대한", "입춘", "우수", "경칩", "춘분", "청명", "곡우", "입하", "소만", "망종", "하지",
    "소서", "대서", "입추", "처서", "백로", "추분", "한로", "상강", "입동", "소설", "대설", "동지",
];

const HANJA: [&str; 24] = [
    "小寒", "大寒", "立春", "雨水", "驚蟄", "春分", "淸明", "穀雨", "立夏", "小滿", "芒種", "夏至",
    "小暑", "大暑", "立秋", "處暑", "白露", "秋分", "寒露", "霜降", "立冬", "小雪", "大雪", "冬至",
];

impl SolarTerm {
    pub const ALL: [SolarTerm; 24] = [
        SolarTerm::MinorCold,
        SolarTerm::MajorCold,
        SolarTerm::StartOfSpring,
        SolarTerm::RainWater,
        SolarTerm::AwakeningOfInsects,
        SolarTerm::SpringEquinox,
        SolarTerm::ClearAndBright,
        SolarTerm::GrainRain,
        SolarTerm::StartOfSummer,
        SolarTerm::GrainBuds,
        SolarTerm::GrainInEar,
        SolarTerm::SummerSolstice,
        SolarTerm::MinorHeat,
        SolarTerm::MajorHeat,
        SolarTerm::StartOfAutumn,
        SolarTerm::EndOfHeat,
        SolarTerm::WhiteDew,
        SolarTerm::AutumnEquinox,
        SolarTerm::ColdDew,
        SolarTerm::FrostDescent,
        SolarTerm::StartOfWinter,
        SolarTerm::MinorSnow,
        SolarTerm::MajorSnow,
        SolarTerm::WinterSolstice,
    ];

    pub fn from_index(index: usize) -> SolarTerm {
        SolarTerm::ALL[index % 24]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Month-opening term (절입).
    pub fn is_month_opening(self) -> bool {
        self.index() % 2 == 0
    }

    /// Sexagenary month ordinal opened by this term (입춘 = 0 … 소한 = 11).
    /// `None` for mid-month terms.
    pub fn month_ordinal(self) -> Option<usize> {
        self.is_month_opening()
            .then(|| (self.index() / 2 + 11) % 12)
    }

    pub fn hangul(self) -> &'static str {
        HANGUL[self.index()]
    }

    pub fn hanja(self) -> &'static str {
        HANJA[self.index()]
    }

    /// Accepts the Korean name (as returned by the 24-term API) or hanja.
    pub fn from_name(name: &str) -> Result<SolarTerm> {
        let name = name.trim();
        HANGUL
            .iter()
            .position(|n| *n == name)
            .or_else(|| HANJA.iter().position(|n| *n == name))
            .or_else(|| (name == "清明").then_some(6))
            .map(SolarTerm::from_index)
            .ok_or_else(|| SajuError::InvalidToken {
                kind: "solar term",
                token: name.to_string(),
            })
    }
}

impl fmt::Display for SolarTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hangul())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_opening_ordinals() {
        assert_eq!(SolarTerm::StartOfSpring.month_ordinal(), Some(0));
        assert_eq!(SolarTerm::AwakeningOfInsects.month_ordinal(), Some(1));
        assert_eq!(SolarTerm::MajorSnow.month_ordinal(), Some(10));
        assert_eq!(SolarTerm::MinorCold.month_ordinal(), Some(11));
        assert_eq!(SolarTerm::RainWater.month_ordinal(), None);

        let openings = SolarTerm::ALL.iter().filter(|t| t.is_month_opening()).count();
        assert_eq!(openings, 12);
    }

    #[test]
    fn test_names() {
        assert_eq!(SolarTerm::from_name("입춘").unwrap(), SolarTerm::StartOfSpring);
        assert_eq!(SolarTerm::from_name("冬至").unwrap(), SolarTerm::WinterSolstice);
        assert_eq!(SolarTerm::from_name("清明").unwrap(), SolarTerm::ClearAndBright);
        assert!(SolarTerm::from_name("춘절").is_err());
    }
}
