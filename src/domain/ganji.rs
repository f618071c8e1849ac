//! Canonical stem/branch table.
//!
//! Every glyph, phase and polarity tag used anywhere in the crate comes from
//! here. Tokens are accepted in hanja (`甲`), hangul (`갑`) or romanized
//! (`gap`) form; output uses [`Stem::hanja`] / [`Stem::hangul`].

use crate::utils::error::{Result, SajuError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Wood,
    Fire,
    Earth,
    Metal,
    Water,
}

impl Element {
    pub const ALL: [Element; 5] = [
        Element::Wood,
        Element::Fire,
        Element::Earth,
        Element::Metal,
        Element::Water,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Generation cycle: wood → fire → earth → metal → water → wood.
    pub fn generates(self) -> Element {
        Element::ALL[(self.index() + 1) % 5]
    }

    /// Destruction cycle: wood → earth → water → fire → metal → wood.
    pub fn controls(self) -> Element {
        Element::ALL[(self.index() + 2) % 5]
    }

    pub fn hanja(self) -> &'static str {
        ["木", "火", "土", "金", "水"][self.index()]
    }

    pub fn hangul(self) -> &'static str {
        ["목", "화", "토", "금", "수"][self.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Yang,
    Yin,
}

impl Polarity {
    fn from_index(index: usize) -> Self {
        if index % 2 == 0 {
            Polarity::Yang
        } else {
            Polarity::Yin
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stem {
    Gap,
    Eul,
    Byeong,
    Jeong,
    Mu,
    Gi,
    Gyeong,
    Sin,
    Im,
    Gye,
}

const STEM_HANJA: [&str; 10] = ["甲", "乙", "丙", "丁", "戊", "己", "庚", "辛", "壬", "癸"];
const STEM_HANGUL: [&str; 10] = ["갑", "을", "병", "정", "무", "기", "경", "신", "임", "계"];
const STEM_ROMAN: [&str; 10] = [
    "gap", "eul", "byeong", "jeong", "mu", "gi", "gyeong", "sin", "im", "gye",
];

impl Stem {
    pub const ALL: [Stem; 10] = [
        Stem::Gap,
        Stem::Eul,
        Stem::Byeong,
        Stem::Jeong,
        Stem::Mu,
        Stem::Gi,
        Stem::Gyeong,
        Stem::Sin,
        Stem::Im,
        Stem::Gye,
    ];

    pub fn from_index(index: usize) -> Stem {
        Stem::ALL[index % 10]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn offset(self, steps: i64) -> Stem {
        Stem::from_index((self.index() as i64 + steps).rem_euclid(10) as usize)
    }

    pub fn element(self) -> Element {
        Element::ALL[self.index() / 2]
    }

    pub fn polarity(self) -> Polarity {
        Polarity::from_index(self.index())
    }

    pub fn is_yang(self) -> bool {
        self.polarity() == Polarity::Yang
    }

    pub fn hanja(self) -> &'static str {
        STEM_HANJA[self.index()]
    }

    pub fn hangul(self) -> &'static str {
        STEM_HANGUL[self.index()]
    }

    pub fn from_token(token: &str) -> Result<Stem> {
        let token = token.trim();
        lookup(token, &STEM_HANJA, &STEM_HANGUL, &STEM_ROMAN)
            .map(Stem::from_index)
            .ok_or_else(|| SajuError::InvalidToken {
                kind: "stem",
                token: token.to_string(),
            })
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hanja())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Branch {
    Ja,
    Chuk,
    In,
    Myo,
    Jin,
    Sa,
    O,
    Mi,
    Sin,
    Yu,
    Sul,
    Hae,
}

const BRANCH_HANJA: [&str; 12] = [
    "子", "丑", "寅", "卯", "辰", "巳", "午", "未", "申", "酉", "戌", "亥",
];
const BRANCH_HANGUL: [&str; 12] = [
    "자", "축", "인", "묘", "진", "사", "오", "미", "신", "유", "술", "해",
];
const BRANCH_ROMAN: [&str; 12] = [
    "ja", "chuk", "in", "myo", "jin", "sa", "o", "mi", "sin", "yu", "sul", "hae",
];
const BRANCH_ELEMENT: [Element; 12] = [
    Element::Water,
    Element::Earth,
    Element::Wood,
    Element::Wood,
    Element::Earth,
    Element::Fire,
    Element::Fire,
    Element::Earth,
    Element::Metal,
    Element::Metal,
    Element::Earth,
    Element::Water,
];

impl Branch {
    pub const ALL: [Branch; 12] = [
        Branch::Ja,
        Branch::Chuk,
        Branch::In,
        Branch::Myo,
        Branch::Jin,
        Branch::Sa,
        Branch::O,
        Branch::Mi,
        Branch::Sin,
        Branch::Yu,
        Branch::Sul,
        Branch::Hae,
    ];

    pub fn from_index(index: usize) -> Branch {
        Branch::ALL[index % 12]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn offset(self, steps: i64) -> Branch {
        Branch::from_index((self.index() as i64 + steps).rem_euclid(12) as usize)
    }

    pub fn element(self) -> Element {
        BRANCH_ELEMENT[self.index()]
    }

    pub fn polarity(self) -> Polarity {
        Polarity::from_index(self.index())
    }

    pub fn hanja(self) -> &'static str {
        BRANCH_HANJA[self.index()]
    }

    pub fn hangul(self) -> &'static str {
        BRANCH_HANGUL[self.index()]
    }

    /// Accepts a bare branch or a two-hour period name such as `子時` / `자시`.
    pub fn from_token(token: &str) -> Result<Branch> {
        let trimmed = token.trim();
        let bare = trimmed
            .strip_suffix('時')
            .or_else(|| trimmed.strip_suffix('시'))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(trimmed);
        lookup(bare, &BRANCH_HANJA, &BRANCH_HANGUL, &BRANCH_ROMAN)
            .map(Branch::from_index)
            .ok_or_else(|| SajuError::InvalidToken {
                kind: "branch",
                token: trimmed.to_string(),
            })
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hanja())
    }
}

fn lookup(token: &str, hanja: &[&str], hangul: &[&str], roman: &[&str]) -> Option<usize> {
    hanja
        .iter()
        .position(|g| *g == token)
        .or_else(|| hangul.iter().position(|g| *g == token))
        .or_else(|| {
            let lower = token.to_ascii_lowercase();
            roman.iter().position(|g| *g == lower)
        })
}

/// One sexagenary position. Only stem/branch pairs of equal parity exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PillarRepr", into = "PillarRepr")]
pub struct Pillar {
    stem: Stem,
    branch: Branch,
}

impl Pillar {
    pub fn new(stem: Stem, branch: Branch) -> Result<Pillar> {
        if stem.index() % 2 != branch.index() % 2 {
            return Err(SajuError::InvalidPillar {
                stem: stem.index(),
                branch: branch.index(),
            });
        }
        Ok(Pillar { stem, branch })
    }

    pub fn from_cycle_index(index: i64) -> Pillar {
        let i = index.rem_euclid(60) as usize;
        Pillar {
            stem: Stem::from_index(i % 10),
            branch: Branch::from_index(i % 12),
        }
    }

    /// Parses a two-glyph token such as `甲子` or `갑자`.
    pub fn from_token(token: &str) -> Result<Pillar> {
        let mut chars = token.trim().chars();
        let (Some(s), Some(b), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(SajuError::InvalidToken {
                kind: "pillar",
                token: token.to_string(),
            });
        };
        Pillar::new(
            Stem::from_token(&s.to_string())?,
            Branch::from_token(&b.to_string())?,
        )
    }

    pub fn stem(self) -> Stem {
        self.stem
    }

    pub fn branch(self) -> Branch {
        self.branch
    }

    /// Position 0..60 in the cycle, 甲子 = 0.
    pub fn cycle_index(self) -> usize {
        (6 * self.stem.index() + 60 - 5 * self.branch.index()) % 60
    }

    pub fn offset(self, steps: i64) -> Pillar {
        Pillar::from_cycle_index(self.cycle_index() as i64 + steps)
    }

    pub fn next(self) -> Pillar {
        self.offset(1)
    }

    pub fn prev(self) -> Pillar {
        self.offset(-1)
    }

    pub fn hanja(self) -> String {
        format!("{}{}", self.stem.hanja(), self.branch.hanja())
    }

    pub fn hangul(self) -> String {
        format!("{}{}", self.stem.hangul(), self.branch.hangul())
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.stem, self.branch)
    }
}

#[derive(Serialize, Deserialize)]
struct PillarRepr {
    stem: Stem,
    branch: Branch,
}

impl TryFrom<PillarRepr> for Pillar {
    type Error = SajuError;

    fn try_from(repr: PillarRepr) -> Result<Pillar> {
        Pillar::new(repr.stem, repr.branch)
    }
}

impl From<Pillar> for PillarRepr {
    fn from(p: Pillar) -> Self {
        PillarRepr {
            stem: p.stem,
            branch: p.branch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_index_round_trips_all_sixty() {
        for i in 0..60 {
            let p = Pillar::from_cycle_index(i);
            assert_eq!(p.cycle_index() as i64, i);
            assert_eq!(p.stem().index() % 2, p.branch().index() % 2);
        }
    }

    #[test]
    fn test_only_sixty_of_one_twenty_pairs_are_valid() {
        let valid = Stem::ALL
            .iter()
            .flat_map(|s| Branch::ALL.iter().map(move |b| Pillar::new(*s, *b)))
            .filter(|p| p.is_ok())
            .count();
        assert_eq!(valid, 60);
    }

    #[test]
    fn test_tokens_in_every_script() {
        assert_eq!(Stem::from_token("甲").unwrap(), Stem::Gap);
        assert_eq!(Stem::from_token("계").unwrap(), Stem::Gye);
        assert_eq!(Stem::from_token("Gyeong").unwrap(), Stem::Gyeong);
        assert_eq!(Branch::from_token("亥").unwrap(), Branch::Hae);
        assert_eq!(Branch::from_token("오").unwrap(), Branch::O);
        assert_eq!(Branch::from_token("子時").unwrap(), Branch::Ja);
        assert_eq!(Branch::from_token("축시").unwrap(), Branch::Chuk);
        assert!(Stem::from_token("X").is_err());
        assert!(Branch::from_token("").is_err());
    }

    #[test]
    fn test_pillar_tokens() {
        assert_eq!(Pillar::from_token("甲子").unwrap(), Pillar::from_cycle_index(0));
        assert_eq!(Pillar::from_token("계해").unwrap(), Pillar::from_cycle_index(59));
        assert!(Pillar::from_token("甲丑").is_err());
        assert!(Pillar::from_token("甲").is_err());
    }

    #[test]
    fn test_wrap_around_next_prev() {
        let last = Pillar::from_cycle_index(59);
        assert_eq!(last.next().cycle_index(), 0);
        assert_eq!(Pillar::from_cycle_index(0).prev(), last);
    }

    #[test]
    fn test_elements_and_polarity() {
        assert_eq!(Stem::Byeong.element(), Element::Fire);
        assert!(Stem::Byeong.is_yang());
        assert!(!Stem::Gye.is_yang());
        assert_eq!(Branch::Chuk.element(), Element::Earth);
        assert_eq!(Element::Wood.generates(), Element::Fire);
        assert_eq!(Element::Wood.controls(), Element::Earth);
        assert_eq!(Element::Metal.controls(), Element::Wood);
    }

    #[test]
    fn test_invalid_pillar_rejected_on_deserialize() {
        let bad = r#"{"stem":"Gap","branch":"Chuk"}"#;
        assert!(serde_json::from_str::<Pillar>(bad).is_err());
        let good = r#"{"stem":"Gap","branch":"Ja"}"#;
        assert_eq!(
            serde_json::from_str::<Pillar>(good).unwrap(),
            Pillar::from_cycle_index(0)
        );
    }
}
