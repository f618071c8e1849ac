//! Stateless derived attributes of a chart. Each function is a closed
//! lookup or a small modular offset.

use crate::core::shinsal::{self, StarHit};
use crate::domain::ganji::{Branch, Pillar, Stem};
use crate::domain::model::FourPillars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TenGod {
    Companion,
    RobWealth,
    EatingGod,
    HurtingOfficer,
    IndirectWealth,
    DirectWealth,
    SevenKillings,
    DirectOfficer,
    IndirectResource,
    DirectResource,
}

impl TenGod {
    pub fn hanja(self) -> &'static str {
        ["比肩", "劫財", "食神", "傷官", "偏財", "正財", "偏官", "正官", "偏印", "正印"][self as usize]
    }

    pub fn hangul(self) -> &'static str {
        ["비견", "겁재", "식신", "상관", "편재", "정재", "편관", "정관", "편인", "정인"][self as usize]
    }
}

/// Relation of `other` to the day master.
pub fn ten_god(day_stem: Stem, other: Stem) -> TenGod {
    let me = day_stem.element();
    let them = other.element();
    let same_polarity = day_stem.polarity() == other.polarity();
    let pair = if me == them {
        (TenGod::Companion, TenGod::RobWealth)
    } else if me.generates() == them {
        (TenGod::EatingGod, TenGod::HurtingOfficer)
    } else if me.controls() == them {
        (TenGod::IndirectWealth, TenGod::DirectWealth)
    } else if them.controls() == me {
        (TenGod::SevenKillings, TenGod::DirectOfficer)
    } else {
        (TenGod::IndirectResource, TenGod::DirectResource)
    };
    if same_polarity {
        pair.0
    } else {
        pair.1
    }
}

/// Branches are read through their main hidden stem.
pub fn ten_god_of_branch(day_stem: Stem, branch: Branch) -> TenGod {
    ten_god(day_stem, main_hidden_stem(branch))
}

use Stem::{Byeong, Eul, Gap, Gi, Gye, Gyeong, Im, Jeong, Mu, Sin};

/// 지장간, residual first and main qi last.
const HIDDEN_STEMS: [&[Stem]; 12] = [
    &[Im, Gye],
    &[Gye, Sin, Gi],
    &[Mu, Byeong, Gap],
    &[Gap, Eul],
    &[Eul, Gye, Mu],
    &[Mu, Gyeong, Byeong],
    &[Byeong, Gi, Jeong],
    &[Jeong, Eul, Gi],
    &[Mu, Im, Gyeong],
    &[Gyeong, Sin],
    &[Sin, Jeong, Mu],
    &[Mu, Gap, Im],
];

pub fn hidden_stems(branch: Branch) -> &'static [Stem] {
    HIDDEN_STEMS[branch.index()]
}

pub fn main_hidden_stem(branch: Branch) -> Stem {
    let stems = hidden_stems(branch);
    stems[stems.len() - 1]
}

/// 공망 of a day pillar: the two branches its ten-day group (旬) skips, so
/// 甲子旬 gives 戌亥. Some almanac tables instead list the group's own first
/// two branches (甲子旬 → 子丑); this follows the skipped-branch rule.
pub fn void_pair(day: Pillar) -> (Branch, Branch) {
    let group_start = day.cycle_index() - day.cycle_index() % 10;
    let first_branch = Branch::from_index(group_start % 12);
    (first_branch.offset(10), first_branch.offset(11))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TwelveStage {
    Birth,
    Bath,
    Capping,
    Officer,
    Peak,
    Decline,
    Sickness,
    Death,
    Tomb,
    Extinction,
    Conception,
    Nurture,
}

impl TwelveStage {
    const ALL: [TwelveStage; 12] = [
        TwelveStage::Birth,
        TwelveStage::Bath,
        TwelveStage::Capping,
        TwelveStage::Officer,
        TwelveStage::Peak,
        TwelveStage::Decline,
        TwelveStage::Sickness,
        TwelveStage::Death,
        TwelveStage::Tomb,
        TwelveStage::Extinction,
        TwelveStage::Conception,
        TwelveStage::Nurture,
    ];

    pub fn hanja(self) -> &'static str {
        ["長生", "沐浴", "冠帶", "臨官", "帝旺", "衰", "病", "死", "墓", "絶", "胎", "養"][self as usize]
    }

    pub fn hangul(self) -> &'static str {
        ["장생", "목욕", "관대", "건록", "제왕", "쇠", "병", "사", "묘", "절", "태", "양"][self as usize]
    }
}

/// Branch where each stem's 長生 falls.
const BIRTH_BRANCH: [Branch; 10] = [
    Branch::Hae,
    Branch::O,
    Branch::In,
    Branch::Yu,
    Branch::In,
    Branch::Yu,
    Branch::Sa,
    Branch::Ja,
    Branch::Sin,
    Branch::Myo,
];

/// 12운성: yang stems advance through the branches, yin stems retreat.
pub fn twelve_stage(stem: Stem, branch: Branch) -> TwelveStage {
    let start = BIRTH_BRANCH[stem.index()].index() as i64;
    let b = branch.index() as i64;
    let steps = if stem.is_yang() { b - start } else { start - b };
    TwelveStage::ALL[steps.rem_euclid(12) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TwelveSpirit {
    Robbery,
    Disaster,
    Heaven,
    Earth,
    Year,
    Month,
    Ruin,
    General,
    Saddle,
    Horse,
    Harm,
    Canopy,
}

impl TwelveSpirit {
    const ALL: [TwelveSpirit; 12] = [
        TwelveSpirit::Robbery,
        TwelveSpirit::Disaster,
        TwelveSpirit::Heaven,
        TwelveSpirit::Earth,
        TwelveSpirit::Year,
        TwelveSpirit::Month,
        TwelveSpirit::Ruin,
        TwelveSpirit::General,
        TwelveSpirit::Saddle,
        TwelveSpirit::Horse,
        TwelveSpirit::Harm,
        TwelveSpirit::Canopy,
    ];

    pub fn hanja(self) -> &'static str {
        [
            "劫殺", "災殺", "天殺", "地殺", "年殺", "月殺", "亡身", "將星", "攀鞍", "驛馬", "六害", "華蓋",
        ][self as usize]
    }

    pub fn hangul(self) -> &'static str {
        [
            "겁살", "재살", "천살", "지살", "연살", "월살", "망신", "장성", "반안", "역마", "육해", "화개",
        ][self as usize]
    }
}

/// First member (生地) of the trine group containing `branch`.
pub fn trine_start(branch: Branch) -> Branch {
    [Branch::Sin, Branch::Sa, Branch::In, Branch::Hae][branch.index() % 4]
}

/// 12신살 of `branch` relative to the year branch's trine group; 劫殺 sits
/// three branches before the group's 生地.
pub fn twelve_spirit(year_branch: Branch, branch: Branch) -> TwelveSpirit {
    let robbery = trine_start(year_branch).offset(9);
    let steps = branch.index() as i64 - robbery.index() as i64;
    TwelveSpirit::ALL[steps.rem_euclid(12) as usize]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimbClassification {
    /// `None` for the day stem itself (the day master).
    pub stem_ten_god: Option<TenGod>,
    pub branch_ten_god: TenGod,
    pub hidden_stems: Vec<Stem>,
    pub twelve_stage: TwelveStage,
    pub twelve_spirit: TwelveSpirit,
    pub is_void: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub year: LimbClassification,
    pub month: LimbClassification,
    pub day: LimbClassification,
    /// Not computable without a birth time.
    pub hour: Option<LimbClassification>,
    pub void_pair: (Branch, Branch),
    pub stars: Vec<StarHit>,
}

pub fn classify(pillars: &FourPillars) -> Classification {
    let day_stem = pillars.day.stem();
    let void = void_pair(pillars.day);
    let limb = |p: Pillar, is_day: bool| LimbClassification {
        stem_ten_god: (!is_day).then(|| ten_god(day_stem, p.stem())),
        branch_ten_god: ten_god_of_branch(day_stem, p.branch()),
        hidden_stems: hidden_stems(p.branch()).to_vec(),
        twelve_stage: twelve_stage(day_stem, p.branch()),
        twelve_spirit: twelve_spirit(pillars.year.branch(), p.branch()),
        is_void: p.branch() == void.0 || p.branch() == void.1,
    };

    Classification {
        year: limb(pillars.year, false),
        month: limb(pillars.month, false),
        day: limb(pillars.day, true),
        hour: pillars.hour.map(|h| limb(h, false)),
        void_pair: void,
        stars: shinsal::stars(pillars),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_gods_of_gap_day() {
        assert_eq!(ten_god(Gap, Gap), TenGod::Companion);
        assert_eq!(ten_god(Gap, Eul), TenGod::RobWealth);
        assert_eq!(ten_god(Gap, Byeong), TenGod::EatingGod);
        assert_eq!(ten_god(Gap, Jeong), TenGod::HurtingOfficer);
        assert_eq!(ten_god(Gap, Mu), TenGod::IndirectWealth);
        assert_eq!(ten_god(Gap, Gi), TenGod::DirectWealth);
        assert_eq!(ten_god(Gap, Gyeong), TenGod::SevenKillings);
        assert_eq!(ten_god(Gap, Sin), TenGod::DirectOfficer);
        assert_eq!(ten_god(Gap, Im), TenGod::IndirectResource);
        assert_eq!(ten_god(Gap, Gye), TenGod::DirectResource);
    }

    #[test]
    fn test_ten_god_of_branch_uses_main_qi() {
        assert_eq!(main_hidden_stem(Branch::Ja), Gye);
        assert_eq!(ten_god_of_branch(Gap, Branch::Ja), TenGod::DirectResource);
        assert_eq!(ten_god_of_branch(Gap, Branch::In), TenGod::Companion);
        assert_eq!(hidden_stems(Branch::Chuk), &[Gye, Sin, Gi]);
    }

    #[test]
    fn test_every_hidden_stem_set_has_two_or_three() {
        for b in Branch::ALL {
            assert!((2..=3).contains(&hidden_stems(b).len()));
        }
    }

    #[test]
    fn test_void_pairs() {
        let void = |t: &str| void_pair(Pillar::from_token(t).unwrap());
        assert_eq!(void("甲子"), (Branch::Sul, Branch::Hae));
        assert_eq!(void("癸酉"), (Branch::Sul, Branch::Hae));
        assert_eq!(void("甲戌"), (Branch::Sin, Branch::Yu));
        assert_eq!(void("甲寅"), (Branch::Ja, Branch::Chuk));
        assert_eq!(void("癸亥"), (Branch::Ja, Branch::Chuk));
    }

    #[test]
    fn test_void_groups_are_uniform_and_disjoint() {
        let mut seen = std::collections::HashSet::new();
        for group in 0..6 {
            let pair = void_pair(Pillar::from_cycle_index(group * 10));
            for i in 0..10 {
                assert_eq!(void_pair(Pillar::from_cycle_index(group * 10 + i)), pair);
            }
            // The void branches never occur as a branch inside their own group.
            for i in 0..10 {
                let b = Pillar::from_cycle_index(group * 10 + i).branch();
                assert!(b != pair.0 && b != pair.1);
            }
            assert!(seen.insert(pair));
        }
    }

    #[test]
    fn test_twelve_stages() {
        assert_eq!(twelve_stage(Gap, Branch::Hae), TwelveStage::Birth);
        assert_eq!(twelve_stage(Gap, Branch::Myo), TwelveStage::Peak);
        assert_eq!(twelve_stage(Gap, Branch::In), TwelveStage::Officer);
        assert_eq!(twelve_stage(Eul, Branch::O), TwelveStage::Birth);
        assert_eq!(twelve_stage(Eul, Branch::Myo), TwelveStage::Officer);
        assert_eq!(twelve_stage(Eul, Branch::In), TwelveStage::Peak);
        assert_eq!(twelve_stage(Im, Branch::Ja), TwelveStage::Peak);
    }

    #[test]
    fn test_twelve_spirits() {
        // 申子辰 group: 劫殺 巳, 將星 子, 驛馬 寅, 華蓋 辰.
        assert_eq!(twelve_spirit(Branch::Ja, Branch::Sa), TwelveSpirit::Robbery);
        assert_eq!(twelve_spirit(Branch::Jin, Branch::Ja), TwelveSpirit::General);
        assert_eq!(twelve_spirit(Branch::Sin, Branch::In), TwelveSpirit::Horse);
        assert_eq!(twelve_spirit(Branch::Ja, Branch::Jin), TwelveSpirit::Canopy);
        // 寅午戌 group: 驛馬 申, 桃花(年殺) 卯.
        assert_eq!(twelve_spirit(Branch::O, Branch::Sin), TwelveSpirit::Horse);
        assert_eq!(twelve_spirit(Branch::O, Branch::Myo), TwelveSpirit::Year);
    }

    #[test]
    fn test_classify_without_hour() {
        let pillars = FourPillars {
            year: Pillar::from_token("甲辰").unwrap(),
            month: Pillar::from_token("丙寅").unwrap(),
            day: Pillar::from_token("甲子").unwrap(),
            hour: None,
        };
        let c = classify(&pillars);
        assert!(c.hour.is_none());
        assert_eq!(c.day.stem_ten_god, None);
        assert_eq!(c.year.stem_ten_god, Some(TenGod::Companion));
        assert_eq!(c.month.stem_ten_god, Some(TenGod::EatingGod));
        assert_eq!(c.void_pair, (Branch::Sul, Branch::Hae));
        assert!(!c.year.is_void);
    }
}
