//! Auxiliary spirit stars (신살). Each star is looked up from the day stem,
//! the month branch, the year branch or a fixed list of pillars, then tested
//! against every limb that is present. Without a birth time the hour limb is
//! never tested. A few stars only count in one limb: 離別, 祿空亡 and 孤鸞
//! on the day, 聾兒 on the hour, 太極 on the year.

use crate::domain::ganji::{Branch, Pillar, Stem};
use crate::domain::model::FourPillars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Limb {
    Year,
    Month,
    Day,
    Hour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Star {
    HeavenlyNoble,
    LiteraryNoble,
    HeavenlyVirtue,
    MonthlyVirtue,
    Kuigang,
    WhiteTiger,
    YangBlade,
    RedSensuality,
    Prosperity,
    HiddenProsperity,
    GoldenCarriage,
    Academy,
    LonelyPhoenix,
    PeachBlossom,
    FallingWell,
    OwlSpirit,
    WaterPeril,
    Parting,
    DeafMute,
    ProsperityVoid,
    CauldronSplit,
    LiteraryCurve,
    HeavenlyKitchen,
    OfficialAcademy,
    TaijiNoble,
}

impl Star {
    pub fn hanja(self) -> &'static str {
        match self {
            Star::HeavenlyNoble => "天乙貴人",
            Star::LiteraryNoble => "文昌貴人",
            Star::HeavenlyVirtue => "天德貴人",
            Star::MonthlyVirtue => "月德貴人",
            Star::Kuigang => "魁罡",
            Star::WhiteTiger => "白虎",
            Star::YangBlade => "羊刃",
            Star::RedSensuality => "紅艶",
            Star::Prosperity => "正祿",
            Star::HiddenProsperity => "暗祿",
            Star::GoldenCarriage => "金輿",
            Star::Academy => "學堂貴人",
            Star::LonelyPhoenix => "孤鸞",
            Star::PeachBlossom => "桃花",
            Star::FallingWell => "落井關殺",
            Star::OwlSpirit => "梟神殺",
            Star::WaterPeril => "水厄殺",
            Star::Parting => "離別殺",
            Star::DeafMute => "聾兒殺",
            Star::ProsperityVoid => "祿空亡",
            Star::CauldronSplit => "釜劈殺",
            Star::LiteraryCurve => "文曲貴人",
            Star::HeavenlyKitchen => "天廚貴人",
            Star::OfficialAcademy => "官貴學館",
            Star::TaijiNoble => "太極貴人",
        }
    }

    pub fn hangul(self) -> &'static str {
        match self {
            Star::HeavenlyNoble => "천을귀인",
            Star::LiteraryNoble => "문창귀인",
            Star::HeavenlyVirtue => "천덕귀인",
            Star::MonthlyVirtue => "월덕귀인",
            Star::Kuigang => "괴강",
            Star::WhiteTiger => "백호",
            Star::YangBlade => "양인",
            Star::RedSensuality => "홍염",
            Star::Prosperity => "정록",
            Star::HiddenProsperity => "암록",
            Star::GoldenCarriage => "금여",
            Star::Academy => "학당귀인",
            Star::LonelyPhoenix => "고란",
            Star::PeachBlossom => "도화",
            Star::FallingWell => "낙정관살",
            Star::OwlSpirit => "효신살",
            Star::WaterPeril => "수액살",
            Star::Parting => "이별살",
            Star::DeafMute => "농아살",
            Star::ProsperityVoid => "록공망",
            Star::CauldronSplit => "부벽살",
            Star::LiteraryCurve => "문곡귀인",
            Star::HeavenlyKitchen => "천주귀인",
            Star::OfficialAcademy => "관귀학관",
            Star::TaijiNoble => "태극귀인",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StarHit {
    pub star: Star,
    pub limb: Limb,
}

use Branch::{Chuk, Hae, In, Ja, Jin, Mi, Myo, Sa, Sul, Yu, O};

/// Day stem → branches (天乙貴人).
fn heavenly_noble(day: Stem) -> &'static [Branch] {
    match day {
        Stem::Gap | Stem::Mu | Stem::Gyeong => &[Chuk, Mi],
        Stem::Eul | Stem::Gi => &[Ja, Branch::Sin],
        Stem::Byeong | Stem::Jeong => &[Hae, Yu],
        Stem::Sin => &[O, In],
        Stem::Im | Stem::Gye => &[Sa, Myo],
    }
}

/// Day stem → branch, indexed by stem.
const LITERARY_NOBLE: [Branch; 10] = [Sa, O, Branch::Sin, Yu, Branch::Sin, Yu, Hae, Ja, In, Myo];
const PROSPERITY: [Branch; 10] = [In, Myo, Sa, O, Sa, O, Branch::Sin, Yu, Hae, Ja];
const HIDDEN_PROSPERITY: [Branch; 10] = [Hae, Sul, Branch::Sin, O, Branch::Sin, O, Sa, Jin, In, Chuk];
const GOLDEN_CARRIAGE: [Branch; 10] = [Jin, Sa, Mi, Branch::Sin, Mi, Branch::Sin, Sul, Hae, Chuk, In];
const ACADEMY: [Branch; 10] = [Hae, O, In, Yu, In, Yu, Sa, Ja, Branch::Sin, Myo];
const FALLING_WELL: [Branch; 10] = [Sa, Ja, Branch::Sin, Sul, Myo, Sa, Ja, Branch::Sin, Sul, Myo];
const LITERARY_CURVE: [Branch; 10] = [Hae, Ja, In, Myo, In, Myo, Sa, O, Branch::Sin, Yu];
const HEAVENLY_KITCHEN: [Branch; 10] = [Sa, O, Sa, O, Branch::Sin, Yu, Hae, Ja, In, Myo];
const OFFICIAL_ACADEMY: [Branch; 10] = [Sa, Sa, Branch::Sin, Branch::Sin, Hae, Hae, In, In, In, In];

/// Day stem → year branches (太極貴人); only the year limb is tested.
fn taiji_noble(day: Stem) -> &'static [Branch] {
    match day {
        Stem::Gap | Stem::Eul => &[Ja, O],
        Stem::Byeong | Stem::Jeong => &[Yu, In],
        Stem::Mu | Stem::Gi => &[Jin, Sul, Chuk, Mi],
        _ => &[In, Myo],
    }
}

fn yang_blade(day: Stem) -> &'static [Branch] {
    match day {
        Stem::Gap => &[Myo],
        Stem::Byeong | Stem::Mu => &[O],
        Stem::Gyeong => &[Yu],
        Stem::Im => &[Ja],
        _ => &[],
    }
}

fn red_sensuality(day: Stem) -> &'static [Branch] {
    match day {
        Stem::Gap | Stem::Byeong => &[O],
        Stem::Jeong => &[Mi],
        Stem::Mu => &[Jin],
        Stem::Gyeong => &[Branch::Sin, Sul],
        Stem::Sin => &[Yu],
        Stem::Im => &[Ja],
        _ => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Glyph {
    Stem(Stem),
    Branch(Branch),
}

/// Month branch → stem or branch (天德貴人).
fn heavenly_virtue(month: Branch) -> Glyph {
    match month {
        Ja => Glyph::Branch(Sa),
        Chuk => Glyph::Stem(Stem::Gyeong),
        In => Glyph::Stem(Stem::Jeong),
        Myo => Glyph::Branch(Branch::Sin),
        Jin => Glyph::Stem(Stem::Im),
        Sa => Glyph::Stem(Stem::Sin),
        O => Glyph::Branch(Hae),
        Mi => Glyph::Stem(Stem::Gap),
        Branch::Sin => Glyph::Stem(Stem::Gye),
        Yu => Glyph::Branch(In),
        Sul => Glyph::Stem(Stem::Byeong),
        Hae => Glyph::Stem(Stem::Eul),
    }
}

/// Month branch trine → stem (月德貴人): 申子辰 壬, 巳酉丑 庚, 寅午戌 丙, 亥卯未 甲.
fn monthly_virtue(month: Branch) -> Stem {
    [Stem::Im, Stem::Gyeong, Stem::Byeong, Stem::Gap][month.index() % 4]
}

/// Year branch trine → branch (桃花): 寅午戌 卯, 巳酉丑 午, 申子辰 酉, 亥卯未 子.
/// The same branch in the hour limb is 聾兒殺.
fn peach_blossom(year: Branch) -> Branch {
    [Yu, O, Myo, Ja][year.index() % 4]
}

/// Month season → branch (水厄殺): 寅卯辰 寅, 巳午未 辰, 申酉戌 酉, 亥子丑 丑.
fn water_peril(month: Branch) -> Branch {
    [In, Jin, Yu, Chuk][(month.index() + 10) % 12 / 3]
}

/// Month branch group → branch (釜劈殺): 子午卯酉 亥, 辰戌丑未 丑, 寅申巳亥 酉.
fn cauldron_split(month: Branch) -> Branch {
    [Hae, Chuk, Yu][month.index() % 3]
}

const KUIGANG: [&str; 5] = ["庚戌", "庚辰", "壬辰", "戊戌", "壬戌"];
const WHITE_TIGER: [&str; 7] = ["甲辰", "乙未", "丙戌", "戊辰", "丁丑", "壬戌", "癸丑"];
const LONELY_PHOENIX: [&str; 5] = ["甲寅", "乙巳", "丁巳", "戊申", "辛亥"];
const OWL_SPIRIT: [&str; 12] = [
    "甲子", "乙亥", "丙寅", "丁卯", "戊午", "己巳", "庚辰", "庚戌", "辛丑", "辛未", "壬申", "癸酉",
];
const PARTING: [&str; 11] = [
    "甲寅", "乙卯", "乙未", "丙午", "戊辰", "戊申", "戊戌", "己丑", "庚申", "辛酉", "壬子",
];
const PROSPERITY_VOID: [&str; 10] = [
    "甲辰", "乙巳", "丙申", "丁亥", "戊戌", "己丑", "庚辰", "辛巳", "壬申", "癸亥",
];

fn pillar_in(p: Pillar, list: &[&str]) -> bool {
    let name = p.hanja();
    list.iter().any(|l| *l == name)
}

pub fn stars(pillars: &FourPillars) -> Vec<StarHit> {
    let day_stem = pillars.day.stem();
    let month_branch = pillars.month.branch();
    let year_branch = pillars.year.branch();
    let d = day_stem.index();

    let limbs = [
        (Limb::Year, Some(pillars.year)),
        (Limb::Month, Some(pillars.month)),
        (Limb::Day, Some(pillars.day)),
        (Limb::Hour, pillars.hour),
    ];

    let mut hits = Vec::new();
    for (limb, pillar) in limbs {
        let Some(p) = pillar else { continue };
        let b = p.branch();
        let mut hit = |star: Star, cond: bool| {
            if cond {
                hits.push(StarHit { star, limb });
            }
        };

        hit(Star::HeavenlyNoble, heavenly_noble(day_stem).contains(&b));
        hit(Star::LiteraryNoble, LITERARY_NOBLE[d] == b);
        hit(
            Star::HeavenlyVirtue,
            match heavenly_virtue(month_branch) {
                Glyph::Stem(s) => p.stem() == s,
                Glyph::Branch(t) => b == t,
            },
        );
        hit(Star::MonthlyVirtue, p.stem() == monthly_virtue(month_branch));
        hit(Star::Kuigang, pillar_in(p, &KUIGANG));
        hit(Star::WhiteTiger, pillar_in(p, &WHITE_TIGER));
        hit(Star::YangBlade, yang_blade(day_stem).contains(&b));
        hit(Star::RedSensuality, red_sensuality(day_stem).contains(&b));
        hit(Star::Prosperity, PROSPERITY[d] == b);
        hit(Star::HiddenProsperity, HIDDEN_PROSPERITY[d] == b);
        hit(Star::GoldenCarriage, GOLDEN_CARRIAGE[d] == b);
        hit(Star::Academy, ACADEMY[d] == b);
        hit(Star::LonelyPhoenix, limb == Limb::Day && pillar_in(p, &LONELY_PHOENIX));
        hit(Star::PeachBlossom, b == peach_blossom(year_branch));
        hit(Star::FallingWell, FALLING_WELL[d] == b);
        hit(Star::OwlSpirit, pillar_in(p, &OWL_SPIRIT));
        hit(Star::WaterPeril, b == water_peril(month_branch));
        hit(Star::Parting, limb == Limb::Day && pillar_in(p, &PARTING));
        hit(Star::DeafMute, limb == Limb::Hour && b == peach_blossom(year_branch));
        hit(Star::ProsperityVoid, limb == Limb::Day && pillar_in(p, &PROSPERITY_VOID));
        hit(Star::CauldronSplit, b == cauldron_split(month_branch));
        hit(Star::LiteraryCurve, LITERARY_CURVE[d] == b);
        hit(Star::HeavenlyKitchen, HEAVENLY_KITCHEN[d] == b);
        hit(Star::OfficialAcademy, OFFICIAL_ACADEMY[d] == b);
        hit(Star::TaijiNoble, limb == Limb::Year && taiji_noble(day_stem).contains(&b));
    }
    hits
}
