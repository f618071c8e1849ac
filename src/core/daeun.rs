//! Decade fortune periods (대운).

use crate::core::solar_terms::SolarTermResolver;
use crate::domain::ganji::{Pillar, Stem};
use crate::domain::model::{DaeunPeriod, DaeunTable, Direction, FourPillars, Gender};
use crate::domain::ports::DaeunBoundary;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};

pub const PERIOD_COUNT: usize = 10;

/// Forward for a male born in a yang year or a female born in a yin year.
pub fn direction(year_stem: Stem, gender: Gender) -> Direction {
    if (gender == Gender::Male) == year_stem.is_yang() {
        Direction::Forward
    } else {
        Direction::Backward
    }
}

/// Three days count as one year; a remainder of two rounds up. Clamped to 1..=10.
pub fn starting_number(days: i64) -> u32 {
    let days = days.max(0);
    let (quotient, remainder) = (days / 3, days % 3);
    let n = if remainder >= 2 { quotient + 1 } else { quotient };
    n.clamp(1, 10) as u32
}

/// Ten periods stepping away from the month pillar; the first is one step out.
pub fn periods(month: Pillar, direction: Direction, starting_number: u32) -> Vec<DaeunPeriod> {
    (0..PERIOD_COUNT)
        .map(|index| {
            let start_age = starting_number + 10 * index as u32;
            DaeunPeriod {
                index,
                start_age,
                end_age: start_age + 9,
                pillar: month.offset(direction.step() * (index as i64 + 1)),
            }
        })
        .collect()
}

pub async fn compute(
    resolver: &SolarTermResolver,
    pillars: &FourPillars,
    moment: DateTime<Utc>,
    gender: Gender,
    boundary: DaeunBoundary,
) -> Result<DaeunTable> {
    let direction = direction(pillars.year.stem(), gender);
    let term = resolver.adjacent_term(moment, direction, boundary).await?;
    let days = match direction {
        Direction::Forward => (term.timestamp - moment).num_days(),
        Direction::Backward => (moment - term.timestamp).num_days(),
    };
    let starting_number = starting_number(days);
    tracing::debug!(
        "Daeun {:?} from {} ({} days) → starting number {}",
        direction,
        term.term,
        days,
        starting_number
    );

    Ok(DaeunTable {
        direction,
        starting_number,
        boundary_term: term.term,
        boundary_at: term.timestamp,
        days_to_boundary: days,
        boundary_precision: term.precision,
        periods: periods(pillars.month, direction, starting_number),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::solar_terms::{wall_clock_to_utc, KST_OFFSET_MINUTES};
    use crate::domain::solar_term::SolarTerm;
    use chrono::NaiveDate;

    #[test]
    fn test_direction_table() {
        assert_eq!(direction(Stem::Gap, Gender::Male), Direction::Forward);
        assert_eq!(direction(Stem::Gap, Gender::Female), Direction::Backward);
        assert_eq!(direction(Stem::Eul, Gender::Male), Direction::Backward);
        assert_eq!(direction(Stem::Eul, Gender::Female), Direction::Forward);
    }

    #[test]
    fn test_starting_number_rounding() {
        assert_eq!(starting_number(7), 2);
        assert_eq!(starting_number(8), 3);
        assert_eq!(starting_number(9), 3);
        assert_eq!(starting_number(0), 1);
        assert_eq!(starting_number(1), 1);
        assert_eq!(starting_number(45), 10);
        for days in 0..=40 {
            assert!((1..=10).contains(&starting_number(days)));
        }
    }

    #[test]
    fn test_periods_step_through_cycle() {
        let month = Pillar::from_token("丙寅").unwrap();
        let forward = periods(month, Direction::Forward, 3);
        assert_eq!(forward.len(), 10);
        assert_eq!(forward[0].pillar.hanja(), "丁卯");
        assert_eq!(forward[0].start_age, 3);
        assert_eq!(forward[0].end_age, 12);
        assert_eq!(forward[9].start_age, 93);

        let backward = periods(month, Direction::Backward, 3);
        assert_eq!(backward[0].pillar.hanja(), "乙丑");
        assert_eq!(backward[1].pillar.hanja(), "甲子");
        assert_eq!(backward[2].pillar.hanja(), "癸亥");
    }

    #[tokio::test]
    async fn test_compute_uses_next_month_opening_for_forward() {
        let resolver = SolarTermResolver::standard(
            None,
            None,
            std::time::Duration::from_millis(100),
            KST_OFFSET_MINUTES,
            1900,
            2100,
        );
        // 경칩 2024 is 03-05 10:23 KST: 8 days and 2h23m later.
        let moment = wall_clock_to_utc(
            NaiveDate::from_ymd_opt(2024, 2, 26)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            KST_OFFSET_MINUTES,
        );
        let pillars = FourPillars {
            year: Pillar::from_token("甲辰").unwrap(),
            month: Pillar::from_token("丙寅").unwrap(),
            day: Pillar::from_cycle_index(0),
            hour: None,
        };
        let table = compute(&resolver, &pillars, moment, Gender::Male, DaeunBoundary::MonthOpening)
            .await
            .unwrap();
        assert_eq!(table.direction, Direction::Forward);
        assert_eq!(table.boundary_term, SolarTerm::AwakeningOfInsects);
        assert_eq!(table.days_to_boundary, 8);
        assert_eq!(table.starting_number, 3);
        assert_eq!(table.periods[0].pillar.hanja(), "丁卯");
    }
}
