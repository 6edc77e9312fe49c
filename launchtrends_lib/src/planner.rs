//! Window Planner: turns run parameters into the list of query windows.

use chrono::{DateTime, Duration, Utc};

use crate::config::ConfigError;
use crate::window::{LeaderboardPeriod, QueryWindow, Timezone};

/// What a run should collect.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowPlan {
    /// The last `days` calendar days ending today in `timezone`.
    Dates { days: i64, timezone: Timezone },
    /// One window per named leaderboard period.
    Leaderboard { periods: Vec<LeaderboardPeriod> },
}

/// Enumerates the windows for `plan`, anchored at `now`.
///
/// Date windows come newest-first. Leaderboard periods keep their input
/// order with duplicates removed.
pub fn plan_windows(plan: &WindowPlan, now: DateTime<Utc>) -> Result<Vec<QueryWindow>, ConfigError> {
    match plan {
        WindowPlan::Dates { days, timezone } => {
            if *days < 1 {
                return Err(ConfigError::InvalidDays(*days));
            }
            let today = timezone.today(now);
            Ok((0..*days)
                .map(|offset| QueryWindow::day(today - Duration::days(offset), *timezone))
                .collect())
        }
        WindowPlan::Leaderboard { periods } => {
            if periods.is_empty() {
                return Err(ConfigError::NoPeriods);
            }
            let mut windows: Vec<QueryWindow> = Vec::with_capacity(periods.len());
            for period in periods {
                let window = QueryWindow::Leaderboard(*period);
                if !windows.contains(&window) {
                    windows.push(window);
                }
            }
            Ok(windows)
        }
    }
}

/// Parses a comma-separated period list such as `"today,week"`.
pub fn parse_periods(raw: &str) -> Result<Vec<LeaderboardPeriod>, ConfigError> {
    let periods = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<LeaderboardPeriod>, _>>()?;
    if periods.is_empty() {
        return Err(ConfigError::NoPeriods);
    }
    Ok(periods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use std::collections::HashSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, 3, 30, 0).unwrap()
    }

    fn dates(windows: &[QueryWindow]) -> Vec<NaiveDate> {
        windows
            .iter()
            .map(|w| match w {
                QueryWindow::Day { date, .. } => *date,
                QueryWindow::Leaderboard(_) => panic!("unexpected leaderboard window"),
            })
            .collect()
    }

    #[test]
    fn date_mode_yields_distinct_consecutive_days() {
        for days in [1, 2, 7, 31] {
            let plan = WindowPlan::Dates {
                days,
                timezone: Timezone::Utc,
            };
            let windows = plan_windows(&plan, now()).unwrap();
            assert_eq!(windows.len() as i64, days);
            let ds = dates(&windows);
            let unique: HashSet<_> = ds.iter().collect();
            assert_eq!(unique.len() as i64, days);
            for pair in ds.windows(2) {
                assert_eq!(pair[0] - pair[1], Duration::days(1));
            }
        }
    }

    #[test]
    fn date_mode_is_newest_first_and_ends_today() {
        let plan = WindowPlan::Dates {
            days: 2,
            timezone: Timezone::Utc,
        };
        let ds = dates(&plan_windows(&plan, now()).unwrap());
        assert_eq!(
            ds,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            ]
        );
    }

    #[test]
    fn pacific_plan_uses_local_today() {
        let plan = WindowPlan::Dates {
            days: 1,
            timezone: Timezone::Pacific,
        };
        let windows = plan_windows(&plan, now()).unwrap();
        assert_eq!(
            windows,
            vec![QueryWindow::day(
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                Timezone::Pacific
            )]
        );
    }

    #[test]
    fn zero_days_rejected() {
        let plan = WindowPlan::Dates {
            days: 0,
            timezone: Timezone::Utc,
        };
        assert!(matches!(
            plan_windows(&plan, now()),
            Err(ConfigError::InvalidDays(0))
        ));
    }

    #[test]
    fn leaderboard_dedupes_preserving_order() {
        let plan = WindowPlan::Leaderboard {
            periods: vec![
                LeaderboardPeriod::Week,
                LeaderboardPeriod::Today,
                LeaderboardPeriod::Week,
            ],
        };
        let windows = plan_windows(&plan, now()).unwrap();
        assert_eq!(
            windows,
            vec![
                QueryWindow::Leaderboard(LeaderboardPeriod::Week),
                QueryWindow::Leaderboard(LeaderboardPeriod::Today),
            ]
        );
    }

    #[test]
    fn empty_leaderboard_rejected() {
        let plan = WindowPlan::Leaderboard { periods: vec![] };
        assert!(matches!(plan_windows(&plan, now()), Err(ConfigError::NoPeriods)));
    }

    #[test]
    fn parse_period_list() {
        assert_eq!(
            parse_periods("today, month").unwrap(),
            vec![LeaderboardPeriod::Today, LeaderboardPeriod::Month]
        );
        assert!(matches!(parse_periods(" , "), Err(ConfigError::NoPeriods)));
        assert!(matches!(
            parse_periods("today,decade"),
            Err(ConfigError::UnknownPeriod(_))
        ));
    }
}
