//! Query windows: the unit of scope the pagination driver operates on.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;
use producthunt_api::{PostsOrder, PostsQuery};

use crate::config::ConfigError;

/// Timezone used to decide where a calendar day starts and ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Timezone {
    #[default]
    Utc,
    /// `America/Los_Angeles`, the timezone Product Hunt's launch day follows.
    Pacific,
}

impl Timezone {
    /// Today's calendar date in this timezone at instant `now`.
    pub fn today(self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            Timezone::Utc => now.date_naive(),
            Timezone::Pacific => now.with_timezone(&Los_Angeles).date_naive(),
        }
    }

    /// Local midnight at the start of `date`, as a UTC instant.
    pub fn start_of_day(self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(NaiveTime::MIN);
        match self {
            Timezone::Utc => naive.and_utc(),
            Timezone::Pacific => Los_Angeles
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| naive.and_utc()),
        }
    }

    /// Calendar date of instant `ts` in this timezone.
    pub fn date_of(self, ts: DateTime<Utc>) -> NaiveDate {
        self.today(ts)
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timezone::Utc => write!(f, "utc"),
            Timezone::Pacific => write!(f, "pacific"),
        }
    }
}

impl FromStr for Timezone {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utc" | "z" => Ok(Timezone::Utc),
            "pacific" | "pst" | "pdt" | "pt" | "america/los_angeles" | "us/pacific" => {
                Ok(Timezone::Pacific)
            }
            other => Err(ConfigError::UnknownTimezone(other.to_string())),
        }
    }
}

/// Named leaderboard period, resolved as a rolling span ending at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaderboardPeriod {
    Today,
    Week,
    Month,
    Year,
}

impl LeaderboardPeriod {
    /// Length of the rolling span in days.
    pub fn span_days(self) -> i64 {
        match self {
            LeaderboardPeriod::Today => 1,
            LeaderboardPeriod::Week => 7,
            LeaderboardPeriod::Month => 30,
            LeaderboardPeriod::Year => 365,
        }
    }
}

impl fmt::Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeaderboardPeriod::Today => "today",
            LeaderboardPeriod::Week => "week",
            LeaderboardPeriod::Month => "month",
            LeaderboardPeriod::Year => "year",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for LeaderboardPeriod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" | "daily" | "day" => Ok(LeaderboardPeriod::Today),
            "week" | "weekly" => Ok(LeaderboardPeriod::Week),
            "month" | "monthly" => Ok(LeaderboardPeriod::Month),
            "year" | "yearly" => Ok(LeaderboardPeriod::Year),
            other => Err(ConfigError::UnknownPeriod(other.to_string())),
        }
    }
}

/// One logical query: a calendar day in a timezone, or a leaderboard period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryWindow {
    Day { date: NaiveDate, timezone: Timezone },
    Leaderboard(LeaderboardPeriod),
}

impl QueryWindow {
    pub fn day(date: NaiveDate, timezone: Timezone) -> Self {
        QueryWindow::Day { date, timezone }
    }

    /// Timezone the window was planned in, if it has one.
    pub fn timezone(&self) -> Option<Timezone> {
        match self {
            QueryWindow::Day { timezone, .. } => Some(*timezone),
            QueryWindow::Leaderboard(_) => None,
        }
    }

    /// Builds the posts query for this window. `reference` anchors rolling
    /// leaderboard spans and must stay fixed while paging through one window.
    pub fn to_query(&self, reference: DateTime<Utc>) -> PostsQuery {
        match *self {
            QueryWindow::Day { date, timezone } => {
                let next = date.succ_opt().unwrap_or(date);
                PostsQuery::default()
                    .with_posted_between(timezone.start_of_day(date), timezone.start_of_day(next))
            }
            QueryWindow::Leaderboard(period) => PostsQuery::default()
                .with_order(PostsOrder::Ranking)
                .with_featured(true)
                .with_posted_after(reference - Duration::days(period.span_days())),
        }
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryWindow::Day { date, .. } => write!(f, "{}", date.format("%Y-%m-%d")),
            QueryWindow::Leaderboard(period) => write!(f, "leaderboard:{}", period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn pacific_today_lags_utc_after_midnight_utc() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap();
        assert_eq!(Timezone::Utc.today(now), date(2024, 1, 2));
        assert_eq!(Timezone::Pacific.today(now), date(2024, 1, 1));
    }

    #[test]
    fn pacific_midnight_in_winter_and_summer() {
        assert_eq!(
            Timezone::Pacific.start_of_day(date(2024, 1, 1)),
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
        );
        assert_eq!(
            Timezone::Pacific.start_of_day(date(2024, 7, 1)),
            Utc.with_ymd_and_hms(2024, 7, 1, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn day_window_query_spans_one_local_day() {
        let window = QueryWindow::day(date(2024, 3, 10), Timezone::Pacific);
        let query = window.to_query(Utc::now());
        // DST starts on 2024-03-10, so the local day is 23 hours long.
        let span = query.posted_before.unwrap() - query.posted_after.unwrap();
        assert_eq!(span, Duration::hours(23));
    }

    #[test]
    fn utc_day_window_query_bounds() {
        let window = QueryWindow::day(date(2024, 1, 1), Timezone::Utc);
        let query = window.to_query(Utc::now());
        assert_eq!(
            query.posted_after,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            query.posted_before,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
        assert!(query.order.is_none());
    }

    #[test]
    fn leaderboard_query_is_ranked_and_rolling() {
        let reference = Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap();
        let query = QueryWindow::Leaderboard(LeaderboardPeriod::Week).to_query(reference);
        assert_eq!(query.order, Some(PostsOrder::Ranking));
        assert_eq!(query.featured, Some(true));
        assert_eq!(
            query.posted_after,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
        assert!(query.posted_before.is_none());
    }

    #[test]
    fn parse_timezone_and_period() {
        assert_eq!("PST".parse::<Timezone>().unwrap(), Timezone::Pacific);
        assert_eq!("utc".parse::<Timezone>().unwrap(), Timezone::Utc);
        assert!("mars".parse::<Timezone>().is_err());
        assert_eq!(
            "Weekly".parse::<LeaderboardPeriod>().unwrap(),
            LeaderboardPeriod::Week
        );
        assert!("fortnight".parse::<LeaderboardPeriod>().is_err());
    }

    #[test]
    fn window_display() {
        assert_eq!(
            QueryWindow::day(date(2024, 1, 1), Timezone::Utc).to_string(),
            "2024-01-01"
        );
        assert_eq!(
            QueryWindow::Leaderboard(LeaderboardPeriod::Month).to_string(),
            "leaderboard:month"
        );
    }
}
