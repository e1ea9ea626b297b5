//! Trading calendar and session clock for the Shanghai/Shenzhen markets

use crate::error::{Result, RulesError};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI32, Ordering};

/// Trading session times
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionTimes {
    pub market_open: NaiveTime,
    pub market_close: NaiveTime,
}

/// Trading calendar trait
pub trait TradingCalendar: Send + Sync {
    /// Get the timezone for this calendar
    fn timezone(&self) -> Tz;

    /// Check if a date is a trading day
    fn is_trading_day(&self, date: NaiveDate) -> bool;

    /// Get session times for a date
    fn session_times(&self, date: NaiveDate) -> Option<SessionTimes>;

    /// Get the next trading day after the given date
    fn next_trading_day(&self, date: NaiveDate) -> Result<NaiveDate> {
        let mut current = date + Duration::days(1);
        for _ in 0..365 {
            if self.is_trading_day(current) {
                return Ok(current);
            }
            current += Duration::days(1);
        }
        Err(RulesError::CalendarError(
            "No trading day found within 365 days".to_string(),
        ))
    }

    /// Get the previous trading day before the given date
    fn previous_trading_day(&self, date: NaiveDate) -> Result<NaiveDate> {
        let mut current = date - Duration::days(1);
        for _ in 0..365 {
            if self.is_trading_day(current) {
                return Ok(current);
            }
            current -= Duration::days(1);
        }
        Err(RulesError::CalendarError(
            "No trading day found within 365 days".to_string(),
        ))
    }

    /// Get all trading days between two dates (inclusive)
    fn trading_days_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_trading_day(*d))
            .collect()
    }
}

/// China A-share exchange calendar (SSE/SZSE share one schedule)
#[derive(Debug, Clone)]
pub struct ChinaCalendar {
    /// Sorted list of exchange holidays falling on weekdays
    holidays: Vec<NaiveDate>,
}

impl ChinaCalendar {
    /// Calendar with the built-in holiday list
    pub fn new() -> Self {
        Self {
            holidays: Self::default_holidays(),
        }
    }

    /// Calendar that only closes on weekends and the given holidays
    pub fn with_holidays(mut holidays: Vec<NaiveDate>) -> Self {
        holidays.sort();
        holidays.dedup();
        Self { holidays }
    }

    fn default_holidays() -> Vec<NaiveDate> {
        // Spring Festival and National Day closures only; other holidays are
        // supplied through configuration.
        [
            (2024, 2, 9),
            (2024, 2, 12),
            (2024, 2, 13),
            (2024, 2, 14),
            (2024, 2, 15),
            (2024, 2, 16),
            (2024, 10, 1),
            (2024, 10, 2),
            (2024, 10, 3),
            (2024, 10, 4),
            (2024, 10, 7),
            (2025, 1, 28),
            (2025, 1, 29),
            (2025, 1, 30),
            (2025, 1, 31),
            (2025, 2, 3),
            (2025, 2, 4),
            (2025, 10, 1),
            (2025, 10, 2),
            (2025, 10, 3),
            (2025, 10, 6),
            (2025, 10, 7),
            (2025, 10, 8),
        ]
        .iter()
        .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
        .collect()
    }

    /// Add a custom holiday
    pub fn add_holiday(&mut self, date: NaiveDate) {
        if let Err(pos) = self.holidays.binary_search(&date) {
            self.holidays.insert(pos, date);
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.binary_search(&date).is_ok()
    }

    fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

impl Default for ChinaCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl TradingCalendar for ChinaCalendar {
    fn timezone(&self) -> Tz {
        chrono_tz::Asia::Shanghai
    }

    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !Self::is_weekend(date) && !self.is_holiday(date)
    }

    fn session_times(&self, date: NaiveDate) -> Option<SessionTimes> {
        if !self.is_trading_day(date) {
            return None;
        }
        Some(SessionTimes {
            market_open: NaiveTime::from_hms_opt(9, 30, 0)?,
            market_close: NaiveTime::from_hms_opt(15, 0, 0)?,
        })
    }
}

/// Clock/session collaborator consulted to decide when to sweep the ledger
pub trait TradingClock: Send + Sync {
    /// Current trading date as seen by the host
    fn current_trading_date(&self) -> NaiveDate;

    /// Whether `date` opens a trading session
    fn is_new_trading_session(&self, date: NaiveDate) -> bool;
}

/// Clock driven by the host, backed by a trading calendar
///
/// The current date is stored as days-from-CE so the clock can be shared
/// behind an `Arc` and advanced without a lock.
#[derive(Debug)]
pub struct CalendarClock<C: TradingCalendar> {
    calendar: C,
    current: AtomicI32,
}

impl<C: TradingCalendar> CalendarClock<C> {
    pub fn new(calendar: C, start: NaiveDate) -> Self {
        Self {
            calendar,
            current: AtomicI32::new(start.num_days_from_ce()),
        }
    }

    /// Move the clock to `date`
    pub fn set_date(&self, date: NaiveDate) {
        self.current.store(date.num_days_from_ce(), Ordering::SeqCst);
    }

    /// Advance to the next trading day and return it
    pub fn advance(&self) -> Result<NaiveDate> {
        let next = self.calendar.next_trading_day(self.current_trading_date())?;
        self.set_date(next);
        Ok(next)
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }
}

impl<C: TradingCalendar> TradingClock for CalendarClock<C> {
    fn current_trading_date(&self) -> NaiveDate {
        let days = self.current.load(Ordering::SeqCst);
        NaiveDate::from_num_days_from_ce_opt(days).unwrap_or(NaiveDate::MIN)
    }

    fn is_new_trading_session(&self, date: NaiveDate) -> bool {
        self.calendar.is_trading_day(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_china_calendar() {
        let calendar = ChinaCalendar::new();

        assert!(calendar.is_trading_day(date(2024, 1, 8)));
        assert!(!calendar.is_trading_day(date(2024, 1, 6)));
        // Spring Festival
        assert!(!calendar.is_trading_day(date(2024, 2, 14)));
        assert_eq!(calendar.timezone(), chrono_tz::Asia::Shanghai);
    }

    #[test]
    fn test_next_trading_day_skips_holiday_week() {
        let calendar = ChinaCalendar::new();
        let next = calendar.next_trading_day(date(2024, 2, 8)).unwrap();
        assert_eq!(next, date(2024, 2, 19));

        let prev = calendar.previous_trading_day(date(2024, 2, 19)).unwrap();
        assert_eq!(prev, date(2024, 2, 8));
    }

    #[test]
    fn test_trading_days_between() {
        let calendar = ChinaCalendar::with_holidays(vec![]);
        let days = calendar.trading_days_between(date(2024, 1, 8), date(2024, 1, 14));
        assert_eq!(days.len(), 5);
    }

    #[test]
    fn test_add_holiday() {
        let mut calendar = ChinaCalendar::with_holidays(vec![]);
        calendar.add_holiday(date(2024, 4, 4));
        calendar.add_holiday(date(2024, 4, 4));
        assert!(!calendar.is_trading_day(date(2024, 4, 4)));
        assert!(calendar.is_trading_day(date(2024, 4, 3)));
    }

    #[test]
    fn test_session_times() {
        let calendar = ChinaCalendar::new();
        let times = calendar.session_times(date(2024, 1, 8)).unwrap();
        assert_eq!(times.market_open.hour(), 9);
        assert_eq!(times.market_open.minute(), 30);
        assert_eq!(times.market_close.hour(), 15);
        assert!(calendar.session_times(date(2024, 1, 6)).is_none());
    }

    #[test]
    fn test_calendar_clock() {
        let clock = CalendarClock::new(ChinaCalendar::with_holidays(vec![]), date(2024, 1, 5));
        assert_eq!(clock.current_trading_date(), date(2024, 1, 5));
        assert!(clock.is_new_trading_session(date(2024, 1, 5)));
        assert!(!clock.is_new_trading_session(date(2024, 1, 6)));

        assert_eq!(clock.advance().unwrap(), date(2024, 1, 8));
        assert_eq!(clock.current_trading_date(), date(2024, 1, 8));
    }
}
