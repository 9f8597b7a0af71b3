// ==========================================
// 定制钣金排产系统 - 工作日历
// ==========================================
// 职责: 工作日判定、工作日偏移、ISO 周键
// 规则: 周末不排产; 开启周六加班后周六计入工作日
// ==========================================

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

// 序数基准日: 2015-01-05 (周一)
// 所有工作日序数相对该日计算, 保证 O(1) 偏移运算
fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 5).expect("静态日历基准日")
}

// ==========================================
// WeekKey - ISO 周键
// ==========================================
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WeekKey {
    pub iso_year: i32,
    pub iso_week: u32,
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.iso_year, self.iso_week)
    }
}

// ==========================================
// WorkCalendar - 工作日历
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendar {
    /// 周六加班开关 (加班档位生效时由可行性分析开启)
    pub saturday_overtime: bool,
}

impl WorkCalendar {
    pub fn new(saturday_overtime: bool) -> Self {
        Self { saturday_overtime }
    }

    /// 标准日历: 周一至周五
    pub fn standard() -> Self {
        Self {
            saturday_overtime: false,
        }
    }

    /// 每周工作日数
    fn week_len(&self) -> i64 {
        if self.saturday_overtime {
            6
        } else {
            5
        }
    }

    pub fn is_workday(&self, date: NaiveDate) -> bool {
        match date.weekday() {
            Weekday::Sat => self.saturday_overtime,
            Weekday::Sun => false,
            _ => true,
        }
    }

    /// 严格下一个工作日
    pub fn next_workday(&self, date: NaiveDate) -> NaiveDate {
        let mut d = date + Duration::days(1);
        while !self.is_workday(d) {
            d += Duration::days(1);
        }
        d
    }

    /// 严格上一个工作日
    pub fn prev_workday(&self, date: NaiveDate) -> NaiveDate {
        let mut d = date - Duration::days(1);
        while !self.is_workday(d) {
            d -= Duration::days(1);
        }
        d
    }

    /// 落在非工作日时向后顺延到最近工作日
    pub fn normalize_forward(&self, date: NaiveDate) -> NaiveDate {
        if self.is_workday(date) {
            date
        } else {
            self.next_workday(date)
        }
    }

    /// 落在非工作日时向前回退到最近工作日
    pub fn normalize_backward(&self, date: NaiveDate) -> NaiveDate {
        if self.is_workday(date) {
            date
        } else {
            self.prev_workday(date)
        }
    }

    /// 工作日序数 (相对基准日, 要求 date 为工作日)
    pub fn workday_ordinal(&self, date: NaiveDate) -> i64 {
        debug_assert!(self.is_workday(date));
        let days = (date - epoch()).num_days();
        let week = days.div_euclid(7);
        let dow = days.rem_euclid(7); // 0 = 周一
        week * self.week_len() + dow.min(self.week_len() - 1)
    }

    /// 序数反解为日期
    pub fn date_from_ordinal(&self, ordinal: i64) -> NaiveDate {
        let week = ordinal.div_euclid(self.week_len());
        let dow = ordinal.rem_euclid(self.week_len());
        epoch() + Duration::days(week * 7 + dow)
    }

    /// 工作日偏移 (n 可为负; date 要求为工作日)
    pub fn add_workdays(&self, date: NaiveDate, n: i64) -> NaiveDate {
        self.date_from_ordinal(self.workday_ordinal(date) + n)
    }

    /// 两个工作日之间的工作日步数 (to 在 from 之后为正)
    pub fn workdays_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        self.workday_ordinal(self.normalize_forward(to))
            - self.workday_ordinal(self.normalize_forward(from))
    }

    /// 从 start 起连续 days 个工作日的最后一日
    pub fn span_end(&self, start: NaiveDate, days: i64) -> NaiveDate {
        debug_assert!(days >= 1);
        self.add_workdays(start, days - 1)
    }

    /// 从 start 起连续 count 个工作日
    pub fn workdays_in_span(&self, start: NaiveDate, count: i64) -> Vec<NaiveDate> {
        let base = self.workday_ordinal(start);
        (0..count.max(0))
            .map(|i| self.date_from_ordinal(base + i))
            .collect()
    }

    pub fn week_key(&self, date: NaiveDate) -> WeekKey {
        let iso = date.iso_week();
        WeekKey {
            iso_year: iso.year(),
            iso_week: iso.week(),
        }
    }
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::standard()
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_weekend_skipped() {
        let cal = WorkCalendar::standard();
        // 2026-08-07 是周五
        assert!(cal.is_workday(d(2026, 8, 7)));
        assert!(!cal.is_workday(d(2026, 8, 8))); // 周六
        assert!(!cal.is_workday(d(2026, 8, 9))); // 周日
        assert_eq!(cal.next_workday(d(2026, 8, 7)), d(2026, 8, 10));
        assert_eq!(cal.prev_workday(d(2026, 8, 10)), d(2026, 8, 7));
    }

    #[test]
    fn test_saturday_overtime() {
        let cal = WorkCalendar::new(true);
        assert!(cal.is_workday(d(2026, 8, 8))); // 周六计入
        assert!(!cal.is_workday(d(2026, 8, 9))); // 周日仍休
        assert_eq!(cal.next_workday(d(2026, 8, 7)), d(2026, 8, 8));
    }

    #[test]
    fn test_ordinal_roundtrip() {
        let cal = WorkCalendar::standard();
        let mut date = d(2026, 1, 1);
        for _ in 0..200 {
            date = cal.next_workday(date);
            let ord = cal.workday_ordinal(date);
            assert_eq!(cal.date_from_ordinal(ord), date);
        }
    }

    #[test]
    fn test_add_workdays_across_weekend() {
        let cal = WorkCalendar::standard();
        // 周五 + 1 工作日 = 下周一
        assert_eq!(cal.add_workdays(d(2026, 8, 7), 1), d(2026, 8, 10));
        assert_eq!(cal.add_workdays(d(2026, 8, 10), -1), d(2026, 8, 7));
        assert_eq!(cal.add_workdays(d(2026, 8, 3), 10), d(2026, 8, 17));
    }

    #[test]
    fn test_workdays_between() {
        let cal = WorkCalendar::standard();
        assert_eq!(cal.workdays_between(d(2026, 8, 3), d(2026, 8, 10)), 5);
        assert_eq!(cal.workdays_between(d(2026, 8, 10), d(2026, 8, 3)), -5);
        assert_eq!(cal.workdays_between(d(2026, 8, 3), d(2026, 8, 3)), 0);
    }

    #[test]
    fn test_week_key() {
        let cal = WorkCalendar::standard();
        let key = cal.week_key(d(2026, 1, 5));
        assert_eq!(key.to_string(), "2026-W02");
        // 跨年 ISO 周
        let key = cal.week_key(d(2027, 1, 1));
        assert_eq!(key.iso_year, 2026);
        assert_eq!(key.iso_week, 53);
    }

    #[test]
    fn test_span() {
        let cal = WorkCalendar::standard();
        assert_eq!(cal.span_end(d(2026, 8, 6), 3), d(2026, 8, 10)); // 周四起3日 → 周一
        let span = cal.workdays_in_span(d(2026, 8, 6), 3);
        assert_eq!(span, vec![d(2026, 8, 6), d(2026, 8, 7), d(2026, 8, 10)]);
    }
}
