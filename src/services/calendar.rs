//! # 달력/주(週) 계산
//!
//! 엔트리의 `date`와 주 경계는 설정된 로컬 시간대 기준으로 결정됩니다.
//! 주는 월요일 00:00 ~ 일요일 23:59:59 (로컬)입니다.

use crate::error::AppError;
use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Offset, Utc, Weekday};

/// 고정 오프셋 시간대 하나로 날짜와 주를 계산하는 달력
#[derive(Debug, Clone, Copy)]
pub struct LocalCalendar {
    offset: FixedOffset,
}

impl LocalCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// 분 단위 오프셋으로 만듭니다. 범위를 벗어나면 UTC를 씁니다.
    pub fn from_offset_minutes(minutes: i32) -> Self {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!("Invalid timezone offset {} minutes, falling back to UTC", minutes);
                Self::utc_offset()
            });
        Self::new(offset)
    }

    pub fn utc() -> Self {
        Self::new(Self::utc_offset())
    }

    fn utc_offset() -> FixedOffset {
        Utc.fix()
    }

    /// 시각이 속한 로컬 달력 날짜
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// 날짜가 속한 ISO 주의 월요일
    pub fn week_start(&self, date: NaiveDate) -> NaiveDate {
        let back = date.weekday().num_days_from_monday() as u64;
        date.checked_sub_days(Days::new(back)).unwrap_or(date)
    }

    /// 호출자가 넘긴 `week_start`가 월요일인지 확인합니다.
    pub fn ensure_week_start(&self, week_start: NaiveDate) -> Result<NaiveDate, AppError> {
        if week_start.weekday() == Weekday::Mon {
            Ok(week_start)
        } else {
            Err(AppError::BadRequest(format!(
                "week_start must be a Monday, got {} ({})",
                week_start,
                week_start.weekday()
            )))
        }
    }
}

impl Default for LocalCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case(d(2026, 10, 12), d(2026, 10, 12))]
    #[case(d(2026, 10, 15), d(2026, 10, 12))]
    #[case(d(2026, 10, 18), d(2026, 10, 12))]
    #[case(d(2026, 10, 19), d(2026, 10, 19))]
    #[case(d(2027, 1, 1), d(2026, 12, 28))]
    fn week_starts_on_monday(#[case] date: NaiveDate, #[case] expected: NaiveDate) {
        assert_eq!(LocalCalendar::utc().week_start(date), expected);
    }

    #[test]
    fn local_date_uses_offset() {
        // UTC 일요일 23:30은 UTC+9에서 월요일 08:30입니다.
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 23, 30, 0).unwrap();
        assert_eq!(LocalCalendar::utc().local_date(at), d(2026, 10, 18));
        assert_eq!(LocalCalendar::from_offset_minutes(540).local_date(at), d(2026, 10, 19));
    }

    #[test]
    fn invalid_offset_falls_back_to_utc() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 23, 30, 0).unwrap();
        let calendar = LocalCalendar::from_offset_minutes(100_000);
        assert_eq!(calendar.local_date(at), d(2026, 10, 18));
    }

    #[test]
    fn rejects_non_monday_week_start() {
        let calendar = LocalCalendar::utc();
        assert!(calendar.ensure_week_start(d(2026, 10, 12)).is_ok());
        assert!(matches!(
            calendar.ensure_week_start(d(2026, 10, 13)),
            Err(AppError::BadRequest(_))
        ));
    }
}
