use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, SecondsFormat, TimeZone, Utc,
};
use derive_more::{Display, Error};

/// 営業カレンダー
///
/// 開店・閉店時刻と枠の長さを持つ。時刻の判定はすべて営業タイムゾーン
/// (固定オフセット)上の時刻で行う。起動時に一度だけ作られ、以降は読み取り専用。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusinessCalendar {
    opens_at: NaiveTime,
    closes_at: NaiveTime,
    slot_duration: Duration,
    offset: FixedOffset,
}

impl BusinessCalendar {
    pub fn new(
        opens_at: NaiveTime,
        closes_at: NaiveTime,
        slot_duration: Duration,
        offset: FixedOffset,
    ) -> Result<Self, CalendarError> {
        if opens_at >= closes_at {
            return Err(CalendarError::InvalidHours);
        }
        if slot_duration <= Duration::zero() || slot_duration > closes_at - opens_at {
            return Err(CalendarError::InvalidSlotDuration);
        }
        Ok(Self {
            opens_at,
            closes_at,
            slot_duration,
            offset,
        })
    }

    pub fn opens_at(&self) -> NaiveTime {
        self.opens_at
    }

    pub fn closes_at(&self) -> NaiveTime {
        self.closes_at
    }

    pub fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// 営業タイムゾーンでの時刻
    pub fn time_of_day(&self, instant: DateTime<Utc>) -> NaiveTime {
        instant.with_timezone(&self.offset).time()
    }

    /// 営業タイムゾーンでの日付
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// 営業タイムゾーンの日付と時刻を絶対時刻に変換する
    pub fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let local = date.and_time(time);
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }

    /// 同じ日の開店時刻
    pub fn opening_of(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.at(self.local_date(instant), self.opens_at)
    }

    /// 翌日の開店時刻
    pub fn next_opening(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.at(self.local_date(instant) + Duration::days(1), self.opens_at)
    }

    /// 開店前なら同じ日の開店時刻まで進める。後ろには戻さない
    pub fn clamp_to_opening(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        if self.time_of_day(instant) < self.opens_at {
            self.opening_of(instant)
        } else {
            instant
        }
    }

    /// RFC 3339 (営業タイムゾーン、UTCなら`Z`)で整形する
    pub fn format(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl Default for BusinessCalendar {
    /// 08:00〜17:00、30分枠、UTC
    fn default() -> Self {
        Self {
            opens_at: NaiveTime::from_hms_opt(8, 0, 0).expect("valid time of day"),
            closes_at: NaiveTime::from_hms_opt(17, 0, 0).expect("valid time of day"),
            slot_duration: Duration::minutes(30),
            offset: Utc.fix(),
        }
    }
}

/// 営業カレンダーの設定エラー
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// 開店時刻が閉店時刻より後です
    #[display(fmt = "Opening time must be before closing time")]
    InvalidHours,
    /// 枠の長さが不正です
    #[display(fmt = "Slot duration must be positive and fit within business hours")]
    InvalidSlotDuration,
    /// 時刻を解釈できません
    #[display(fmt = "Invalid time of day: {}", _0)]
    InvalidTimeOfDay(#[error(not(source))] String),
    /// UTCオフセットが範囲外です
    #[display(fmt = "UTC offset is out of range")]
    InvalidOffset,
    /// 検索期間の上限が範囲外です
    #[display(fmt = "Maximum search window must be between 1 and {} days", _0)]
    InvalidMaxWindow(#[error(not(source))] i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_default_calendar() {
        let calendar = BusinessCalendar::default();
        assert_eq!(calendar.opens_at(), hm(8, 0));
        assert_eq!(calendar.closes_at(), hm(17, 0));
        assert_eq!(calendar.slot_duration(), Duration::minutes(30));
        assert_eq!(calendar.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_policy() {
        let offset = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            BusinessCalendar::new(hm(17, 0), hm(8, 0), Duration::minutes(30), offset),
            Err(CalendarError::InvalidHours)
        );
        assert_eq!(
            BusinessCalendar::new(hm(8, 0), hm(8, 0), Duration::minutes(30), offset),
            Err(CalendarError::InvalidHours)
        );
        assert_eq!(
            BusinessCalendar::new(hm(8, 0), hm(17, 0), Duration::zero(), offset),
            Err(CalendarError::InvalidSlotDuration)
        );
        assert_eq!(
            BusinessCalendar::new(hm(8, 0), hm(9, 0), Duration::minutes(90), offset),
            Err(CalendarError::InvalidSlotDuration)
        );
    }

    #[test]
    fn test_opening_and_rollover() {
        let calendar = BusinessCalendar::default();
        assert_eq!(calendar.opening_of(utc(2, 6, 15)), utc(2, 8, 0));
        assert_eq!(calendar.next_opening(utc(2, 16, 30)), utc(3, 8, 0));
        assert_eq!(calendar.clamp_to_opening(utc(2, 7, 0)), utc(2, 8, 0));
        assert_eq!(calendar.clamp_to_opening(utc(2, 9, 10)), utc(2, 9, 10));
    }

    #[test]
    fn test_business_zone_offset() {
        let offset = FixedOffset::west_opt(8 * 3600).unwrap();
        let calendar =
            BusinessCalendar::new(hm(8, 0), hm(17, 0), Duration::minutes(30), offset).unwrap();
        // 16:00Z は -08:00 で 08:00
        assert_eq!(calendar.time_of_day(utc(2, 16, 0)), hm(8, 0));
        assert_eq!(calendar.local_date(utc(3, 2, 0)), utc(2, 0, 0).date_naive());
        assert_eq!(calendar.opening_of(utc(3, 2, 0)), utc(2, 16, 0));
        assert_eq!(calendar.format(utc(2, 16, 0)), "2024-01-02T08:00:00-08:00");
    }

    #[test]
    fn test_format_utc_uses_z() {
        let calendar = BusinessCalendar::default();
        assert_eq!(calendar.format(utc(2, 9, 0)), "2024-01-02T09:00:00Z");
    }
}
