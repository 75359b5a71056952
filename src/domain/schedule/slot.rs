use derive_more::{Display, Error};

use super::{BusinessCalendar, Interval};

impl BusinessCalendar {
    /// 予約可能な枠かどうかを検証する
    ///
    /// 開始は `[開店, 閉店)`、終了は `(開店, 閉店]` に収まり、開始と終了が
    /// 営業タイムゾーンで同じ日付であり、長さがちょうど1枠であること。
    /// 予約の有無はここでは見ない。
    pub fn validate_slot(&self, candidate: &Interval) -> Result<(), SlotError> {
        let start = self.time_of_day(candidate.start());
        if start < self.opens_at() || start >= self.closes_at() {
            return Err(SlotError::StartsOutsideHours);
        }
        let end = self.time_of_day(candidate.end());
        if end > self.closes_at()
            || end <= self.opens_at()
            || self.local_date(candidate.end()) != self.local_date(candidate.start())
        {
            return Err(SlotError::EndsOutsideHours);
        }
        if candidate.duration() != self.slot_duration() {
            return Err(SlotError::InvalidDuration);
        }
        Ok(())
    }

    pub fn is_valid_slot(&self, candidate: &Interval) -> bool {
        self.validate_slot(candidate).is_ok()
    }
}

/// 枠の検証エラー
#[derive(Error, Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    /// 開始時刻が営業時間外です
    #[display(fmt = "Slot starts outside business hours")]
    StartsOutsideHours,
    /// 終了時刻が営業時間外です
    #[display(fmt = "Slot ends outside business hours")]
    EndsOutsideHours,
    /// 枠の長さが一致しません
    #[display(fmt = "Slot length does not match the slot duration")]
    InvalidDuration,
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

    use super::*;

    fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    fn slot(from: (u32, u32), to: (u32, u32)) -> Interval {
        Interval::new(utc(2, from.0, from.1), utc(2, to.0, to.1)).unwrap()
    }

    #[test]
    fn test_valid_slots_inside_hours() {
        let calendar = BusinessCalendar::default();
        assert!(calendar.is_valid_slot(&slot((8, 0), (8, 30))));
        assert!(calendar.is_valid_slot(&slot((12, 15), (12, 45))));
        // 閉店ちょうどに終わる枠
        assert!(calendar.is_valid_slot(&slot((16, 30), (17, 0))));
    }

    #[test]
    fn test_rejects_crossing_closing_time() {
        let calendar = BusinessCalendar::default();
        assert_eq!(
            calendar.validate_slot(&slot((16, 45), (17, 15))),
            Err(SlotError::EndsOutsideHours)
        );
        assert_eq!(
            calendar.validate_slot(&slot((17, 0), (17, 30))),
            Err(SlotError::StartsOutsideHours)
        );
    }

    #[test]
    fn test_rejects_before_opening() {
        let calendar = BusinessCalendar::default();
        assert_eq!(
            calendar.validate_slot(&slot((7, 30), (8, 0))),
            Err(SlotError::StartsOutsideHours)
        );
        assert_eq!(
            calendar.validate_slot(&slot((7, 45), (8, 15))),
            Err(SlotError::StartsOutsideHours)
        );
    }

    #[test]
    fn test_rejects_wrong_duration() {
        let calendar = BusinessCalendar::default();
        for end in [(8, 15), (8, 45), (9, 0), (10, 0)] {
            assert_eq!(
                calendar.validate_slot(&slot((8, 0), end)),
                Err(SlotError::InvalidDuration)
            );
        }
    }

    #[test]
    fn test_rejects_slot_spanning_days() {
        let calendar = BusinessCalendar::default();
        let overnight = Interval::new(utc(2, 16, 30), utc(3, 8, 30)).unwrap();
        assert!(!calendar.is_valid_slot(&overnight));
    }

    #[test]
    fn test_uses_business_zone() {
        let calendar = BusinessCalendar::new(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            Duration::minutes(30),
            FixedOffset::east_opt(9 * 3600).unwrap(),
        )
        .unwrap();
        // 23:00Z 〜 23:30Z は +09:00 で 08:00 〜 08:30
        let morning = Interval::new(utc(1, 23, 0), utc(1, 23, 30)).unwrap();
        assert!(calendar.is_valid_slot(&morning));
        assert!(!calendar.is_valid_slot(&slot((8, 0), (8, 30))));
    }
}
