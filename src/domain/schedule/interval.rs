use std::ops::Range;

use chrono::{DateTime, Duration, Utc};
use derive_more::{Deref, Display, Error, From, IntoIterator};
use serde::{Deserialize, Serialize};

/// 時間区間 [start, end)。start < end が常に成り立つ
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IntervalError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(IntervalError::NotIncreasing)
        }
    }

    /// 開始時刻と長さから区間を作る
    pub fn starting_at(start: DateTime<Utc>, length: Duration) -> Result<Self, IntervalError> {
        Self::new(start, start + length)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn range(&self) -> Range<DateTime<Utc>> {
        self.start..self.end
    }
}

#[derive(Deserialize)]
struct RawInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawInterval> for Interval {
    type Error = IntervalError;

    fn try_from(value: RawInterval) -> Result<Self, Self::Error> {
        Interval::new(value.start, value.end)
    }
}

/// 区間エラー
#[derive(Error, Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalError {
    /// 終了時刻が開始時刻より後ではありません
    #[display(fmt = "Interval end must be after its start")]
    NotIncreasing,
}

/// 1トレーナー分の予約済み区間
#[derive(Clone, Debug, Default, PartialEq, Eq, From, Deref, IntoIterator)]
pub struct BookedSet(Vec<Interval>);

impl FromIterator<Interval> for BookedSet {
    fn from_iter<T: IntoIterator<Item = Interval>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_interval_new() {
        let interval = Interval::new(at(9, 0), at(9, 30)).unwrap();
        assert_eq!(interval.start(), at(9, 0));
        assert_eq!(interval.end(), at(9, 30));
        assert_eq!(interval.duration(), Duration::minutes(30));
    }

    #[test]
    fn test_interval_rejects_empty_and_reversed() {
        assert_eq!(
            Interval::new(at(9, 0), at(9, 0)),
            Err(IntervalError::NotIncreasing)
        );
        assert_eq!(
            Interval::new(at(9, 30), at(9, 0)),
            Err(IntervalError::NotIncreasing)
        );
        assert!(Interval::starting_at(at(9, 0), Duration::zero()).is_err());
    }

    #[test]
    fn test_interval_deserialize_validates() {
        let ok: Interval = serde_json::from_str(
            r#"{"start":"2024-01-02T09:00:00Z","end":"2024-01-02T09:30:00Z"}"#,
        )
        .unwrap();
        assert_eq!(ok.start(), at(9, 0));
        let reversed = serde_json::from_str::<Interval>(
            r#"{"start":"2024-01-02T09:30:00Z","end":"2024-01-02T09:00:00Z"}"#,
        );
        assert!(reversed.is_err());
    }
}
