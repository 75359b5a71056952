use chrono::{Duration, FixedOffset, NaiveTime};
use config::{Config, ConfigError};
use serde::Deserialize;

use crate::domain::schedule::{BlockingRule, BusinessCalendar, CalendarError};

pub mod domain;
pub mod infrastructure;

/// 空き枠・予約済み時間帯を一度に検索できる期間の既定値(日)
pub const DEFAULT_MAX_WINDOW_DAYS: i64 = 31;
/// `calendar.max_window_days` に指定できる上限(日)
pub const MAX_WINDOW_DAYS_LIMIT: i64 = 366;

#[derive(Clone, Debug, Deserialize)]
pub struct TrainerBookingConfig {
    pub server: Server,
    pub calendar: Calendar,
    pub storage: Storage,
    pub logger: Logger,
}

impl TrainerBookingConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.address", "0.0.0.0:8081")?
            .set_default("calendar.opens_at", "08:00")?
            .set_default("calendar.closes_at", "17:00")?
            .set_default("calendar.slot_minutes", 30)?
            .set_default("calendar.utc_offset_minutes", 0)?
            .set_default("calendar.blocking", "exact_start")?
            .set_default("calendar.max_window_days", DEFAULT_MAX_WINDOW_DAYS)?
            .set_default("storage.backend", "memory")?
            .set_default("logger.level", "INFO")?
            .add_source(config::File::with_name("trainer_booking").required(false))
            .add_source(
                config::Environment::with_prefix("TRAINER_BOOKING")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<TrainerBookingConfig>()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    pub address: String,
    pub tls: Option<Tls>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Tls {
    pub cert: String,
    pub key: String,
}

/// 営業カレンダーの設定
#[derive(Clone, Debug, Deserialize)]
pub struct Calendar {
    /// 開店時刻 (HH:MM)
    pub opens_at: String,
    /// 閉店時刻 (HH:MM)
    pub closes_at: String,
    pub slot_minutes: i64,
    /// UTCからのオフセット(分)
    pub utc_offset_minutes: i32,
    pub blocking: BlockingRule,
    /// 一度に検索できる期間(日)
    pub max_window_days: i64,
}

impl Calendar {
    pub fn max_window(&self) -> Result<Duration, CalendarError> {
        match self.max_window_days {
            days @ 1..=MAX_WINDOW_DAYS_LIMIT => Ok(Duration::days(days)),
            _ => Err(CalendarError::InvalidMaxWindow(MAX_WINDOW_DAYS_LIMIT)),
        }
    }
}

impl TryFrom<&Calendar> for BusinessCalendar {
    type Error = CalendarError;

    fn try_from(value: &Calendar) -> Result<Self, Self::Error> {
        let opens_at = parse_time_of_day(&value.opens_at)?;
        let closes_at = parse_time_of_day(&value.closes_at)?;
        let offset = FixedOffset::east_opt(value.utc_offset_minutes * 60)
            .ok_or(CalendarError::InvalidOffset)?;
        BusinessCalendar::new(
            opens_at,
            closes_at,
            Duration::minutes(value.slot_minutes),
            offset,
        )
    }
}

fn parse_time_of_day(value: &str) -> Result<NaiveTime, CalendarError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| CalendarError::InvalidTimeOfDay(value.to_owned()))
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
    pub backend: Backend,
    pub eventstore_url: Option<String>,
    /// 起動時に読み込むシードデータ
    pub seed: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Memory,
    EventStore,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Logger {
    pub level: Level,
}

#[derive(Clone, Debug, Deserialize)]
pub enum Level {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<&Level> for tracing::Level {
    fn from(value: &Level) -> Self {
        match value {
            Level::TRACE => tracing::Level::TRACE,
            Level::DEBUG => tracing::Level::DEBUG,
            Level::INFO => tracing::Level::INFO,
            Level::WARN => tracing::Level::WARN,
            Level::ERROR => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    fn calendar_config() -> Calendar {
        Calendar {
            opens_at: "08:00".to_owned(),
            closes_at: "17:00".to_owned(),
            slot_minutes: 30,
            utc_offset_minutes: 0,
            blocking: BlockingRule::ExactStart,
            max_window_days: DEFAULT_MAX_WINDOW_DAYS,
        }
    }

    #[test]
    fn test_calendar_from_config() {
        let calendar = BusinessCalendar::try_from(&calendar_config()).unwrap();
        assert_eq!(calendar.opens_at().hour(), 8);
        assert_eq!(calendar.closes_at().hour(), 17);
        assert_eq!(calendar.slot_duration(), Duration::minutes(30));
    }

    #[test]
    fn test_calendar_from_config_rejects_bad_time() {
        let config = Calendar {
            opens_at: "8 o'clock".to_owned(),
            ..calendar_config()
        };
        assert!(matches!(
            BusinessCalendar::try_from(&config),
            Err(CalendarError::InvalidTimeOfDay(_))
        ));
    }

    #[test]
    fn test_calendar_from_config_rejects_bad_offset() {
        let config = Calendar {
            utc_offset_minutes: 24 * 60,
            ..calendar_config()
        };
        assert!(matches!(
            BusinessCalendar::try_from(&config),
            Err(CalendarError::InvalidOffset)
        ));
    }

    #[test]
    fn test_max_window_from_config() {
        assert_eq!(calendar_config().max_window(), Ok(Duration::days(31)));
        for days in [0, -1, MAX_WINDOW_DAYS_LIMIT + 1] {
            let config = Calendar {
                max_window_days: days,
                ..calendar_config()
            };
            assert_eq!(
                config.max_window(),
                Err(CalendarError::InvalidMaxWindow(MAX_WINDOW_DAYS_LIMIT))
            );
        }
    }

    #[test]
    fn test_level_into_tracing() {
        assert_eq!(tracing::Level::from(&Level::WARN), tracing::Level::WARN);
    }
}
