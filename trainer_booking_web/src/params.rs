//! リクエストパラメータの解釈。ここで文字列を `DateTime<Utc>` やIDに変換し、
//! それより内側には文字列の時刻を渡さない。

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use trainer_booking::domain::schedule::{BusinessCalendar, TrainerId};

use crate::envelope::ApiError;

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%:z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// `trainer_id` / `starts_at` / `ends_at` を取るクエリ
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub trainer_id: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub trainer_id: TrainerId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub fn require<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(format!("{} is required", name))),
    }
}

/// JSON本体の値を文字列として取り出す。数値もそのまま受け付ける
pub fn field_text(value: &Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

pub fn parse_id<T: From<u64>>(name: &str, value: &str) -> Result<T, ApiError> {
    value
        .parse::<u64>()
        .map(T::from)
        .map_err(|_| ApiError::bad_request(format!("{} must be an unsigned integer", name)))
}

/// 時刻を解釈する。オフセットのない時刻は営業タイムゾーンとみなす
pub fn parse_timestamp(
    calendar: &BusinessCalendar,
    name: &str,
    value: &str,
) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(t) = DateTime::parse_from_str(value, format) {
            return Ok(t.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(calendar.at(t.date(), t.time()));
        }
    }
    Err(ApiError::bad_request(format!(
        "{} must be an RFC 3339 timestamp",
        name
    )))
}

/// 必須パラメータをすべて確認してから値を解釈する
///
/// `max_window` より長い期間は検索させない。
pub fn parse_window(
    calendar: &BusinessCalendar,
    max_window: Duration,
    query: &WindowQuery,
) -> Result<Window, ApiError> {
    let trainer_id = require("trainer_id", query.trainer_id.as_deref())?;
    let starts_at = require("starts_at", query.starts_at.as_deref())?;
    let ends_at = require("ends_at", query.ends_at.as_deref())?;

    let window = Window {
        trainer_id: parse_id("trainer_id", trainer_id)?,
        start: parse_timestamp(calendar, "starts_at", starts_at)?,
        end: parse_timestamp(calendar, "ends_at", ends_at)?,
    };
    if window.end < window.start {
        return Err(ApiError::bad_request("ends_at must not be before starts_at"));
    }
    if window.end - window.start > max_window {
        return Err(ApiError::bad_request(format!(
            "window must not exceed {} days",
            max_window.num_days()
        )));
    }
    Ok(window)
}
