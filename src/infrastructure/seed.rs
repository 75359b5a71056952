//! 起動時に読み込むシードデータ
//!
//! `[{"trainer_id": 1, "user_id": 2, "starts_at": "...", "ends_at": "..."}]`
//! 形式のJSON。IDは数値でも文字列でもよい。

use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use thiserror::Error;
use tracing::info;

use crate::domain::schedule::{
    AppointmentRepository, Interval, IntervalError, NewAppointment, TrainerId, UserId,
};
use crate::domain::DataAccessError;

#[serde_as]
#[derive(Debug, Deserialize)]
struct SeedAppointment {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    trainer_id: TrainerId,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    user_id: UserId,
    #[serde(alias = "started_at")]
    starts_at: DateTime<FixedOffset>,
    #[serde(alias = "ended_at")]
    ends_at: DateTime<FixedOffset>,
}

impl TryFrom<SeedAppointment> for NewAppointment {
    type Error = IntervalError;

    fn try_from(value: SeedAppointment) -> Result<Self, Self::Error> {
        Ok(NewAppointment {
            trainer_id: value.trainer_id,
            user_id: value.user_id,
            time: Interval::new(
                value.starts_at.with_timezone(&Utc),
                value.ends_at.with_timezone(&Utc),
            )?,
        })
    }
}

/// シードデータの読み込みエラー
#[derive(Error, Debug)]
pub enum SeedError {
    /// ファイルを読めません
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    /// JSONとして解釈できません
    #[error("Malformed seed data: {0}")]
    Json(#[from] serde_json::Error),
    /// 予約時間が不正です
    #[error("Seed record #{index} has an invalid time range: {source}")]
    InvalidInterval {
        index: usize,
        source: IntervalError,
    },
    /// 登録に失敗しました
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
}

pub fn parse_seed(json: &str) -> Result<Vec<NewAppointment>, SeedError> {
    serde_json::from_str::<Vec<SeedAppointment>>(json)?
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            NewAppointment::try_from(record)
                .map_err(|source| SeedError::InvalidInterval { index, source })
        })
        .collect()
}

/// シードファイルを読み込んでリポジトリに登録し、登録件数を返す
pub async fn load_seed<R>(repository: &R, path: impl AsRef<Path>) -> Result<usize, SeedError>
where
    R: AppointmentRepository + ?Sized,
{
    let path = path.as_ref();
    let appointments = parse_seed(&tokio::fs::read_to_string(path).await?)?;
    let count = appointments.len();
    for appointment in appointments {
        repository.insert_appointment(appointment).await?;
    }
    info!("シードデータを読み込みました: {} 件 ({})", count, path.display());
    Ok(count)
}
