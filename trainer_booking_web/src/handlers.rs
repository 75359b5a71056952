use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};
use trainer_booking::domain::{
    schedule::{
        Appointment, AppointmentId, BusinessCalendar, Interval, NewAppointment, TrainerId, UserId,
    },
    Entity,
};

use crate::envelope::{ApiError, DataResponse};
use crate::params::{self, WindowQuery};
use crate::AppState;

/// 予約時間帯
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentTime {
    pub starts_at: String,
    pub ends_at: String,
}

impl AppointmentTime {
    pub fn new(calendar: &BusinessCalendar, time: &Interval) -> Self {
        Self {
            starts_at: calendar.format(time.start()),
            ends_at: calendar.format(time.end()),
        }
    }
}

/// 予約
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentView {
    pub id: AppointmentId,
    pub trainer_id: TrainerId,
    pub user_id: UserId,
    pub starts_at: String,
    pub ends_at: String,
}

impl AppointmentView {
    pub fn new(calendar: &BusinessCalendar, appointment: &Appointment) -> Self {
        let AppointmentTime { starts_at, ends_at } =
            AppointmentTime::new(calendar, appointment.time());
        Self {
            id: appointment.id(),
            trainer_id: appointment.trainer_id(),
            user_id: appointment.user_id(),
            starts_at,
            ends_at,
        }
    }
}

/// 予約登録の本体。IDは文字列でも数値でもよい
#[derive(Debug, Default, Deserialize)]
pub struct CreateAppointment {
    pub trainer_id: Option<Value>,
    pub user_id: Option<Value>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
}

type ApiResult<T> = Result<Json<DataResponse<T>>, ApiError>;

pub async fn index() -> Json<DataResponse<Value>> {
    DataResponse::success(json!({ "service": "trainer_booking" }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

#[instrument(skip(state))]
pub async fn trainer_appointments(
    State(state): State<AppState>,
    Path(trainer_id): Path<String>,
) -> ApiResult<Vec<AppointmentView>> {
    let trainer_id: TrainerId = params::parse_id("trainer_id", trainer_id.trim())?;
    let appointments = state.repository().find_by_trainer(trainer_id).await?;
    Ok(DataResponse::success(
        appointments
            .iter()
            .map(|a| AppointmentView::new(state.calendar(), a))
            .collect(),
    ))
}

/// 窓内の予約済み時間帯
#[instrument(skip_all)]
pub async fn scheduled_appointments(
    State(state): State<AppState>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Vec<AppointmentTime>> {
    let Query(query) = query.map_err(|_| ApiError::bad_request("invalid query string"))?;
    let window = params::parse_window(state.calendar(), state.max_window(), &query)?;
    let mut booked = state
        .repository()
        .fetch_booked_intervals(window.trainer_id, window.start, window.end)
        .await?
        .to_vec();
    booked.sort();
    Ok(DataResponse::success(
        booked
            .iter()
            .map(|t| AppointmentTime::new(state.calendar(), t))
            .collect(),
    ))
}

/// 窓内の空き枠
#[instrument(skip_all)]
pub async fn available_appointments(
    State(state): State<AppState>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Vec<AppointmentTime>> {
    let Query(query) = query.map_err(|_| ApiError::bad_request("invalid query string"))?;
    let window = params::parse_window(state.calendar(), state.max_window(), &query)?;
    let booked = state
        .repository()
        .fetch_booked_intervals(window.trainer_id, window.start, window.end)
        .await?;
    let open = state.scanner().scan(&booked, window.start, window.end);
    debug!(
        "空き枠を計算しました: trainer={} booked={} open={}",
        window.trainer_id,
        booked.len(),
        open.len()
    );
    Ok(DataResponse::success(
        open.iter()
            .map(|t| AppointmentTime::new(state.calendar(), t))
            .collect(),
    ))
}

#[instrument(skip_all)]
pub async fn create_appointment(
    State(state): State<AppState>,
    payload: Result<Json<CreateAppointment>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<AppointmentView>>), ApiError> {
    let Json(body) = payload.map_err(|e| {
        debug!("リクエスト本体を解釈できません: {}", e);
        ApiError::bad_request("request body must be a JSON object")
    })?;

    let trainer_id = params::field_text(&body.trainer_id);
    let user_id = params::field_text(&body.user_id);
    let trainer_id: TrainerId =
        params::parse_id("trainer_id", params::require("trainer_id", trainer_id.as_deref())?)?;
    let user_id: UserId =
        params::parse_id("user_id", params::require("user_id", user_id.as_deref())?)?;
    let starts_at = params::parse_timestamp(
        state.calendar(),
        "starts_at",
        params::require("starts_at", body.starts_at.as_deref())?,
    )?;
    let ends_at = params::parse_timestamp(
        state.calendar(),
        "ends_at",
        params::require("ends_at", body.ends_at.as_deref())?,
    )?;
    let time = Interval::new(starts_at, ends_at)
        .map_err(|_| ApiError::bad_request("ends_at must be after starts_at"))?;

    if let Err(reason) = state.calendar().validate_slot(&time) {
        info!("不正な予約時間: trainer={} 理由={}", trainer_id, reason);
        return Err(ApiError::bad_request("invalid appointment time"));
    }

    let repository = state.repository();
    let booked = repository
        .fetch_booked_intervals(trainer_id, time.start(), time.end())
        .await?;
    if !state
        .scanner()
        .scan(&booked, time.start(), time.end())
        .contains(&time)
    {
        info!("予約できない時間帯: trainer={}", trainer_id);
        return Err(ApiError::fail("appointment time is not available"));
    }
    // 走査から登録までの間に同じ枠が埋まった場合はここで弾く
    if repository.appointment_exists(trainer_id, &time).await? {
        info!("予約済みの時間帯: trainer={}", trainer_id);
        return Err(ApiError::fail("appointment is already booked"));
    }

    let new = NewAppointment {
        trainer_id,
        user_id,
        time,
    };
    let id = repository.insert_appointment(new.clone()).await?;
    info!("予約を受け付けました: trainer={} user={} id={}", trainer_id, user_id, id);
    Ok((
        StatusCode::CREATED,
        DataResponse::success(AppointmentView::new(
            state.calendar(),
            &Appointment::new(id, new),
        )),
    ))
}
