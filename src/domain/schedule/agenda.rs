use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::{Deref, Display, Error, From, FromStr};
use serde::{Deserialize, Serialize};

use crate::domain::{Aggregation, DataAccessError, Entity, Event, EventQueue, Id};

use super::{BookedSet, Interval, TrainerId, UserId};

/// 予約のリポジトリトレイト
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// トレーナーの予約をすべて開始時刻順に取得する
    async fn find_by_trainer(
        &self,
        trainer_id: TrainerId,
    ) -> Result<Vec<Appointment>, DataAccessError>;
    /// 窓 `[window_start, window_end)` に重なる予約済み区間を取得する
    async fn fetch_booked_intervals(
        &self,
        trainer_id: TrainerId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<BookedSet, DataAccessError>;
    /// 同じ区間の予約が既にあるか
    async fn appointment_exists(
        &self,
        trainer_id: TrainerId,
        time: &Interval,
    ) -> Result<bool, DataAccessError>;
    /// 予約を登録し、採番したIDを返す
    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<AppointmentId, DataAccessError>;
}

/// 予約ID
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    FromStr,
    Deref,
    Default,
)]
pub struct AppointmentId(u64);

impl Id for AppointmentId {
    type Inner = u64;
}

/// 予約
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    id: AppointmentId,
    trainer_id: TrainerId,
    user_id: UserId,
    time: Interval,
}

impl Appointment {
    pub fn new(id: AppointmentId, appointment: NewAppointment) -> Self {
        Self {
            id,
            trainer_id: appointment.trainer_id,
            user_id: appointment.user_id,
            time: appointment.time,
        }
    }

    pub fn trainer_id(&self) -> TrainerId {
        self.trainer_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn time(&self) -> &Interval {
        &self.time
    }
}

impl Entity for Appointment {
    type Id = AppointmentId;

    const ENTITY_NAME: &'static str = "appointment";

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// 登録前の予約
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAppointment {
    pub trainer_id: TrainerId,
    pub user_id: UserId,
    pub time: Interval,
}

/// 予約表のイベント
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgendaEvent {
    /// 予約が登録された
    AppointmentBooked {
        id: TrainerId,
        appointment: Appointment,
    },
}

impl Event for AgendaEvent {
    type Id = TrainerId;
}

/// トレーナー1人分の予約表
#[derive(Debug, Clone, Default)]
pub struct TrainerAgenda {
    id: TrainerId,
    appointments: Vec<Appointment>,
    events: EventQueue<AgendaEvent>,
}

impl TrainerAgenda {
    pub fn open(id: TrainerId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn book(&mut self, appointment: Appointment) -> Result<(), AgendaError> {
        self.validate_booked(&appointment)?;
        self.appointments.push(appointment.clone());
        self.events.push(AgendaEvent::AppointmentBooked {
            id: self.id,
            appointment,
        });
        Ok(())
    }

    /// 開始時刻順の予約一覧
    pub fn appointments(&self) -> Vec<Appointment> {
        let mut appointments = self.appointments.clone();
        appointments.sort_by_key(|a| (a.time.start(), a.id.0));
        appointments
    }

    pub fn booked_within(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> BookedSet {
        self.appointments
            .iter()
            .map(|a| a.time)
            .filter(|t| t.start() < window_end && window_start < t.end())
            .collect()
    }

    pub fn is_booked(&self, time: &Interval) -> bool {
        self.appointments.iter().any(|a| a.time == *time)
    }

    fn validate_id(&self, id: &TrainerId) -> Result<(), AgendaError> {
        match self.id == *id {
            true => Ok(()),
            false => Err(AgendaError::MismatchedId),
        }
    }

    fn validate_booked(&self, appointment: &Appointment) -> Result<(), AgendaError> {
        self.validate_id(&appointment.trainer_id)?;
        if self.appointments.iter().any(|a| a.id == appointment.id) {
            return Err(AgendaError::DuplicateAppointment);
        }
        if self.is_booked(&appointment.time) {
            return Err(AgendaError::AlreadyBooked);
        }
        Ok(())
    }
}

impl Entity for TrainerAgenda {
    type Id = TrainerId;

    const ENTITY_NAME: &'static str = "trainer_agenda";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for TrainerAgenda {
    type Event = AgendaEvent;
    type Error = AgendaError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            AgendaEvent::AppointmentBooked { id, appointment } => {
                self.validate_id(id)?;
                self.validate_booked(appointment)
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            AgendaEvent::AppointmentBooked { id, appointment } => {
                if self.appointments.is_empty() && self.id != id {
                    self.id = id;
                }
                if let Err(_e) = self.book(appointment) {}
            }
        }
    }

    fn events(&self) -> &EventQueue<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventQueue<Self::Event> {
        &mut self.events
    }
}

/// 予約表エラー
#[derive(Error, Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgendaError {
    /// IDが一致しません
    #[display(fmt = "Mismatched id")]
    MismatchedId,
    /// 予約IDが重複しています
    #[display(fmt = "The appointment already exists in the agenda")]
    DuplicateAppointment,
    /// 同じ時間帯が予約済みです
    #[display(fmt = "The time is already booked")]
    AlreadyBooked,
}
