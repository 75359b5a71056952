use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::schedule::{
    Appointment, AppointmentId, AppointmentRepository, BookedSet, Interval, NewAppointment,
    TrainerAgenda, TrainerId,
};
use crate::domain::{Aggregation, DataAccessError};

/// プロセス内に予約を保持するリポジトリ。IDは1からの連番
#[derive(Debug)]
pub struct InMemoryAppointmentRepository {
    agendas: RwLock<HashMap<TrainerId, TrainerAgenda>>,
    next_id: AtomicU64,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self {
            agendas: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryAppointmentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn find_by_trainer(
        &self,
        trainer_id: TrainerId,
    ) -> Result<Vec<Appointment>, DataAccessError> {
        let agendas = self.agendas.read().await;
        Ok(agendas
            .get(&trainer_id)
            .map(TrainerAgenda::appointments)
            .unwrap_or_default())
    }

    async fn fetch_booked_intervals(
        &self,
        trainer_id: TrainerId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<BookedSet, DataAccessError> {
        let agendas = self.agendas.read().await;
        Ok(agendas
            .get(&trainer_id)
            .map(|agenda| agenda.booked_within(window_start, window_end))
            .unwrap_or_default())
    }

    async fn appointment_exists(
        &self,
        trainer_id: TrainerId,
        time: &Interval,
    ) -> Result<bool, DataAccessError> {
        let agendas = self.agendas.read().await;
        Ok(agendas
            .get(&trainer_id)
            .map_or(false, |agenda| agenda.is_booked(time)))
    }

    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<AppointmentId, DataAccessError> {
        let mut agendas = self.agendas.write().await;
        let trainer_id = appointment.trainer_id;
        let agenda = agendas
            .entry(trainer_id)
            .or_insert_with(|| TrainerAgenda::open(trainer_id));
        let id = AppointmentId::from(self.next_id.fetch_add(1, Ordering::SeqCst));
        agenda
            .book(Appointment::new(id, appointment))
            .map_err(|e| DataAccessError::WriteError(Box::new(e)))?;
        agenda.clear();
        debug!("予約を登録しました: trainer={} id={}", trainer_id, id);
        Ok(id)
    }
}
