use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventstore::{AppendToStreamOptions, Client, EventData, ExpectedRevision, ResolvedEvent};
use tracing::debug;

use crate::domain::schedule::{
    AgendaEvent, Appointment, AppointmentId, AppointmentRepository, BookedSet, Interval,
    NewAppointment, TrainerAgenda, TrainerId,
};
use crate::domain::{Aggregation, DataAccessError, Entity, ID_GENERATOR};
use crate::infrastructure::{stream_name, EventConvertError};
use crate::infrastructure::{from_event, try_from_resolved_event};

/// トレーナーごとのストリームに予約イベントを積むリポジトリ
#[derive(Clone)]
pub struct EventStoreAppointmentRepository {
    client: Client,
}

impl EventStoreAppointmentRepository {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn find_agenda(&self, id: TrainerId) -> Result<TrainerAgenda, DataAccessError> {
        let mut entity = TrainerAgenda::open(id);
        match self
            .client
            .read_stream(stream_name::<TrainerAgenda>(id), &Default::default())
            .await
        {
            Ok(mut stream) => loop {
                match stream.next().await {
                    Ok(Some(e)) => entity.apply(TryFrom::try_from(&e)?),
                    Ok(_) => break,
                    Err(eventstore::Error::ResourceDeleted) => break,
                    Err(eventstore::Error::ResourceNotFound) => break,
                    Err(e) => return Err(e.into()),
                }
            },
            Err(eventstore::Error::ResourceNotFound) => {}
            Err(e) => return Err(e.into()),
        }
        entity.clear();
        Ok(entity)
    }

    async fn save(&self, entity: &mut TrainerAgenda) -> Result<bool, DataAccessError> {
        if entity.peek().is_none() {
            return Ok(false);
        }
        let events = entity
            .pop_all()
            .into_iter()
            .map(EventData::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        self.client
            .append_to_stream(
                stream_name::<TrainerAgenda>(entity.id()),
                &AppendToStreamOptions::default().expected_revision(ExpectedRevision::Any),
                events,
            )
            .await?;
        Ok(true)
    }
}

#[async_trait]
impl AppointmentRepository for EventStoreAppointmentRepository {
    async fn find_by_trainer(
        &self,
        trainer_id: TrainerId,
    ) -> Result<Vec<Appointment>, DataAccessError> {
        Ok(self.find_agenda(trainer_id).await?.appointments())
    }

    async fn fetch_booked_intervals(
        &self,
        trainer_id: TrainerId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<BookedSet, DataAccessError> {
        Ok(self
            .find_agenda(trainer_id)
            .await?
            .booked_within(window_start, window_end))
    }

    async fn appointment_exists(
        &self,
        trainer_id: TrainerId,
        time: &Interval,
    ) -> Result<bool, DataAccessError> {
        Ok(self.find_agenda(trainer_id).await?.is_booked(time))
    }

    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<AppointmentId, DataAccessError> {
        let trainer_id = appointment.trainer_id;
        let mut agenda = self.find_agenda(trainer_id).await?;
        let id: AppointmentId = ID_GENERATOR.generate().await?;
        agenda
            .book(Appointment::new(id, appointment))
            .map_err(|e| DataAccessError::WriteError(Box::new(e)))?;
        self.save(&mut agenda).await?;
        debug!("予約イベントを保存しました: trainer={} id={}", trainer_id, id);
        Ok(id)
    }
}

impl TryFrom<AgendaEvent> for EventData {
    type Error = EventConvertError;

    fn try_from(value: AgendaEvent) -> Result<Self, Self::Error> {
        from_event(value)
    }
}

impl TryFrom<&ResolvedEvent> for AgendaEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        try_from_resolved_event(value)
    }
}
