mod agenda;
mod memory;
pub mod seed;

use eventstore::{EventData, ResolvedEvent};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::domain::{DataAccessError, Entity, Event, Id};

use std::{fmt::Display, str::FromStr};

pub use self::agenda::*;
pub use self::memory::*;

impl From<eventstore::Error> for DataAccessError {
    fn from(value: eventstore::Error) -> Self {
        match value {
            eventstore::Error::ConnectionClosed
            | eventstore::Error::Grpc { .. }
            | eventstore::Error::GrpcConnectionError(_)
            | eventstore::Error::DeadlineExceeded
            | eventstore::Error::InitializationError(_) => Self::ConnectionError(Box::new(value)),
            eventstore::Error::ResourceNotFound | eventstore::Error::ResourceDeleted => {
                Self::ReadError(Box::new(value))
            }
            eventstore::Error::ResourceAlreadyExists
            | eventstore::Error::WrongExpectedVersion { .. } => Self::WriteError(Box::new(value)),
            eventstore::Error::IllegalStateError(_) => Self::ClientSideError(Box::new(value)),
            _ => Self::QueryError(Box::new(value)),
        }
    }
}

impl From<EventConvertError> for DataAccessError {
    fn from(value: EventConvertError) -> Self {
        DataAccessError::ClientSideError(Box::new(value))
    }
}

#[derive(Debug)]
pub struct EventConvertError;

impl std::error::Error for EventConvertError {}

impl Display for EventConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to convert event")
    }
}

impl From<serde_json::Error> for EventConvertError {
    fn from(_value: serde_json::Error) -> Self {
        EventConvertError
    }
}

fn entity_id<I, T>(stream_id: &str) -> Option<I>
where
    I: Id<Inner = T>,
    T: FromStr,
{
    stream_id
        .split('-')
        .filter_map(|s| s.parse::<T>().ok())
        .map(I::from)
        .last()
}

fn stream_name<E: Entity>(id: E::Id) -> String {
    E::ENTITY_NAME.to_owned() + "-" + &id.to_string()
}

/// イベントを種別名と本体に分ける。IDはストリーム名が持つので本体から除く
fn event_payload<E: Event>(event: E) -> Result<(String, Value), EventConvertError> {
    let root = serde_json::to_value(event)?;
    let (event_type, data) = root
        .as_object()
        .and_then(|o| o.iter().next())
        .ok_or(EventConvertError)?;
    let mut data = data.clone();
    data.as_object_mut().ok_or(EventConvertError)?.remove("id");
    Ok((event_type.clone(), data))
}

fn event_from_payload<E, I>(stream_id: &str, event_type: &str, data: &[u8]) -> Result<E, EventConvertError>
where
    E: DeserializeOwned + Event<Id = I>,
    I: Id,
{
    let id = entity_id::<I, I::Inner>(stream_id).ok_or(EventConvertError)?;
    let mut data: Value = serde_json::from_slice(data)?;
    data.as_object_mut()
        .ok_or(EventConvertError)?
        .insert("id".to_owned(), json!(id));
    let json = json!({ event_type: data });
    Ok(serde_json::from_value(json)?)
}

fn from_event<E: Event>(event: E) -> Result<EventData, EventConvertError> {
    let (event_type, data) = event_payload(event)?;
    Ok(EventData::json(event_type, data)?)
}

fn try_from_resolved_event<E, I>(value: &ResolvedEvent) -> Result<E, EventConvertError>
where
    E: DeserializeOwned + Event<Id = I>,
    I: Id,
{
    let event = value.get_original_event();
    event_from_payload(&event.stream_id, &event.event_type, event.data.as_ref())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    use crate::domain::schedule::{
        AgendaEvent, Appointment, Interval, NewAppointment, TrainerAgenda, TrainerId,
    };

    use super::*;

    fn booked_event() -> AgendaEvent {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        AgendaEvent::AppointmentBooked {
            id: 12.into(),
            appointment: Appointment::new(
                99.into(),
                NewAppointment {
                    trainer_id: 12.into(),
                    user_id: 3.into(),
                    time: Interval::starting_at(start, Duration::minutes(30)).unwrap(),
                },
            ),
        }
    }

    fn booked_payload() -> Value {
        json!({
            "appointment": {
                "id": 99,
                "trainer_id": 12,
                "user_id": 3,
                "time": {
                    "start": "2024-01-02T09:00:00Z",
                    "end": "2024-01-02T09:30:00Z",
                }
            }
        })
    }

    #[test]
    fn test_stream_name() {
        assert_eq!(
            stream_name::<TrainerAgenda>(TrainerId::from(12)),
            "trainer_agenda-12"
        );
        assert_eq!(
            entity_id::<TrainerId, u64>("trainer_agenda-12"),
            Some(TrainerId::from(12))
        );
    }

    #[test]
    fn test_event_payload() {
        let (event_type, data) = event_payload(booked_event()).unwrap();
        assert_eq!(event_type, "AppointmentBooked");
        assert_eq!(data, booked_payload());
    }

    #[test]
    fn test_event_from_payload() {
        let data = serde_json::to_vec(&booked_payload()).unwrap();
        let event = event_from_payload::<AgendaEvent, TrainerId>(
            "trainer_agenda-12",
            "AppointmentBooked",
            &data,
        );
        assert_eq!(event.ok(), Some(booked_event()));
    }

    #[test]
    fn test_event_from_payload_rejects_bad_stream() {
        let data = serde_json::to_vec(&booked_payload()).unwrap();
        let event =
            event_from_payload::<AgendaEvent, TrainerId>("trainer_agenda", "AppointmentBooked", &data);
        assert!(event.is_err());
    }
}
