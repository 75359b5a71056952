pub mod schedule;

use once_cell::sync;
use serde::{Deserialize, Serialize};
use snowflake::SnowflakeIdGenerator;
use std::{
    collections::VecDeque,
    error::Error,
    fmt::{Debug, Display},
    ops::Deref,
    str::FromStr,
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

pub trait Id:
    Copy
    + Eq
    + Deref<Target = Self::Inner>
    + From<Self::Inner>
    + Display
    + Debug
    + Serialize
    + for<'de> Deserialize<'de>
{
    type Inner: FromStr;
}

pub trait Event: Clone + Eq + Debug + Serialize + for<'a> Deserialize<'a> {
    type Id;
}

pub trait Entity {
    type Id: Id;

    const ENTITY_NAME: &'static str;

    fn id(&self) -> Self::Id;
}

/// イベントを発行する集約
pub trait Aggregation: Entity {
    type Event: Event<Id = Self::Id>;
    type Error: Error;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error>;
    fn apply(&mut self, event: Self::Event);
    fn events(&self) -> &EventQueue<Self::Event>;
    fn events_mut(&mut self) -> &mut EventQueue<Self::Event>;
    fn pop(&mut self) -> Option<Self::Event> {
        self.events_mut().pop()
    }
    fn pop_all(&mut self) -> Vec<Self::Event> {
        let mut events = Vec::new();
        while let Some(e) = self.pop() {
            events.push(e);
        }
        events
    }
    fn clear(&mut self) {
        self.events_mut().clear()
    }
    fn peek(&self) -> Option<&Self::Event> {
        self.events().peek()
    }
}

type BoxedError = Box<dyn Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum DataAccessError {
    #[error("Database connection error: {0}")]
    ConnectionError(BoxedError),
    #[error("Database query error: {0}")]
    QueryError(BoxedError),
    #[error("Data read error: {0}")]
    ReadError(BoxedError),
    #[error("Data write error: {0}")]
    WriteError(BoxedError),
    #[error("Client side error: {0}")]
    ClientSideError(BoxedError),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventQueue<T> {
    queue: VecDeque<T>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
    pub fn peek(&self) -> Option<&T> {
        self.queue.front()
    }
    pub fn push(&mut self, value: T) {
        self.queue.push_back(value)
    }
    pub fn pop(&mut self) -> Option<T> {
        self.queue.pop_front()
    }
    pub fn clear(&mut self) {
        self.queue.clear()
    }
    pub fn len(&self) -> usize {
        self.queue.len()
    }
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> IntoIterator for EventQueue<T> {
    type Item = T;
    type IntoIter = std::collections::vec_deque::IntoIter<T>;
    fn into_iter(self) -> Self::IntoIter {
        self.queue.into_iter()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct IdGenerator(SnowflakeIdGenerator);

impl IdGenerator {
    pub fn new(gen: SnowflakeIdGenerator) -> Self {
        Self(gen)
    }

    pub fn generate(&mut self) -> u64 {
        self.0.generate() as u64
    }
}

impl From<SnowflakeIdGenerator> for IdGenerator {
    fn from(value: SnowflakeIdGenerator) -> Self {
        Self::new(value)
    }
}

/// ID採番タスク。tokioランタイム上で初めて参照されたときに起動する
pub static ID_GENERATOR: sync::Lazy<IdGeneratorTask> =
    sync::Lazy::new(|| IdGeneratorTask::spawn(SnowflakeIdGenerator::new(1, 1).into()));

#[derive(Error, Debug)]
#[error("Id generator task is not running")]
pub struct IdGeneratorError;

impl From<IdGeneratorError> for DataAccessError {
    fn from(value: IdGeneratorError) -> Self {
        DataAccessError::ClientSideError(Box::new(value))
    }
}

#[derive(Clone)]
pub struct IdGeneratorTask {
    _handle: Arc<JoinHandle<()>>,
    sender: mpsc::Sender<oneshot::Sender<u64>>,
}

impl IdGeneratorTask {
    pub fn spawn(mut gen: IdGenerator) -> Self {
        let (tx_async, mut rx_async) = mpsc::channel::<oneshot::Sender<u64>>(100);
        let handle = tokio::spawn(async move {
            while let Some(tx) = rx_async.recv().await {
                // 要求側が既に諦めていれば捨てる
                let _ = tx.send(gen.generate());
            }
        });
        Self {
            _handle: Arc::new(handle),
            sender: tx_async,
        }
    }

    pub async fn generate<T>(&self) -> Result<T, IdGeneratorError>
    where
        T: From<u64>,
    {
        let (tx, rx) = oneshot::channel::<u64>();
        self.sender.send(tx).await.map_err(|_| IdGeneratorError)?;
        rx.await.map(T::from).map_err(|_| IdGeneratorError)
    }
}
