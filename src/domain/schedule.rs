mod agenda;
mod availability;
mod calendar;
mod interval;
mod slot;

use derive_more::{Deref, Display, From, FromStr};
use serde::{Deserialize, Serialize};

use crate::domain::Id;

pub use self::agenda::*;
pub use self::availability::*;
pub use self::calendar::*;
pub use self::interval::*;
pub use self::slot::*;

/// トレーナーID
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    FromStr,
    Deref,
    Default,
)]
pub struct TrainerId(u64);

impl Id for TrainerId {
    type Inner = u64;
}

/// 利用者ID
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    FromStr,
    Deref,
    Default,
)]
pub struct UserId(u64);

impl Id for UserId {
    type Inner = u64;
}
