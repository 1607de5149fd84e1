use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Position of a party on the three-party ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyID {
    ID0 = 0,
    ID1 = 1,
    ID2 = 2,
}

impl PartyID {
    pub const ALL: [PartyID; 3] = [PartyID::ID0, PartyID::ID1, PartyID::ID2];

    pub fn next_id(self) -> Self {
        Self::ALL[(self as usize + 1) % 3]
    }

    pub fn prev_id(self) -> Self {
        Self::ALL[(self as usize + 2) % 3]
    }
}

impl TryFrom<usize> for PartyID {
    type Error = Error;

    fn try_from(other: usize) -> Result<Self, Self::Error> {
        Self::ALL.get(other).copied().ok_or(Error::IdError(other))
    }
}

impl From<PartyID> for usize {
    #[inline(always)]
    fn from(other: PartyID) -> Self {
        other as usize
    }
}

impl std::fmt::Display for PartyID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", *self as usize)
    }
}
