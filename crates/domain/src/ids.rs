use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row identifiers issued by the hosted backend (integer primary keys).
macro_rules! define_row_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

/// Identifiers minted by us (auth users, in-engine session handles).
macro_rules! define_uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

// Content rows
define_row_id!(StoryId);
define_row_id!(StepId);
define_row_id!(ResourceId);
define_row_id!(RewardId);
define_row_id!(CharacterId);
define_row_id!(LocationId);

// Players and live sessions
define_uuid_id!(UserId);
define_uuid_id!(PlaySessionId);
define_uuid_id!(PaintSessionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_ids_serialize_as_bare_integers() {
        let id = StepId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: StepId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(PlaySessionId::new(), PlaySessionId::new());
    }
}
