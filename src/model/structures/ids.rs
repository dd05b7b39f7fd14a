use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// start.gg hands out `ID` scalars as JSON numbers on some fields and as
/// strings on others, so every id accepts both.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    String(String)
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match RawId::deserialize(deserializer)? {
                    RawId::Number(n) => Ok($name(n)),
                    RawId::String(s) => s.trim().parse().map($name).map_err(de::Error::custom)
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                $name(id)
            }
        }
    };
}

numeric_id!(
    /// Platform-wide player identity, stable across tournaments.
    PlayerId
);
numeric_id!(
    /// Event-scoped registration id. Never interchangeable with a [`PlayerId`].
    EntrantId
);
numeric_id!(EventId);
numeric_id!(VideogameId);

/// Set ids are opaque: finished sets are numeric but preview sets are
/// strings such as `preview_123_0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SetId(pub String);

impl<'de> Deserialize<'de> for SetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => SetId(n.to_string()),
            RawId::String(s) => SetId(s)
        })
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SetId {
    fn from(id: &str) -> Self {
        SetId(id.to_string())
    }
}
