use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, num::ParseIntError, str::FromStr};
use time::OffsetDateTime;

/// Identifier of a task: the Unix nanosecond timestamp of its creation.
///
/// Ids are monotonically increasing in practice, which makes ascending-id
/// iteration equivalent to creation order. On the wire an id is a decimal
/// string so it can key JSON maps; [`FromStr`] is the inverse codec.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Derive a fresh task identifier from a creation timestamp.
    #[must_use]
    pub fn from_timestamp(ts: OffsetDateTime) -> Self {
        Self(u64::try_from(ts.unix_timestamp_nanos()).unwrap_or_default())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl Serialize for TaskId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of a journal entry: the Unix timestamp of UTC midnight on
/// the entry's day. Shares the decimal-string wire codec with [`TaskId`].
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct EntryId(pub u64);

impl EntryId {
    /// Identifier of the entry covering the day `ts` falls on.
    #[must_use]
    pub fn for_day(ts: OffsetDateTime) -> Self {
        let midnight = crate::calendar::start_of_day(ts);
        Self(u64::try_from(midnight.unix_timestamp()).unwrap_or_default())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EntryId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl Serialize for EntryId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use time::macros::datetime;

    #[test]
    fn task_ids_follow_creation_order() {
        let earlier = TaskId::from_timestamp(datetime!(2024-01-15 09:00 UTC));
        let later = TaskId::from_timestamp(datetime!(2024-01-15 09:00:01 UTC));
        assert!(earlier < later);
    }

    #[test]
    fn task_id_string_roundtrip() {
        let id = TaskId(1_705_309_200_000_000_000);
        let parsed: TaskId = id.to_string().parse().unwrap_or_else(|err| {
            panic!("task id must parse: {err}");
        });
        assert_eq!(parsed, id);
    }

    #[test]
    fn entry_id_is_midnight_of_the_day() {
        let morning = EntryId::for_day(datetime!(2024-01-15 09:30 UTC));
        let evening = EntryId::for_day(datetime!(2024-01-15 23:59 UTC));
        let next_day = EntryId::for_day(datetime!(2024-01-16 00:00 UTC));
        assert_eq!(morning, evening);
        assert!(morning < next_day);
    }

    #[test]
    fn ids_key_json_maps_as_strings() {
        let mut map = BTreeMap::new();
        map.insert(TaskId(42), "answer");
        let encoded = serde_json::to_string(&map).unwrap_or_else(|err| {
            panic!("map must encode: {err}");
        });
        assert_eq!(encoded, r#"{"42":"answer"}"#);

        let decoded: BTreeMap<TaskId, String> =
            serde_json::from_str(&encoded).unwrap_or_else(|err| {
                panic!("map must decode: {err}");
            });
        assert_eq!(decoded.get(&TaskId(42)).map(String::as_str), Some("answer"));
    }

    #[test]
    fn non_numeric_task_id_is_rejected() {
        let result: Result<TaskId, _> = serde_json::from_str(r#""not-a-number""#);
        assert!(result.is_err());
    }
}
