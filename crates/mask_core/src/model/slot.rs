use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Stable position of a task in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub usize);

/// Stable position of a revision in the global log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One arena entry. Deleting clears the content but keeps the index occupied,
/// so every other id stays valid.
///
/// On disk a tombstone is the empty object `{}`; a live slot is the record
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Live(T),
    Tombstoned,
}

impl<T> Slot<T> {
    pub fn live(&self) -> Option<&T> {
        match self {
            Self::Live(value) => Some(value),
            Self::Tombstoned => None,
        }
    }

    pub fn is_tombstoned(&self) -> bool {
        matches!(self, Self::Tombstoned)
    }

    pub fn clear(&mut self) {
        *self = Self::Tombstoned;
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Tombstone {}

#[derive(Deserialize)]
#[serde(untagged)]
enum SlotRecord<T> {
    Tombstoned(Tombstone),
    Live(T),
}

impl<T: Serialize> Serialize for Slot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Live(value) => value.serialize(serializer),
            Self::Tombstoned => Tombstone {}.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Slot<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match SlotRecord::deserialize(deserializer)? {
            SlotRecord::Tombstoned(_) => Self::Tombstoned,
            SlotRecord::Live(value) => Self::Live(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Slot, TaskId};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Record {
        label: String,
    }

    #[test]
    fn tombstone_serializes_as_empty_object() {
        let slot: Slot<Record> = Slot::Tombstoned;
        assert_eq!(serde_json::to_string(&slot).unwrap(), "{}");
    }

    #[test]
    fn empty_object_reads_back_as_tombstone() {
        let slot: Slot<Record> = serde_json::from_str("{}").unwrap();
        assert!(slot.is_tombstoned());
    }

    #[test]
    fn live_record_keeps_its_fields() {
        let slot: Slot<Record> = serde_json::from_str(r#"{"label":"demo"}"#).unwrap();
        assert_eq!(
            slot.live(),
            Some(&Record {
                label: "demo".to_string()
            })
        );
    }

    #[test]
    fn clear_tombstones_a_live_slot() {
        let mut slot = Slot::Live(TaskId(3));
        slot.clear();
        assert!(slot.is_tombstoned());
        assert!(slot.live().is_none());
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        assert_eq!(serde_json::to_string(&vec![TaskId(0), TaskId(4)]).unwrap(), "[0,4]");
    }
}
