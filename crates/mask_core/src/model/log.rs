use crate::error::AppError;
use crate::model::{Revision, RevisionId, Slot};
use serde::{Deserialize, Serialize};

/// Append-only arena of every revision across all tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionLog {
    slots: Vec<Slot<Revision>>,
}

impl RevisionLog {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Adds `revision` at the end; its id is the length before the push.
    pub fn append(&mut self, revision: Revision) -> RevisionId {
        let id = RevisionId(self.slots.len());
        self.slots.push(Slot::Live(revision));
        id
    }

    pub fn slot(&self, id: RevisionId) -> Option<&Slot<Revision>> {
        self.slots.get(id.0)
    }

    pub fn get(&self, id: RevisionId) -> Result<&Revision, AppError> {
        match self.slot(id) {
            Some(Slot::Live(revision)) => Ok(revision),
            Some(Slot::Tombstoned) => Err(AppError::deleted(format!("revision {id} was deleted"))),
            None => Err(AppError::out_of_range(format!(
                "revision {id} does not exist"
            ))),
        }
    }

    /// Tombstones the slot. The id is never handed out again.
    pub fn clear(&mut self, id: RevisionId) -> Result<(), AppError> {
        let slot = self
            .slots
            .get_mut(id.0)
            .ok_or_else(|| AppError::out_of_range(format!("revision {id} does not exist")))?;
        slot.clear();
        Ok(())
    }
}
