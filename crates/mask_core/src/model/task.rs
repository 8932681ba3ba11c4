use crate::model::RevisionId;
use serde::{Deserialize, Serialize};

/// A logical task: its revision ids, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub revs: Vec<RevisionId>,
}

impl Task {
    pub fn new(first: RevisionId) -> Self {
        Self { revs: vec![first] }
    }

    pub fn latest(&self) -> Option<RevisionId> {
        self.revs.last().copied()
    }
}
