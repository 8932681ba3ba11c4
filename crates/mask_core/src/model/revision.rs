use crate::model::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One immutable version of a task's editable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RevisionRecord")]
pub struct Revision {
    pub name: Option<String>,
    pub after: Vec<TaskId>,
    pub before: Vec<TaskId>,
    pub due: Option<String>,
    pub created: String,
}

// Older stores wrote the display text under `task` on creation and under
// `name` on edits, so a copied revision can carry both.
#[derive(Deserialize)]
struct RevisionRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    after: Vec<TaskId>,
    #[serde(default)]
    before: Vec<TaskId>,
    #[serde(default)]
    due: Option<String>,
    created: String,
}

impl From<RevisionRecord> for Revision {
    fn from(record: RevisionRecord) -> Self {
        Self {
            name: record.name.or(record.task),
            after: record.after,
            before: record.before,
            due: record.due,
            created: record.created,
        }
    }
}

impl Revision {
    pub fn dependencies(&self, which: DependencySet) -> &[TaskId] {
        match which {
            DependencySet::After => &self.after,
            DependencySet::Before => &self.before,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencySet {
    After,
    Before,
}

impl fmt::Display for DependencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::After => f.write_str("after"),
            Self::Before => f.write_str("before"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DueUpdate {
    #[default]
    Keep,
    Set(String),
    Clear,
}

/// Field changes applied on top of a task's latest revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionUpdate {
    pub name: Option<String>,
    pub add_after: Vec<TaskId>,
    pub add_before: Vec<TaskId>,
    pub remove_after: Vec<TaskId>,
    pub remove_before: Vec<TaskId>,
    pub due: DueUpdate,
}

impl RevisionUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.add_after.is_empty()
            && self.add_before.is_empty()
            && self.remove_after.is_empty()
            && self.remove_before.is_empty()
            && self.due == DueUpdate::Keep
    }

    /// Entries scheduled for removal from `which`.
    pub fn removals(&self, which: DependencySet) -> &[TaskId] {
        match which {
            DependencySet::After => &self.remove_after,
            DependencySet::Before => &self.remove_before,
        }
    }
}

/// Clone-then-mutate construction of the next revision in a chain.
///
/// Starts from a copy of the latest revision; `stamp` finishes it with the
/// creation time of the new revision.
#[derive(Debug, Clone)]
pub struct RevisionBuilder {
    revision: Revision,
}

impl RevisionBuilder {
    pub fn from_latest(latest: &Revision) -> Self {
        Self {
            revision: latest.clone(),
        }
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.revision.name = Some(name.into());
        self
    }

    pub fn add_dependencies(mut self, which: DependencySet, ids: &[TaskId]) -> Self {
        let target = match which {
            DependencySet::After => &mut self.revision.after,
            DependencySet::Before => &mut self.revision.before,
        };
        target.extend_from_slice(ids);
        self
    }

    /// Drops every occurrence of `entry` from the chosen set.
    pub fn remove_dependency(mut self, which: DependencySet, entry: TaskId) -> Self {
        let target = match which {
            DependencySet::After => &mut self.revision.after,
            DependencySet::Before => &mut self.revision.before,
        };
        target.retain(|id| *id != entry);
        self
    }

    pub fn set_due(mut self, due: impl Into<String>) -> Self {
        self.revision.due = Some(due.into());
        self
    }

    pub fn clear_due(mut self) -> Self {
        self.revision.due = None;
        self
    }

    /// Applies `update`: removals run before additions, so an id that is both
    /// removed and added ends up once at the end of the set.
    pub fn apply(self, update: &RevisionUpdate) -> Self {
        let mut builder = match update.name.as_deref() {
            Some(name) => self.rename(name),
            None => self,
        };
        for which in [DependencySet::After, DependencySet::Before] {
            for entry in update.removals(which) {
                builder = builder.remove_dependency(which, *entry);
            }
        }
        let builder = builder
            .add_dependencies(DependencySet::After, &update.add_after)
            .add_dependencies(DependencySet::Before, &update.add_before);
        match &update.due {
            DueUpdate::Keep => builder,
            DueUpdate::Set(due) => builder.set_due(due.as_str()),
            DueUpdate::Clear => builder.clear_due(),
        }
    }

    pub fn stamp(mut self, created: impl Into<String>) -> Revision {
        self.revision.created = created.into();
        self.revision
    }
}
