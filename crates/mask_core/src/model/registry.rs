use crate::error::AppError;
use crate::model::{
    DependencySet, Revision, RevisionBuilder, RevisionId, RevisionLog, RevisionUpdate, Slot, Task,
    TaskId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Append-only arena of tasks; a task id is its index here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskRegistry {
    slots: Vec<Slot<Task>>,
}

impl TaskRegistry {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, id: TaskId) -> Option<&Slot<Task>> {
        self.slots.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &Slot<Task>)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (TaskId(index), slot))
    }

    pub fn task(&self, id: TaskId) -> Result<&Task, AppError> {
        match self.slots.get(id.0) {
            Some(Slot::Live(task)) => Ok(task),
            Some(Slot::Tombstoned) => Err(deleted_task(id)),
            None => Err(missing_task(id)),
        }
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, AppError> {
        match self.slots.get_mut(id.0) {
            Some(Slot::Live(task)) => Ok(task),
            Some(Slot::Tombstoned) => Err(deleted_task(id)),
            None => Err(missing_task(id)),
        }
    }

    pub fn create(&mut self, log: &mut RevisionLog, initial: Revision) -> TaskId {
        let revision_id = log.append(initial);
        let task_id = TaskId(self.slots.len());
        self.slots.push(Slot::Live(Task::new(revision_id)));
        task_id
    }

    pub fn resolve_latest<'a>(
        &self,
        log: &'a RevisionLog,
        id: TaskId,
    ) -> Result<&'a Revision, AppError> {
        let latest = self
            .task(id)?
            .latest()
            .ok_or_else(|| deleted_task(id))?;
        log.get(latest)
    }

    pub fn history<'a>(
        &self,
        log: &'a RevisionLog,
        id: TaskId,
    ) -> Result<Vec<(RevisionId, &'a Revision)>, AppError> {
        self.task(id)?
            .revs
            .iter()
            .map(|revision_id| Ok((*revision_id, log.get(*revision_id)?)))
            .collect()
    }

    /// Appends the latest revision with `update` applied.
    ///
    /// Every entry listed for removal must be present in the latest revision;
    /// otherwise nothing is appended.
    pub fn amend(
        &mut self,
        log: &mut RevisionLog,
        id: TaskId,
        update: &RevisionUpdate,
        created: &str,
    ) -> Result<RevisionId, AppError> {
        let latest = self.resolve_latest(log, id)?;
        for which in [DependencySet::After, DependencySet::Before] {
            let current = latest.dependencies(which);
            if let Some(entry) = update
                .removals(which)
                .iter()
                .find(|entry| !current.contains(entry))
            {
                return Err(AppError::invalid_input(format!(
                    "task {id} has no `{which}` entry {entry}"
                )));
            }
        }

        let next = RevisionBuilder::from_latest(latest)
            .apply(update)
            .stamp(created);
        self.push_revision(log, id, next)
    }

    /// Appends a revision with every occurrence of `entry` dropped from
    /// `which`.
    pub fn remove_dependency(
        &mut self,
        log: &mut RevisionLog,
        id: TaskId,
        which: DependencySet,
        entry: TaskId,
        created: &str,
    ) -> Result<RevisionId, AppError> {
        let mut update = RevisionUpdate::default();
        match which {
            DependencySet::After => update.remove_after.push(entry),
            DependencySet::Before => update.remove_before.push(entry),
        }
        self.amend(log, id, &update, created)
    }

    /// Tombstones every listed task and the revisions it owns.
    ///
    /// The whole batch is checked before anything is cleared; repeated ids
    /// count once.
    pub fn delete(&mut self, log: &mut RevisionLog, ids: &[TaskId]) -> Result<(), AppError> {
        let targets: BTreeSet<TaskId> = ids.iter().copied().collect();
        for id in &targets {
            for revision_id in &self.task(*id)?.revs {
                if log.slot(*revision_id).is_none() {
                    return Err(AppError::out_of_range(format!(
                        "task {id} references missing revision {revision_id}"
                    )));
                }
            }
        }

        for id in targets {
            if let Some(slot) = self.slots.get_mut(id.0) {
                if let Some(task) = slot.live() {
                    for revision_id in &task.revs {
                        log.clear(*revision_id)?;
                    }
                }
                slot.clear();
            }
        }

        Ok(())
    }

    fn push_revision(
        &mut self,
        log: &mut RevisionLog,
        id: TaskId,
        revision: Revision,
    ) -> Result<RevisionId, AppError> {
        let task = self.task_mut(id)?;
        let revision_id = log.append(revision);
        task.revs.push(revision_id);
        Ok(revision_id)
    }
}

fn missing_task(id: TaskId) -> AppError {
    AppError::out_of_range(format!("task {id} does not exist"))
}

fn deleted_task(id: TaskId) -> AppError {
    AppError::deleted(format!("task {id} was deleted"))
}
