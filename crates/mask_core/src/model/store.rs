use crate::error::AppError;
use crate::model::{
    DependencySet, Revision, RevisionId, RevisionLog, RevisionUpdate, Slot, TaskId, TaskRegistry,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const SCHEMA_VERSION: &str = "0.0.1";

/// The whole persisted database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub version: String,
    pub revs: RevisionLog,
    pub tasks: TaskRegistry,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            revs: RevisionLog::default(),
            tasks: TaskRegistry::default(),
        }
    }
}

impl Store {
    pub fn create_task(&mut self, initial: Revision) -> TaskId {
        self.tasks.create(&mut self.revs, initial)
    }

    pub fn amend_task(
        &mut self,
        id: TaskId,
        update: &RevisionUpdate,
        created: &str,
    ) -> Result<RevisionId, AppError> {
        self.tasks.amend(&mut self.revs, id, update, created)
    }

    pub fn remove_dependency(
        &mut self,
        id: TaskId,
        which: DependencySet,
        entry: TaskId,
        created: &str,
    ) -> Result<RevisionId, AppError> {
        self.tasks
            .remove_dependency(&mut self.revs, id, which, entry, created)
    }

    pub fn delete_tasks(&mut self, ids: &[TaskId]) -> Result<(), AppError> {
        self.tasks.delete(&mut self.revs, ids)
    }

    pub fn resolve_latest(&self, id: TaskId) -> Result<&Revision, AppError> {
        self.tasks.resolve_latest(&self.revs, id)
    }

    pub fn history(&self, id: TaskId) -> Result<Vec<(RevisionId, &Revision)>, AppError> {
        self.tasks.history(&self.revs, id)
    }

    /// Checks that every live task owns a non-empty chain of live revisions
    /// and that no revision belongs to two tasks.
    pub fn check_integrity(&self) -> Result<(), String> {
        let mut owners: HashMap<RevisionId, TaskId> = HashMap::new();

        for (task_id, slot) in self.tasks.iter() {
            let Some(task) = slot.live() else {
                continue;
            };
            if task.revs.is_empty() {
                return Err(format!("task {task_id} has no revisions"));
            }

            for revision_id in &task.revs {
                match self.revs.slot(*revision_id) {
                    Some(Slot::Live(_)) => {}
                    Some(Slot::Tombstoned) => {
                        return Err(format!(
                            "task {task_id} references deleted revision {revision_id}"
                        ));
                    }
                    None => {
                        return Err(format!(
                            "task {task_id} references missing revision {revision_id}"
                        ));
                    }
                }
                if let Some(owner) = owners.insert(*revision_id, task_id) {
                    return Err(format!(
                        "revision {revision_id} is shared by tasks {owner} and {task_id}"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{SCHEMA_VERSION, Store};
    use crate::model::{Revision, RevisionId, TaskId};

    fn revision(name: &str) -> Revision {
        Revision {
            name: Some(name.to_string()),
            after: Vec::new(),
            before: Vec::new(),
            due: None,
            created: "2024-01-01T08:00:00".to_string(),
        }
    }

    #[test]
    fn new_store_serializes_to_canonical_shape() {
        let value = serde_json::to_value(Store::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "version": SCHEMA_VERSION, "revs": [], "tasks": [] })
        );
    }

    #[test]
    fn tombstones_serialize_as_empty_objects() {
        let mut store = Store::default();
        store.create_task(revision("a"));
        store.create_task(revision("b"));
        store.delete_tasks(&[TaskId(0)]).unwrap();

        let value = serde_json::to_value(&store).unwrap();

        assert_eq!(value["tasks"][0], serde_json::json!({}));
        assert_eq!(value["revs"][0], serde_json::json!({}));
        assert_eq!(value["tasks"][1], serde_json::json!({ "revs": [1] }));
        assert_eq!(value["revs"][1]["name"], "b");
    }

    #[test]
    fn integrity_rejects_dangling_revision() {
        let store: Store = serde_json::from_value(serde_json::json!({
            "version": SCHEMA_VERSION,
            "revs": [],
            "tasks": [{ "revs": [0] }]
        }))
        .unwrap();

        let err = store.check_integrity().unwrap_err();
        assert!(err.contains("missing revision 0"));
    }

    #[test]
    fn integrity_rejects_live_task_without_revisions() {
        let store: Store = serde_json::from_value(serde_json::json!({
            "version": SCHEMA_VERSION,
            "revs": [],
            "tasks": [{ "revs": [] }]
        }))
        .unwrap();

        assert!(store.check_integrity().is_err());
    }

    #[test]
    fn integrity_rejects_shared_revision() {
        let mut store = Store::default();
        store.create_task(revision("a"));
        let mut value = serde_json::to_value(&store).unwrap();
        value["tasks"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({ "revs": [0] }));
        let shared: Store = serde_json::from_value(value).unwrap();

        assert!(shared.check_integrity().unwrap_err().contains("shared"));
    }

    #[test]
    fn integrity_accepts_tombstoned_history() {
        let mut store = Store::default();
        store.create_task(revision("a"));
        store.create_task(revision("b"));
        store.delete_tasks(&[TaskId(1)]).unwrap();

        assert!(store.check_integrity().is_ok());
        assert!(store.revs.slot(RevisionId(1)).unwrap().is_tombstoned());
    }
}
