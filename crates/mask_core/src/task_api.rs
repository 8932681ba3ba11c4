use crate::error::AppError;
use crate::model::{DependencySet, DueUpdate, Revision, RevisionId, RevisionUpdate, TaskId};
use crate::storage::json_store;
use crate::timestamp;
use std::path::Path;
use tracing::info;

/// Fields of a task's first revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub after: Vec<TaskId>,
    pub before: Vec<TaskId>,
    pub due: Option<String>,
}

/// A task's current state and the chain of revisions that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: TaskId,
    pub latest: Revision,
    pub history: Vec<(RevisionId, Revision)>,
}

pub fn init_store() -> Result<(), AppError> {
    let path = json_store::store_path()?;
    init_store_with_path(&path)
}

pub fn add_task(task: NewTask) -> Result<TaskId, AppError> {
    let path = json_store::store_path()?;
    add_task_with_path(&path, task)
}

pub fn edit_task(id: TaskId, update: RevisionUpdate) -> Result<RevisionId, AppError> {
    let path = json_store::store_path()?;
    edit_task_with_path(&path, id, update)
}

pub fn remove_dependency(
    id: TaskId,
    which: DependencySet,
    entry: TaskId,
) -> Result<RevisionId, AppError> {
    let path = json_store::store_path()?;
    remove_dependency_with_path(&path, id, which, entry)
}

pub fn delete_tasks(ids: &[TaskId]) -> Result<(), AppError> {
    let path = json_store::store_path()?;
    delete_tasks_with_path(&path, ids)
}

pub fn show_task(id: TaskId) -> Result<TaskView, AppError> {
    let path = json_store::store_path()?;
    show_task_with_path(&path, id)
}

pub fn describe_tasks(ids: &[TaskId]) -> Result<Vec<(TaskId, Revision)>, AppError> {
    let path = json_store::store_path()?;
    describe_tasks_with_path(&path, ids)
}

pub fn list_tasks() -> Result<Vec<TaskView>, AppError> {
    Err(AppError::unsupported("list"))
}

pub fn garbage_collect() -> Result<(), AppError> {
    Err(AppError::unsupported("gc"))
}

pub fn mark_task(_id: TaskId) -> Result<RevisionId, AppError> {
    Err(AppError::unsupported("mark"))
}

pub fn migrate_store() -> Result<(), AppError> {
    Err(AppError::unsupported("migrate"))
}

pub fn init_store_with_path(path: &Path) -> Result<(), AppError> {
    json_store::initialize(path).map(|_| ())
}

pub fn add_task_with_path(path: &Path, task: NewTask) -> Result<TaskId, AppError> {
    let name = task.name.trim();
    if name.is_empty() {
        return Err(AppError::invalid_input("task name is required"));
    }
    let due = task
        .due
        .as_deref()
        .map(timestamp::normalize_due)
        .transpose()?;

    let mut store = json_store::load(path)?;
    let id = store.create_task(Revision {
        name: Some(name.to_string()),
        after: task.after,
        before: task.before,
        due,
        created: timestamp::now_timestamp(),
    });
    json_store::persist(path, &store)?;

    info!(task = %id, "added task");
    Ok(id)
}

pub fn edit_task_with_path(
    path: &Path,
    id: TaskId,
    update: RevisionUpdate,
) -> Result<RevisionId, AppError> {
    if update.is_empty() {
        return Err(AppError::invalid_input("nothing to change"));
    }
    let update = normalize_update(update)?;

    let mut store = json_store::load(path)?;
    let revision_id = store.amend_task(id, &update, &timestamp::now_timestamp())?;
    json_store::persist(path, &store)?;

    info!(task = %id, revision = %revision_id, "edited task");
    Ok(revision_id)
}

pub fn remove_dependency_with_path(
    path: &Path,
    id: TaskId,
    which: DependencySet,
    entry: TaskId,
) -> Result<RevisionId, AppError> {
    let mut store = json_store::load(path)?;
    let revision_id = store.remove_dependency(id, which, entry, &timestamp::now_timestamp())?;
    json_store::persist(path, &store)?;

    info!(task = %id, revision = %revision_id, %which, %entry, "removed dependency");
    Ok(revision_id)
}

pub fn delete_tasks_with_path(path: &Path, ids: &[TaskId]) -> Result<(), AppError> {
    if ids.is_empty() {
        return Err(AppError::invalid_input("at least one task id is required"));
    }

    let mut store = json_store::load(path)?;
    store.delete_tasks(ids)?;
    json_store::persist(path, &store)?;

    info!(count = ids.len(), "deleted tasks");
    Ok(())
}

pub fn show_task_with_path(path: &Path, id: TaskId) -> Result<TaskView, AppError> {
    let store = json_store::load(path)?;
    let latest = store.resolve_latest(id)?.clone();
    let history = store
        .history(id)?
        .into_iter()
        .map(|(revision_id, revision)| (revision_id, revision.clone()))
        .collect();

    Ok(TaskView {
        id,
        latest,
        history,
    })
}

pub fn describe_tasks_with_path(
    path: &Path,
    ids: &[TaskId],
) -> Result<Vec<(TaskId, Revision)>, AppError> {
    let store = json_store::load(path)?;
    ids.iter()
        .map(|id| Ok((*id, store.resolve_latest(*id)?.clone())))
        .collect()
}

fn normalize_update(mut update: RevisionUpdate) -> Result<RevisionUpdate, AppError> {
    if let Some(name) = update.name.as_deref() {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("task name cannot be blank"));
        }
        update.name = Some(trimmed.to_string());
    }
    if let DueUpdate::Set(raw) = &update.due {
        update.due = DueUpdate::Set(timestamp::normalize_due(raw)?);
    }
    Ok(update)
}
