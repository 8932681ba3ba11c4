use crate::error::AppError;
use crate::model::{SCHEMA_VERSION, Store};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const STORE_ENV_VAR: &str = "MASK_STORE_PATH";
const STORE_FILE_NAME: &str = ".mask";

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_input("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("mask").join("store.json"))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_input("HOME is not set"))?;
        Ok(PathBuf::from(home).join(STORE_FILE_NAME))
    }
}

/// Creates an empty store at `path`. Any file already there is left alone.
pub fn initialize(path: &Path) -> Result<Store, AppError> {
    if path.exists() {
        warn!(path = %path.display(), "refusing to initialize over an existing file");
        return Err(match load(path) {
            Err(AppError::InvalidExistingStore(message)) => AppError::invalid_store(format!(
                "{} already exists but is not valid; move or remove it before running `mask init` ({message})",
                path.display()
            )),
            _ => AppError::already_exists(format!("{} already exists", path.display())),
        });
    }

    let store = Store::default();
    write_snapshot(path, &store, false)?;
    info!(path = %path.display(), "initialized store");
    Ok(store)
}

pub fn load(path: &Path) -> Result<Store, AppError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(AppError::not_found(format!(
                "{} does not exist; run `mask init`",
                path.display()
            )));
        }
        Err(err) if err.kind() == ErrorKind::InvalidData => {
            return Err(AppError::invalid_store(format!(
                "{} is not valid UTF-8",
                path.display()
            )));
        }
        Err(err) => return Err(AppError::io(format!("{}: {err}", path.display()))),
    };

    let store: Store = serde_json::from_str(&content).map_err(|err| {
        if has_string_dependency_ids(&content) {
            AppError::invalid_store(format!(
                "{} is not a valid store: dependency ids must be integers",
                path.display()
            ))
        } else {
            AppError::invalid_store(format!("{} is not a valid store: {err}", path.display()))
        }
    })?;

    if store.version != SCHEMA_VERSION {
        return Err(AppError::invalid_store(format!(
            "{} has version {}, expected {SCHEMA_VERSION}; migration is not supported",
            path.display(),
            store.version
        )));
    }

    store
        .check_integrity()
        .map_err(|message| AppError::invalid_store(format!("{}: {message}", path.display())))?;

    debug!(
        path = %path.display(),
        revisions = store.revs.len(),
        tasks = store.tasks.len(),
        "loaded store"
    );
    Ok(store)
}

// Stores from the earliest tool kept `after`/`before` as strings.
fn has_string_dependency_ids(content: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
        return false;
    };
    let Some(revs) = value.get("revs").and_then(|revs| revs.as_array()) else {
        return false;
    };
    revs.iter()
        .flat_map(|rev| ["after", "before"].map(|key| rev.get(key)))
        .flatten()
        .filter_map(|ids| ids.as_array())
        .flatten()
        .any(|id| id.is_string())
}

/// Replaces the store at `path` with `store`.
///
/// The snapshot is written to a temporary file next to `path` and renamed
/// over it, so readers see either the previous or the new content.
pub fn persist(path: &Path, store: &Store) -> Result<(), AppError> {
    write_snapshot(path, store, true)?;
    debug!(
        path = %path.display(),
        revisions = store.revs.len(),
        tasks = store.tasks.len(),
        "persisted store"
    );
    Ok(())
}

fn write_snapshot(path: &Path, store: &Store, replace: bool) -> Result<(), AppError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|err| persist_error(path, err))?;

    let content = serde_json::to_string_pretty(store)
        .map_err(|err| AppError::persist_failed(err.to_string()))?;

    let mut staged = NamedTempFile::new_in(parent).map_err(|err| persist_error(path, err))?;
    staged
        .write_all(content.as_bytes())
        .map_err(|err| persist_error(path, err))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|err| persist_error(path, err))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        staged
            .as_file()
            .set_permissions(permissions)
            .map_err(|err| persist_error(path, err))?;
    }

    if replace {
        staged
            .persist(path)
            .map_err(|err| persist_error(path, err.error))?;
    } else {
        staged.persist_noclobber(path).map_err(|err| {
            if err.error.kind() == ErrorKind::AlreadyExists {
                AppError::already_exists(format!("{} already exists", path.display()))
            } else {
                persist_error(path, err.error)
            }
        })?;
    }

    Ok(())
}

fn persist_error(path: &Path, err: std::io::Error) -> AppError {
    AppError::persist_failed(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{initialize, load, persist, write_snapshot};
    use crate::model::{DueUpdate, Revision, RevisionUpdate, SCHEMA_VERSION, Store, TaskId};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("mask-{nanos}-{file_name}"))
    }

    fn revision(name: &str) -> Revision {
        Revision {
            name: Some(name.to_string()),
            after: vec![TaskId(7)],
            before: Vec::new(),
            due: None,
            created: "2024-01-01T08:00:00.123456".to_string(),
        }
    }

    #[test]
    fn initialize_writes_empty_store() {
        let path = temp_path("init.json");
        initialize(&path).unwrap();
        let stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(
            stored,
            serde_json::json!({ "version": SCHEMA_VERSION, "revs": [], "tasks": [] })
        );
    }

    #[test]
    fn initialize_twice_reports_already_exists() {
        let path = temp_path("init-twice.json");
        initialize(&path).unwrap();
        let err = initialize(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "already_exists");
    }

    #[test]
    fn initialize_over_corrupt_file_reports_invalid_store() {
        let path = temp_path("init-corrupt.json");
        fs::write(&path, "{ not json").unwrap();

        let err = initialize(&path).unwrap_err();
        let content = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_store");
        assert_eq!(content, "{ not json");
    }

    #[test]
    fn load_missing_reports_not_found() {
        let err = load(&temp_path("missing.json")).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn load_rejects_corrupt_file() {
        let path = temp_path("corrupt.json");
        fs::write(&path, "[1, 2").unwrap();
        let err = load(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_store");
    }

    #[test]
    fn load_rejects_unknown_version() {
        let path = temp_path("version.json");
        fs::write(&path, r#"{"version":"9.9.9","revs":[],"tasks":[]}"#).unwrap();
        let err = load(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_store");
        assert!(err.message().contains("9.9.9"));
    }

    #[test]
    fn load_rejects_dangling_revision_reference() {
        let path = temp_path("dangling.json");
        fs::write(
            &path,
            r#"{"version":"0.0.1","revs":[],"tasks":[{"revs":[3]}]}"#,
        )
        .unwrap();
        let err = load(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_store");
    }

    #[test]
    fn load_reads_legacy_task_key_and_tombstones() {
        let path = temp_path("legacy.json");
        let content = r#"{"version": "0.0.1", "revs": [{}, {"task": "b", "after": [], "before": [0], "due": null, "created": "2024-01-01T08:00:00.000001"}, {"task": "b", "name": "c", "after": [], "before": [0], "due": "2024-01-01T00:00:00", "created": "2024-01-02T08:00:00"}], "tasks": [{}, {"revs": [1, 2]}]}"#;
        fs::write(&path, content).unwrap();

        let store = load(&path).unwrap();
        fs::remove_file(&path).ok();

        let latest = store.resolve_latest(TaskId(1)).unwrap();
        assert_eq!(latest.name.as_deref(), Some("c"));
        assert_eq!(latest.before, vec![TaskId(0)]);
        assert_eq!(store.resolve_latest(TaskId(0)).unwrap_err().code(), "deleted");
    }

    #[test]
    fn persist_and_load_round_trip() {
        let path = temp_path("round-trip.json");
        let mut store = Store::default();
        store.create_task(revision("a"));
        store.create_task(revision("b"));
        store
            .amend_task(
                TaskId(1),
                &RevisionUpdate {
                    due: DueUpdate::Set("2024-01-01T00:00:00".to_string()),
                    ..RevisionUpdate::default()
                },
                "2024-01-02T08:00:00",
            )
            .unwrap();
        store.delete_tasks(&[TaskId(0)]).unwrap();

        persist(&path, &store).unwrap();
        let loaded = load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, store);
    }

    #[test]
    fn persist_replaces_previous_snapshot() {
        let path = temp_path("replace.json");
        initialize(&path).unwrap();
        let mut store = load(&path).unwrap();
        store.create_task(revision("a"));

        persist(&path, &store).unwrap();
        let loaded = load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.tasks.len(), 1);
    }

    #[test]
    fn persist_failure_leaves_no_partial_file() {
        let blocker = temp_path("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("store.json");

        let err = persist(&path, &Store::default()).unwrap_err();
        let blocker_content = fs::read_to_string(&blocker).unwrap();
        fs::remove_file(&blocker).ok();

        assert_eq!(err.code(), "persist_failed");
        assert_eq!(blocker_content, "not a directory");
    }

    #[test]
    fn load_explains_string_dependency_ids() {
        let path = temp_path("string-ids.json");
        let content = r#"{"version": "0.0.1", "revs": [{"task": "a", "after": ["0"], "before": [], "due": null, "created": "2024-01-01T08:00:00"}], "tasks": [{"revs": [0]}]}"#;
        fs::write(&path, content).unwrap();

        let err = load(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_store");
        assert!(err.message().contains("dependency ids must be integers"));
    }

    #[test]
    fn initialize_over_unreadable_path_reports_already_exists() {
        let path = temp_path("dir-store");
        fs::create_dir_all(&path).unwrap();

        let err = initialize(&path).unwrap_err();
        let still_dir = path.is_dir();
        fs::remove_dir_all(&path).ok();

        assert_eq!(err.code(), "already_exists");
        assert!(still_dir);
    }

    #[test]
    fn noclobber_snapshot_refuses_existing_file() {
        let path = temp_path("noclobber.json");
        fs::write(&path, "existing bytes").unwrap();

        let err = write_snapshot(&path, &Store::default(), false).unwrap_err();
        let content = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "already_exists");
        assert_eq!(content, "existing bytes");
    }

    #[test]
    fn failed_persist_keeps_existing_content() {
        let dir = temp_path("persist-dir");
        let path = dir.join("store.json");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("keep"), "existing bytes").unwrap();

        let err = persist(&path, &Store::default()).unwrap_err();
        let kept = fs::read_to_string(path.join("keep")).unwrap();
        let entries: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        fs::remove_dir_all(&dir).ok();

        assert_eq!(err.code(), "persist_failed");
        assert_eq!(kept, "existing bytes");
        assert_eq!(entries, vec![std::ffi::OsString::from("store.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn persisted_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_path("private.json");
        persist(&path, &Store::default()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        fs::remove_file(&path).ok();

        assert_eq!(mode & 0o777, 0o600);
    }
}
