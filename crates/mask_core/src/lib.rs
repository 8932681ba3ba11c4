//! Revision-log task store.
//!
//! Tasks are never edited in place: every change appends a new revision
//! derived from the task's latest one, and deletion tombstones slots instead
//! of removing them so that task and revision ids stay stable forever.

pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod task_api;
pub mod timestamp;
