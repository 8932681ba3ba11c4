mod log;
mod registry;
mod revision;
mod slot;
mod store;
mod task;

pub use log::RevisionLog;
pub use registry::TaskRegistry;
pub use revision::{DependencySet, DueUpdate, Revision, RevisionBuilder, RevisionUpdate};
pub use slot::{RevisionId, Slot, TaskId};
pub use store::{SCHEMA_VERSION, Store};
pub use task::Task;
