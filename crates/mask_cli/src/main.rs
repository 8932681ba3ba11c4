use clap::Parser;
use clap::error::ErrorKind;
use mask_cli::cli::{Cli, Command, ConfigOverrideTarget, parse_config_override};
use mask_core::config::{self, ConfigOverrides};
use mask_core::error::AppError;
use mask_core::model::{DependencySet, DueUpdate, Revision, RevisionUpdate, TaskId};
use mask_core::task_api::{self, NewTask, TaskView};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "MASK_LOG";
const EXIT_ABORTED: i32 = 10;

enum Outcome {
    Done,
    Aborted,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "rev")]
    id: usize,
    created: String,
    name: String,
    after: String,
    before: String,
    due: String,
}

fn exit_code(err: &AppError) -> i32 {
    match err {
        AppError::InvalidInput(_) => 1,
        AppError::NotFound(_) => 2,
        AppError::InvalidExistingStore(_) => 3,
        AppError::AlreadyExists(_) => 4,
        AppError::OutOfRange(_) => 5,
        AppError::Deleted(_) => 6,
        AppError::Unsupported(_) => 7,
        AppError::PersistFailed(_) => 8,
        AppError::Io(_) => 9,
    }
}

fn task_ids(raw: &[usize]) -> Vec<TaskId> {
    raw.iter().copied().map(TaskId).collect()
}

fn join_ids(ids: &[TaskId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The one dependency entry an update removes, when that is all it does.
fn single_removal(update: &RevisionUpdate) -> Option<(DependencySet, TaskId)> {
    let only_removals = RevisionUpdate {
        remove_after: update.remove_after.clone(),
        remove_before: update.remove_before.clone(),
        ..RevisionUpdate::default()
    };
    if *update != only_removals {
        return None;
    }
    match (update.remove_after.as_slice(), update.remove_before.as_slice()) {
        ([entry], []) => Some((DependencySet::After, *entry)),
        ([], [entry]) => Some((DependencySet::Before, *entry)),
        _ => None,
    }
}

fn display_name(revision: &Revision) -> &str {
    revision.name.as_deref().unwrap_or("(unnamed)")
}

fn print_task_view(view: &TaskView) {
    println!("Task {}: {}", view.id, display_name(&view.latest));
    println!("after:  {}", join_ids(&view.latest.after));
    println!("before: {}", join_ids(&view.latest.before));
    println!("due:    {}", view.latest.due.as_deref().unwrap_or("-"));
    println!();

    let rows = view.history.iter().map(|(id, revision)| HistoryRow {
        id: id.0,
        created: revision.created.clone(),
        name: display_name(revision).to_string(),
        after: join_ids(&revision.after),
        before: join_ids(&revision.before),
        due: revision.due.clone().unwrap_or_else(|| "-".to_string()),
    });
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{table}");
}

fn print_task_view_json(view: &TaskView) {
    let history: Vec<serde_json::Value> = view
        .history
        .iter()
        .map(|(id, revision)| {
            serde_json::json!({
                "revision_id": id,
                "revision": revision,
            })
        })
        .collect();
    let json = serde_json::json!({
        "task_id": view.id,
        "latest": view.latest,
        "history": history,
    });
    println!("{}", json);
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn parse_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::Store => overrides.store = Some(PathBuf::from(parsed.value)),
            ConfigOverrideTarget::Log => overrides.log = Some(parsed.value),
        }
    }
    Ok(overrides)
}

fn init_logging(verbose: bool, configured: Option<&str>) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV_VAR) {
        filter
    } else {
        configured
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

fn confirm(out: &mut dyn Write, prompt: &str) -> Result<bool, AppError> {
    write!(out, "{prompt} (y/N) ")
        .and_then(|_| out.flush())
        .map_err(|err| AppError::io(err.to_string()))?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|err| AppError::io(err.to_string()))?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn run_command(cli: Cli, store_path: &Path) -> Result<Outcome, AppError> {
    match cli.command {
        Command::Init => {
            task_api::init_store_with_path(store_path)?;
            if cli.json {
                println!("{}", serde_json::json!({ "store": store_path }));
            } else {
                println!("Created {}", store_path.display());
            }
        }
        Command::Add {
            task,
            after,
            before,
            due,
        } => {
            let id = task_api::add_task_with_path(
                store_path,
                NewTask {
                    name: task,
                    after: task_ids(&after),
                    before: task_ids(&before),
                    due,
                },
            )?;
            if cli.json {
                println!("{}", serde_json::json!({ "task_id": id }));
            } else {
                println!("{id}");
            }
        }
        Command::Edit {
            task_id,
            name,
            add_after,
            add_before,
            remove_after,
            remove_before,
            due,
            remove_due,
        } => {
            let due = match (due, remove_due) {
                (Some(raw), _) => DueUpdate::Set(raw),
                (None, true) => DueUpdate::Clear,
                (None, false) => DueUpdate::Keep,
            };
            let update = RevisionUpdate {
                name,
                add_after: task_ids(&add_after),
                add_before: task_ids(&add_before),
                remove_after: task_ids(&remove_after),
                remove_before: task_ids(&remove_before),
                due,
            };
            let id = TaskId(task_id);
            let revision_id = match single_removal(&update) {
                Some((which, entry)) => {
                    task_api::remove_dependency_with_path(store_path, id, which, entry)?
                }
                None => task_api::edit_task_with_path(store_path, id, update)?,
            };
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "task_id": id, "revision_id": revision_id })
                );
            } else {
                println!("{revision_id}");
            }
        }
        Command::Rm { task_ids: raw, yes } => {
            let ids = task_ids(&raw);
            if !yes {
                // Keep stdout pure JSON under --json.
                let mut out: Box<dyn Write> = if cli.json {
                    Box::new(io::stderr())
                } else {
                    Box::new(io::stdout())
                };
                for (id, revision) in task_api::describe_tasks_with_path(store_path, &ids)? {
                    writeln!(out, "{id}: {}", display_name(&revision))
                        .map_err(|err| AppError::io(err.to_string()))?;
                }
                if !confirm(&mut out, "Are you sure you want to delete these tasks?")? {
                    return Ok(Outcome::Aborted);
                }
            }
            task_api::delete_tasks_with_path(store_path, &ids)?;
            if cli.json {
                println!("{}", serde_json::json!({ "deleted": ids }));
            } else {
                println!("Deleted {} task(s)", ids.len());
            }
        }
        Command::Show { task_id } => {
            let view = task_api::show_task_with_path(store_path, TaskId(task_id))?;
            if cli.json {
                print_task_view_json(&view);
            } else {
                print_task_view(&view);
            }
        }
        Command::Ls => {
            task_api::list_tasks()?;
        }
        Command::Gc => task_api::garbage_collect()?,
        Command::Mark { task_id } => {
            task_api::mark_task(TaskId(task_id))?;
        }
        Command::Migrate => task_api::migrate_store()?,
    }

    Ok(Outcome::Done)
}

fn run(cli: Cli) -> Result<Outcome, AppError> {
    let overrides = parse_overrides(&cli.config_override)?;
    let loaded = config::load_config_with_fallback();
    let merged = config::merge_overrides(&loaded.config, &overrides);
    init_logging(cli.verbose, merged.log.as_deref());
    if let Some(err) = loaded.error {
        warn!(%err, "ignoring configuration file");
    }

    // --store, then --config-override store=..., then env/config/default.
    let store_path = match (cli.store.clone(), overrides.store.as_ref(), merged.store.as_ref()) {
        (Some(path), _, _) => path,
        (None, Some(_), Some(path)) => path.clone(),
        _ => config::resolve_store_path(&merged)?,
    };
    run_command(cli, &store_path)
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                err.exit();
            }
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    match run(cli) {
        Ok(Outcome::Done) => {}
        Ok(Outcome::Aborted) => {
            eprintln!("Aborted.");
            std::process::exit(EXIT_ABORTED);
        }
        Err(err) => {
            eprintln!("ERROR: {}", err);
            std::process::exit(exit_code(&err));
        }
    }
}
