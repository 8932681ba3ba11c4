use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mask",
    author,
    version,
    about = "Track tasks as an append-only log of revisions",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Path of the store file (defaults to $MASK_STORE_PATH or ~/.mask)
    #[arg(long, value_name = "PATH", global = true)]
    pub store: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty store
    ///
    /// Example: mask init
    Init,
    /// Add a new task and print its id
    ///
    /// Example: mask add "Buy milk" --after 0 2 --due 2024-01-01
    Add {
        task: String,
        /// Ids of tasks this one must follow
        #[arg(short = 'a', long, value_name = "TASK_ID", num_args = 1..)]
        after: Vec<usize>,
        /// Ids of tasks this one must precede
        #[arg(short = 'b', long, value_name = "TASK_ID", num_args = 1..)]
        before: Vec<usize>,
        /// Due date (ISO-8601)
        #[arg(short = 'd', long)]
        due: Option<String>,
    },
    /// Append a revision to a task
    ///
    /// Example: mask edit 0 --name "Buy oat milk" --remove-due
    /// Example: mask edit 0 -a 3 -B 1
    Edit {
        task_id: usize,
        /// New name
        #[arg(short = 'n', long)]
        name: Option<String>,
        /// Ids to add to the `after` set
        #[arg(short = 'a', long = "add-after", value_name = "TASK_ID", num_args = 1..)]
        add_after: Vec<usize>,
        /// Ids to add to the `before` set
        #[arg(short = 'b', long = "add-before", value_name = "TASK_ID", num_args = 1..)]
        add_before: Vec<usize>,
        /// Ids to remove from the `after` set
        #[arg(short = 'A', long = "remove-after", value_name = "TASK_ID", num_args = 1..)]
        remove_after: Vec<usize>,
        /// Ids to remove from the `before` set
        #[arg(short = 'B', long = "remove-before", value_name = "TASK_ID", num_args = 1..)]
        remove_before: Vec<usize>,
        /// New due date (ISO-8601)
        #[arg(short = 'd', long, conflicts_with = "remove_due")]
        due: Option<String>,
        /// Clear the due date
        #[arg(short = 'D', long)]
        remove_due: bool,
    },
    /// Delete tasks, keeping their ids reserved
    ///
    /// Example: mask rm 0 3
    #[command(visible_alias = "delete")]
    Rm {
        #[arg(required = true, num_args = 1.., value_name = "TASK_ID")]
        task_ids: Vec<usize>,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Show a task and its revision history
    ///
    /// Example: mask show 0
    Show { task_id: usize },
    /// List tasks (not supported yet)
    Ls,
    /// Compact deleted slots (not supported yet)
    Gc,
    /// Mark a task (not supported yet)
    Mark { task_id: usize },
    /// Migrate the store to a newer schema (not supported yet)
    Migrate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Store,
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    if value.is_empty() {
        return Err("override value cannot be empty".to_string());
    }

    let canonical_field = canonicalize_flag_name(key_raw)
        .ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "store" | "store_path" => ConfigOverrideTarget::Store,
        "log" | "log_level" => ConfigOverrideTarget::Log,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
