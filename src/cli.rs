use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskforge_client::models::TaskStatus;
use taskforge_client::views::DEFAULT_PAGE_SIZE;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session token.
    Login {
        email: String,
        #[arg(long, env = "TASKFORGE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a new account.
    Register {
        username: String,
        email: String,
        #[arg(long, env = "TASKFORGE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the stored session.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// List all users.
    Users,
    /// List tasks, optionally filtered.
    Tasks {
        /// pending, in-progress, completed or rejected
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Text to look for in task names and descriptions.
        #[arg(long)]
        search: Option<String>,
        /// Only tasks assigned to this email.
        #[arg(long)]
        assigned_to: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
        /// Ignore cached results.
        #[arg(long)]
        refresh: bool,
    },
    /// Show a single task.
    Task { id: String },
    /// Create a task.
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Email of the assignee.
        #[arg(long)]
        assign_to: Option<String>,
        /// Execute the task yourself.
        #[arg(long = "self")]
        executed_by_self: bool,
    },
    /// Change fields of an existing task.
    Update {
        id: String,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        assign_to: Option<String>,
    },
    /// Task totals for the logged-in user.
    Dashboard,
    /// Notifications for the logged-in user.
    Notifications,
    /// Interactive session with automatic logout after inactivity.
    Shell,
}

#[derive(Debug, Parser)]
#[command(
    name = "taskforge",
    about = "Terminal client for the TaskForge task management API."
)]
pub struct CommandLineArgs {
    #[command(subcommand)]
    pub action: Command,

    /// Use a different API base URL.
    #[arg(long)]
    pub api_url: Option<String>,

    /// Use a different directory for the stored session.
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,
}

/// A command typed at the shell prompt.
#[derive(Debug, Parser)]
#[command(name = "taskforge", no_binary_name = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub action: Command,
}

/// Splits a shell line on whitespace, keeping double-quoted text together.
pub fn split_line(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    words.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        words.push(current);
    }
    words
}
