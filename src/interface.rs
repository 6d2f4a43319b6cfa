use clap::Parser;
use log::warn;
use prettytable::{row, Table};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::cli::{split_line, Command, ShellLine};
use taskforge_client::auth::{
    Activity, InactivityMonitor, LoginRequest, LogoutReason, RegisterRequest, SessionEvent,
};
use taskforge_client::models::{Task, TaskInput, TaskUpdate, User};
use taskforge_client::views::{Dashboard, NotificationsView, TaskFilter, TaskListView};
use taskforge_client::{AppContext, AppError};

/// Runs a single command against the context.
pub async fn run(context: &Arc<AppContext>, command: Command) -> Result<(), AppError> {
    match command {
        Command::Login { email, password } => login(context, email, password).await,
        Command::Register {
            username,
            email,
            password,
        } => register(context, username, email, password).await,
        Command::Logout => logout(context),
        Command::Whoami => whoami(context).await,
        Command::Users => users(context).await,
        Command::Tasks {
            status,
            search,
            assigned_to,
            page,
            page_size,
            refresh,
        } => {
            if refresh {
                context.refresh_tasks();
            }
            let filter = TaskFilter {
                status,
                search,
                assigned_to,
            };
            tasks(context, filter, page, page_size).await
        }
        Command::Task { id } => task(context, &id).await,
        Command::Create {
            name,
            description,
            assign_to,
            executed_by_self,
        } => {
            let input = TaskInput {
                name,
                description,
                assigned_to: assign_to,
                executed_by_self,
            };
            let task = context.create_task(input).await?;
            println!("Created task {} ({})", task.name, task.id);
            Ok(())
        }
        Command::Update {
            id,
            status,
            name,
            description,
            assign_to,
        } => {
            let update = TaskUpdate {
                name,
                description,
                status,
                assigned_to: assign_to,
            };
            let task = context.update_task(&id, update).await?;
            print_task(&task);
            Ok(())
        }
        Command::Dashboard => dashboard(context).await,
        Command::Notifications => notifications(context).await,
        Command::Shell => {
            println!("Already in the shell.");
            Ok(())
        }
    }
}

async fn login(
    context: &Arc<AppContext>,
    email: String,
    password: String,
) -> Result<(), AppError> {
    let session = context.login(LoginRequest { email, password }).await?;
    match session.expiration_time {
        Some(expires) => println!(
            "Logged in. Session valid until {}.",
            expires.format("%Y-%m-%d %H:%M UTC")
        ),
        None => println!("Logged in."),
    }
    Ok(())
}

async fn register(
    context: &Arc<AppContext>,
    username: String,
    email: String,
    password: String,
) -> Result<(), AppError> {
    let response = context
        .register(RegisterRequest {
            username,
            email,
            password,
        })
        .await?;
    if response.token.is_some() {
        println!("Account created, you are now logged in.");
    } else {
        println!(
            "{}",
            response
                .message
                .unwrap_or_else(|| "Account created. Log in to continue.".to_string())
        );
    }
    Ok(())
}

fn logout(context: &Arc<AppContext>) -> Result<(), AppError> {
    context.logout(LogoutReason::UserRequested)?;
    println!("Logged out.");
    Ok(())
}

async fn whoami(context: &Arc<AppContext>) -> Result<(), AppError> {
    let user = context.current_user().await?;
    print_users(std::slice::from_ref(&user));
    Ok(())
}

async fn users(context: &Arc<AppContext>) -> Result<(), AppError> {
    let users = context.users().await?;
    print_users(&users);
    Ok(())
}

async fn tasks(
    context: &Arc<AppContext>,
    filter: TaskFilter,
    page: usize,
    page_size: usize,
) -> Result<(), AppError> {
    let view = TaskListView::load(context, filter, page_size).await?;
    if view.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    let Some(page) = view.page(page) else {
        println!("Page {} does not exist ({} pages).", page, view.total_pages());
        return Ok(());
    };

    let mut table = Table::new();
    table.add_row(row!["ID", "NAME", "STATUS", "ASSIGNED TO", "ASSIGNED BY"]);
    for task in page.items {
        table.add_row(row![
            task.id,
            task.name,
            task.status,
            task.assigned_to.as_deref().unwrap_or("-"),
            task.assigned_by.as_deref().unwrap_or("-")
        ]);
    }
    table.printstd();
    println!("Page {} of {}", page.number, page.total_pages);
    Ok(())
}

async fn task(context: &Arc<AppContext>, id: &str) -> Result<(), AppError> {
    let task = context.task(id).await?;
    print_task(&task);
    Ok(())
}

async fn dashboard(context: &Arc<AppContext>) -> Result<(), AppError> {
    let dashboard = Dashboard::load(context).await?;
    println!("Welcome, {}", dashboard.user.username);

    let mut table = Table::new();
    table.add_row(row!["STATUS", "TASKS"]);
    for (status, count) in &dashboard.by_status {
        table.add_row(row![status, count]);
    }
    table.add_row(row!["Total", dashboard.total]);
    table.printstd();

    println!("Assigned to you: {}", dashboard.assigned_to_me);
    println!("Assigned by you: {}", dashboard.assigned_by_me);
    println!("Self-executed:   {}", dashboard.executed_by_self);
    println!("Completed:       {:.0}%", dashboard.completion_rate() * 100.0);
    Ok(())
}

async fn notifications(context: &Arc<AppContext>) -> Result<(), AppError> {
    let view = NotificationsView::load(context).await?;
    if view.is_empty() {
        println!("No notifications for {}.", view.email);
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["", "WHEN", "MESSAGE"]);
    for notification in &view.notifications {
        let when = notification
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let marker = if notification.read { "" } else { "*" };
        table.add_row(row![marker, when, notification.message]);
    }
    table.printstd();
    println!("{} unread", view.unread_count());
    Ok(())
}

fn print_task(task: &Task) {
    let mut table = Table::new();
    table.add_row(row!["ID", task.id]);
    table.add_row(row!["Name", task.name]);
    table.add_row(row!["Description", task.description]);
    table.add_row(row!["Status", task.status]);
    table.add_row(row!["Assigned to", task.assigned_to.as_deref().unwrap_or("-")]);
    table.add_row(row!["Assigned by", task.assigned_by.as_deref().unwrap_or("-")]);
    table.add_row(row!["Self-executed", if task.executed_by_self { "yes" } else { "no" }]);
    table.printstd();
}

fn print_users(users: &[User]) {
    let mut table = Table::new();
    table.add_row(row!["ID", "USERNAME", "EMAIL", "VERIFIED"]);
    for user in users {
        table.add_row(row![
            user.id,
            user.username,
            user.email,
            if user.is_verified { "yes" } else { "no" }
        ]);
    }
    table.printstd();
}

/// Prints an error the way the user should see it.
pub fn report(error: &AppError) {
    eprintln!("Error: {}", error.user_message());
}

fn prompt() {
    print!("taskforge> ");
    let _ = std::io::stdout().flush();
}

/// What the shell does in response to a session event.
#[derive(Debug, PartialEq, Eq)]
enum ShellReaction {
    /// A session started: arm the idle timer.
    ArmMonitor,
    /// The session ended: print the message and leave the shell.
    Exit(String),
}

fn react_to(event: &SessionEvent) -> ShellReaction {
    match event {
        SessionEvent::LoggedIn => ShellReaction::ArmMonitor,
        SessionEvent::LoggedOut {
            redirect_to,
            reason,
        } => {
            let why = match reason {
                LogoutReason::UserRequested => "Logged out",
                LogoutReason::Inactivity => "Logged out after inactivity",
                LogoutReason::Expired => "Session expired",
                LogoutReason::Unauthorized => "The server rejected the session",
            };
            ShellReaction::Exit(format!("{}, back to {}.", why, redirect_to))
        }
    }
}

fn arm_monitor(context: &Arc<AppContext>) -> InactivityMonitor {
    let monitor = context.start_inactivity_monitor();
    println!("Idle sessions are logged out after {:?}.", monitor.timeout());
    monitor
}

/// Reads commands from stdin until `exit`, end of input, or the session ends.
///
/// Every line typed counts as user activity. The idle timer only runs while
/// someone is logged in.
pub async fn shell(context: &Arc<AppContext>) -> Result<(), AppError> {
    println!("Type a command, or `exit` to quit.");
    let mut monitor = if context.session().is_authenticated() {
        Some(arm_monitor(context))
    } else {
        println!("Not logged in. Use `login <email> --password <password>` first.");
        None
    };
    let mut events = context.session().subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Could not read from stdin: {}", e);
                        break;
                    }
                };
                if let Some(monitor) = &monitor {
                    monitor.record(Activity::KeyPress);
                }

                let line = line.trim();
                if line == "exit" || line == "quit" {
                    break;
                }
                if !line.is_empty() {
                    match ShellLine::try_parse_from(split_line(line)) {
                        Ok(ShellLine { action }) => {
                            if let Err(e) = run(context, action).await {
                                report(&e);
                            }
                        }
                        Err(e) => {
                            let _ = e.print();
                        }
                    }
                }
                prompt();
            }
            event = events.recv() => match event {
                Ok(event) => match react_to(&event) {
                    ShellReaction::ArmMonitor => {
                        if monitor.is_none() {
                            monitor = Some(arm_monitor(context));
                        }
                    }
                    ShellReaction::Exit(message) => {
                        println!();
                        println!("{}", message);
                        break;
                    }
                },
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    }

    if let Some(monitor) = monitor {
        monitor.stop();
    }
    Ok(())
}
