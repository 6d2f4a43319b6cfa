use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::{Task, TaskStatus, User};

/// Summary numbers for the logged-in user's home screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub user: User,
    pub total: usize,
    pub by_status: BTreeMap<TaskStatus, usize>,
    pub assigned_to_me: usize,
    pub assigned_by_me: usize,
    pub executed_by_self: usize,
}

impl Dashboard {
    /// Fetches the current user and the task list concurrently.
    pub async fn load(context: &Arc<AppContext>) -> Result<Self, AppError> {
        let (user, tasks) = futures::try_join!(context.current_user(), context.tasks())?;
        Ok(Self::summarize(user, &tasks))
    }

    pub fn summarize(user: User, tasks: &[Task]) -> Self {
        let mut by_status: BTreeMap<TaskStatus, usize> =
            TaskStatus::ALL.iter().map(|status| (*status, 0)).collect();
        let mut assigned_to_me = 0;
        let mut assigned_by_me = 0;
        let mut executed_by_self = 0;

        for task in tasks {
            *by_status.entry(task.status).or_insert(0) += 1;
            if is_user(&task.assigned_to, &user) {
                assigned_to_me += 1;
            }
            if is_user(&task.assigned_by, &user) {
                assigned_by_me += 1;
            }
            if task.executed_by_self {
                executed_by_self += 1;
            }
        }

        Self {
            user,
            total: tasks.len(),
            by_status,
            assigned_to_me,
            assigned_by_me,
            executed_by_self,
        }
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Share of tasks completed, between 0.0 and 1.0. Zero when there are no tasks.
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(TaskStatus::Completed) as f64 / self.total as f64
    }
}

fn is_user(email: &Option<String>, user: &User) -> bool {
    email
        .as_deref()
        .map_or(false, |email| email.eq_ignore_ascii_case(&user.email))
}
