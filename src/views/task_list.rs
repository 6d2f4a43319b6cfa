use std::sync::Arc;

use super::{page_count, paginate, Page, DEFAULT_PAGE_SIZE};
use crate::context::AppContext;
use crate::error::AppError;
use crate::models::{Task, TaskStatus};

/// Criteria for narrowing the task list. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    /// Case-insensitive match against name and description.
    pub search: Option<String>,
    /// Email of the assignee.
    pub assigned_to: Option<String>,
}

impl TaskFilter {
    pub fn by_status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(assignee) = &self.assigned_to {
            match &task.assigned_to {
                Some(assigned) if assigned.eq_ignore_ascii_case(assignee) => {}
                _ => return false,
            }
        }
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty()
                && !task.name.to_lowercase().contains(&needle)
                && !task.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }

    /// The tasks that match, in their original order.
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        tasks.iter().filter(|task| self.matches(task)).cloned().collect()
    }
}

/// The filtered, paginated task list.
#[derive(Debug, Clone)]
pub struct TaskListView {
    page_size: usize,
    tasks: Vec<Task>,
}

impl TaskListView {
    /// Loads tasks through the shared cache and applies `filter`.
    pub async fn load(
        context: &Arc<AppContext>,
        filter: TaskFilter,
        page_size: usize,
    ) -> Result<Self, AppError> {
        let tasks = context.tasks().await?;
        Ok(Self::from_tasks(&tasks, filter, page_size))
    }

    pub fn from_tasks(tasks: &[Task], filter: TaskFilter, page_size: usize) -> Self {
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        Self {
            tasks: filter.apply(tasks),
            page_size,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        page_count(self.tasks.len(), self.page_size)
    }

    pub fn page(&self, number: usize) -> Option<Page<'_, Task>> {
        paginate(&self.tasks, self.page_size, number)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
