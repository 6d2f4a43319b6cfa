use validator::Validate;

use super::client::{ApiClient, Auth};
use crate::error::AppError;
use crate::models::{Task, TaskInput, TaskUpdate};

impl ApiClient {
    /// `GET /tasks`
    pub async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        self.get(&["tasks"], Auth::Bearer).await
    }

    /// `GET /tasks/:id`
    pub async fn get_task(&self, id: &str) -> Result<Task, AppError> {
        self.get(&["tasks", id], Auth::Bearer).await
    }

    /// `POST /tasks`
    pub async fn create_task(&self, input: &TaskInput) -> Result<Task, AppError> {
        input.validate()?;
        self.post(&["tasks"], input, Auth::Bearer).await
    }

    /// `PATCH /tasks/:id`
    ///
    /// An update with no fields set is rejected before reaching the API.
    pub async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task, AppError> {
        if update.is_empty() {
            return Err(AppError::ValidationError("Nothing to update".into()));
        }
        update.validate()?;
        self.patch(&["tasks", id], update, Auth::Bearer).await
    }
}
