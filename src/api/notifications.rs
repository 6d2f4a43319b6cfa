use super::client::{ApiClient, Auth};
use crate::error::AppError;
use crate::models::Notification;

impl ApiClient {
    /// `GET /notifications/:email`
    pub async fn notifications(&self, email: &str) -> Result<Vec<Notification>, AppError> {
        self.get(&["notifications", email], Auth::Bearer).await
    }
}
