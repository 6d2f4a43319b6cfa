use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::Notification;

/// The current user's notifications, newest first.
#[derive(Debug, Clone)]
pub struct NotificationsView {
    pub email: String,
    pub notifications: Vec<Notification>,
}

impl NotificationsView {
    /// Resolves the current user, then loads notifications for their email.
    pub async fn load(context: &Arc<AppContext>) -> Result<Self, AppError> {
        let user = context.current_user().await?;
        let notifications = context.notifications(&user.email).await?;
        Ok(Self::new(user.email, notifications))
    }

    pub fn new(email: String, mut notifications: Vec<Notification>) -> Self {
        // Undated entries sort last.
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            email,
            notifications,
        }
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}
