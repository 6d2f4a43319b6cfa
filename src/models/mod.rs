pub mod notification;
pub mod task;
pub mod user;

pub use notification::Notification;
pub use task::{Task, TaskInput, TaskStatus, TaskUpdate};
pub use user::User;
