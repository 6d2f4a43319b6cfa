pub mod auth;
pub mod client;
pub mod notifications;
pub mod tasks;

pub use client::ApiClient;
