#![doc = "The `taskforge_client` library crate."]
#![doc = ""]
#![doc = "This crate contains the client side of TaskForge: the REST API wrapper, the persisted"]
#![doc = "session with its inactivity logout, the query cache, and the view models built on top."]
#![doc = "The `taskforge` binary (`main.rs`) is a terminal front end over this library."]

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod storage;
pub mod views;

pub use crate::context::AppContext;
pub use crate::error::AppError;
