//! Shared library for the content calendar Lambda functions.
//!
//! This crate provides the proxy forwarding logic used by the Lambda binaries,
//! the task model, a typed client for the tasks collection, and the calendar
//! view state driven by that client.

pub mod calendar;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod planner;
pub mod proxy;
pub mod rewrite;

pub use calendar::{group_by_month, Action, CalendarState, ViewMode};
pub use client::{TaskStore, TasksClient};
pub use config::Config;
pub use error::{Error, Result};
pub use http::ApiResponse;
pub use models::{Category, NewTask, Status, Task, TaskUpdate, TeamMember, YearMonth, TEAM};
pub use planner::Planner;
pub use proxy::{ForwardPlan, Proxy};
pub use rewrite::upstream_path;
