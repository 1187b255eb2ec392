//! 配置、状态、后台任务

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::{AppState, Collaborators};
pub use tasks::BackgroundTasks;
