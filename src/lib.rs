pub mod api;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod forms;
pub mod history;
pub mod logging;
pub mod render;
