pub mod calc;
pub mod config;
pub mod error;
pub mod gradebook;
pub mod grading;
pub mod import;
pub mod ipc;
pub mod logging;
