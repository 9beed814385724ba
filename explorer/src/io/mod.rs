//! I/O helpers: configuration, persistence, and the robot boundary.

pub mod config;
pub mod init;
pub mod mission_log;
pub mod robot;
pub mod sim;
pub mod snapshot_store;
