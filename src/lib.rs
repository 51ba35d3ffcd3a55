//! Offline tracker for time spent on daily tasks. Every task belongs to a
//! calendar date and accumulates worked seconds through start/stop timers.
//! All durable state lives in a single JSON file owned by the
//! [store::task_store::TaskStore].
//!

pub mod cli;
pub mod store;
pub mod utils;
