pub mod aggregate;
pub mod entities;
pub mod export;
pub mod task_store;
