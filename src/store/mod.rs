pub mod json_store;
pub mod maintenance;
pub mod task_ops;

pub use json_store::JsonStore;
