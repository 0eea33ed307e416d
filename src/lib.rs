pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod output;
pub mod store;
pub mod sync;
