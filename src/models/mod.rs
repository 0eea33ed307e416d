pub mod task;
pub mod document;

pub use task::*;
pub use document::*;
