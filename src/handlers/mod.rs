//! HTTP handlers for generation and project history.

pub mod generate;
pub mod history;
pub use generate::*;
pub use history::*;
