//! SQL text generation: escaping, provisioning script, and parameterized statement templates.

pub mod escape;
pub mod script;
mod statements;
pub use escape::*;
pub use script::*;
pub use statements::*;
