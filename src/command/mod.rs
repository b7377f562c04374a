//! External command execution with line-level output classification.

mod console;
mod error;
mod process;
mod select;

pub use console::*;
pub use error::CommandError;
pub use process::*;
pub use select::*;
