pub mod commands;
pub mod render;
pub mod repl;

pub use repl::Shell;
