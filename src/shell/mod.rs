mod executor;
mod expand;
mod parser;
mod readline;
#[allow(clippy::module_inception)]
mod shell;

pub use shell::Shell;
