mod builtin;
mod error;
#[allow(clippy::module_inception)]
mod executor;
mod process;
mod simple;
mod status;

pub use executor::Executor;
pub use status::ExitStatus;
