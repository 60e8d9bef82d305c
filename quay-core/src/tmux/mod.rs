pub mod cli;
pub mod mock;
pub mod provider;

pub use cli::CliTmuxProvider;
pub use provider::{TmuxProvider, TmuxWindow};
