pub mod action;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod executor;
pub mod form;
pub mod input;
pub mod keyboard;
pub mod palette;
pub mod paths;
pub mod resolver;
pub mod session;
pub mod state;
pub mod template;
pub mod tmux;
pub mod tool;
pub mod tree;

// Re-export commonly used types at crate root
pub use action::{Action, ActionKind, ActionResult};
pub use config::Config;
pub use dispatch::{DispatchEvent, Dispatcher, Effect, UiState};
pub use event::AppEvent;
pub use executor::{ExecError, Executor, SessionExecutor};
pub use keyboard::KeyEvent;
pub use resolver::Resolver;
pub use session::{Session, SessionProvider};
pub use state::AppState;
pub use tmux::TmuxProvider;
pub use tree::TreeRow;
