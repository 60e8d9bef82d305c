pub mod app;
pub mod components;
pub mod keymap;
pub mod theme;

pub use app::{App, OpenAction, Services, run};
pub use theme::Theme;
