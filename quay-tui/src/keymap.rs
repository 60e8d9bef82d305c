use quay_core::{
    config::{KeysConfig, UiCommand},
    dispatch::UiState,
    keyboard::KeyEvent,
};

/// Resolve a key into the interface command bound to it in the current UI state.
/// Keys without an interface binding fall through to text entry or session keybindings.
pub fn ui_command(key: &KeyEvent, state: UiState, keys: &KeysConfig) -> Option<UiCommand> {
    keys.keymap_for_state(state)
        .get(key)
        .copied()
        .filter(|command| *command != UiCommand::Noop)
}
