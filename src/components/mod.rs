//! Reusable interactive widgets
//!
//! Components own their own input state and render into a frame area. They
//! report what a key did but never touch the installation configuration.

pub mod keybindings;
pub mod select_list;
pub mod text_input;
pub mod toggle;

pub use keybindings::{KeyAction, KeybindingContext};
pub use select_list::{ListEntry, ListEvent, SelectList};
pub use text_input::TextInput;
pub use toggle::Toggle;
