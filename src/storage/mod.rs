// src/storage/mod.rs

pub mod key_state;
pub mod memory;

pub use key_state::{KeyState, KeyStateView};
pub use memory::KeyPool;
