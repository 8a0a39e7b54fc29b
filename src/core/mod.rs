// src/core/mod.rs

pub mod clock;
pub mod key_rotation;

pub use clock::{Clock, SystemClock};
pub use key_rotation::mask_key;
