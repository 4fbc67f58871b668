//! State management module
//!
//! Plain data owned by the timer and autosave components.

pub mod form_state;
pub mod timer_state;

// Re-export main types
pub use form_state::{FieldValue, FormSnapshot};
pub use timer_state::{TickEvents, TimerState};
