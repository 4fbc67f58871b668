//! Timer-driven tasks module
//!
//! This module contains the components that run on scheduled ticks.

pub mod autosave;
pub mod countdown;

// Re-export main types
pub use autosave::{Autosave, AutosaveHandle, DEFAULT_AUTOSAVE_INTERVAL};
pub use countdown::{
    CountdownController, CountdownHandle, TimerPorts, TimerSettings, AUTO_SUBMIT_FIELD,
    DEFAULT_DEADLINE_KEY, TIME_UP_MESSAGE,
};
