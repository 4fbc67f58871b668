//! Exam Timer - reload-safe exam countdown with auto-submit
//!
//! This library provides the logic behind an exam page: a countdown that
//! survives reloads and submits the exam when time runs out, form autosave,
//! and the availability-window check. Host facilities are injected through
//! the traits in [`ports`].

pub mod config;
pub mod error;
pub mod ports;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{NotifyError, StoreError};
pub use services::{check_exam_availability, Availability};
pub use state::TimerState;
pub use tasks::{Autosave, CountdownController, CountdownHandle, TimerPorts, TimerSettings};
pub use utils::format_time;
