//! Exam policy services
//!
//! Pure checks the exam page runs before letting the countdown start.

pub mod availability;

// Re-export main functions
pub use availability::*;
