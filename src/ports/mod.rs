//! Host ports
//!
//! Everything the exam page gets from its host environment (storage, timers,
//! the timer element, the exam form, notifications) sits behind one of these
//! traits so the timer logic can run against a real runtime or a simulated one.

pub mod clock;
pub mod display;
pub mod form;
pub mod notifier;
pub mod scheduler;
pub mod store;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use display::{DisplaySink, ElementDisplay, TerminalDisplay};
pub use form::{FieldKind, FormField, HostForm, MemoryForm};
pub use notifier::{LogNotifier, NotificationPermission, Notifier};
pub use scheduler::{ManualScheduler, Scheduler, TaskHandle, TokioScheduler};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
