pub mod alert;
pub mod event;
pub mod failure_window;

pub use alert::FailureAlert;
pub use event::{EventError, EventKind, ServiceEvent};
pub use failure_window::{FailureSnapshot, FailureSource, FailureWindow};
