pub mod alert_tracker;
pub mod retention;
pub mod scanner;
