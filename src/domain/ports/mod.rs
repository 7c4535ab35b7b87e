pub mod clock;
pub mod notifier;
pub mod probe;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use notifier::{NotificationChannel, NotificationError};
pub use probe::{ProbeError, ServiceProbe};
pub use store::{EventStore, StoreError};
