pub mod backend_kind;
pub mod policy;

pub use backend_kind::{ChannelKind, StoreKind};
pub use policy::{AlertPolicy, PolicyError, RetentionPolicy};
