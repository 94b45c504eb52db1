//! Multi-variant object cache
//!
//! - `object`: the stored-object contract and its in-memory implementation
//! - `store`: the keyed, per-bitrate cache with best-fit lookup
//! - `housekeeping`: periodic eviction of finished, expired keys

mod housekeeping;
mod object;
mod store;

pub use housekeeping::Housekeeper;
pub use object::{MoqObject, ObjectHeader, StoredObject};
pub use store::{ObjectStore, Variants};
