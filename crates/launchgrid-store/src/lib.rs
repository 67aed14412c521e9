//! Persistent organisation metadata for the Launchgrid catalog.
//!
//! Four record sets (hidden ids, folders, categories and sort weights) are
//! stored as independent, versioned JSON blobs behind a small key-value
//! interface. Each record set is read and written as a unit.

mod codec;
mod kv;
mod metadata;
mod records;

pub use codec::*;
pub use kv::*;
pub use metadata::*;
pub use records::*;
