//! Device health data store boundary.
//!
//! The store itself is a collaborator; this module defines the contract the
//! pipeline needs from it, how records are derived from a capture, and two
//! sink implementations (in-memory and a JSON-lines journal).

mod journal;
mod memory;
mod record;
mod sink;

pub use journal::JournalHealthSink;
pub use memory::MemoryHealthSink;
pub use record::{build_record, validate_estimate, DeviceTimeZone};
pub use sink::{update_record, HealthDataSink, UpdateError};
