//! Decoding of tshark records into metric-ready packet summaries.
//!
//! Everything in here is pure: no I/O, no shared state.

pub mod locality;
pub mod protocols;
pub mod record;
pub mod types;
pub mod tzsp;

pub use locality::classify;
pub use record::parse_record;
pub use types::{DecodeOutcome, DecodedPacket, Locality, RawRecord, RecordKind};
pub use tzsp::decode;
