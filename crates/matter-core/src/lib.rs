pub mod canonical;
pub mod error;
pub mod fsutil;
pub mod hash;

pub use canonical::{canonical_json, Canonical};
pub use error::MatterError;
pub use fsutil::{atomic_write_bytes, atomic_write_json_pretty, ensure_dir};
pub use hash::run_hash;
