//! SQLite implementations of the raw and output stores.

mod output_store;
mod raw_store;

pub use output_store::OutputStore;
pub use raw_store::RawStore;

/// Maximum rows rendered into a single multi-row INSERT.
pub(crate) const INSERT_CHUNK_SIZE: usize = 500;
