//! Transfer entities.

pub mod expiry;
pub mod model;
pub mod state;

pub use expiry::{Expiry, ExpiryClass};
pub use model::{Transfer, expected_chunk_count};
pub use state::TransferState;
