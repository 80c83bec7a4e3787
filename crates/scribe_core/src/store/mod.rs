//! The directory-addressed stage store.
//!
//! Each stage of the pipeline is one folder under the store root. The store
//! owns directory creation, an in-memory occupancy index, atomic writes into
//! stages and per-logical-name exclusivity claims.

mod store;

pub use store::{ClaimGuard, StageStore};
