//! In-process implementation of every repository trait.
//!
//! All tables sit behind one async mutex, so each repository call is a single
//! atomic unit, the same guarantee the PostgreSQL implementation gets from
//! transactions and conditional updates. Used by integration tests, local
//! demos and the admin CLI's `--in-memory` mode.

mod store;

pub use store::MemoryStore;
