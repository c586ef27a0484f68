//! Learner progress persistence.
//!
//! The engine never owns progress state: it reads and writes through an
//! injected [`ProgressStore`] and computes everything else from a
//! [`ProgressSnapshot`].
//!
//! ## Stores
//!
//! - [`MemoryStore`] keeps records in process memory (tests, embedding).
//! - [`JsonFileStore`] keeps all learners in one JSON file, rewritten
//!   atomically on every write (the CLI store).

pub mod file;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use snapshot::{DayRecord, ProgressSnapshot};
pub use store::{
    CompletionRecord, PersistenceError, ProgressStore, UnitKey, UnitKeyError,
};
