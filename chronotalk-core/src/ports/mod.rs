//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod clock;
mod storage;
mod text_generator;

pub use clock::{Clock, SystemClock};
pub use storage::{DurableStore, StorageEvent, StorageEvents};
pub use text_generator::TextGenerator;
