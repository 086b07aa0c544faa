//! Session store adapters
//!
//! - [`InMemorySessionStore`] - process-local, used by the simulator and tests
//! - [`FileSessionStore`] - one JSON document per session on disk

mod channels;
mod file;
mod memory;

pub use file::FileSessionStore;
pub use memory::InMemorySessionStore;
