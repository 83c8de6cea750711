//! Background Tasks Module
//!
//! - Cache sweep: removes expired cache entries at the configured interval
//! - Event receivers live in [`crate::messaging::receiver`]

mod cleanup;

pub use cleanup::spawn_cleanup_task;
