//! Background Tasks Module
//!
//! Periodic maintenance for the in-process store.

mod cleanup;

pub use cleanup::spawn_cleanup_task;
