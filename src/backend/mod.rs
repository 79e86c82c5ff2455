//! Storage backend abstraction.
//!
//! The repository layer never performs I/O itself. Each entity type is served
//! by a [`ModelHandle`] that executes compiled [`QueryDescriptor`]s and
//! mutation primitives, and a [`ModelRegistry`] resolves model names to
//! handles at repository construction.
//!
//! # Implementing a Backend
//!
//! 1. Create a handle struct per model (or one generic handle parameterized by table)
//! 2. Implement [`ModelHandle`], translating descriptors into native queries
//! 3. Report failures as [`BackendError`], filling the driver message and
//!    field errors when the driver exposes them
//! 4. Register handles in a [`ModelRegistry`]
//!
//! [`memory`] provides an in-process implementation.
//!
//! [`QueryDescriptor`]: crate::criteria::QueryDescriptor

mod models;
mod traits;

pub mod memory;

pub use models::ModelRegistry;
pub use traits::{BackendError, ModelHandle};
