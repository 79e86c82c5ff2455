//! Services built on the repository layer.
//!
//! Services are resolved from the application [`Context`](crate::context::Context)
//! with the `FromContext` derive macro.

mod query;

pub use query::{QueryService, QueryStats};
