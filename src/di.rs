//! Dependency injection infrastructure.
//!
//! Compile-time wiring through the `FromRef` trait and the derive macros from
//! `di-macros`:
//!
//! - `FromRef<T>`: extract a value from a reference to `T`
//! - `#[derive(Context)]`: make each field of the root extractable by type
//! - `#[derive(FromContext)]`: build a service by resolving each of its fields
//!
//! # Example
//!
//! ```ignore
//! use quarry::context::Context;
//! use quarry::services::QueryService;
//! use quarry::FromRef;
//!
//! let ctx = Context::from_config(config)?;
//! let queries = QueryService::from_ref(&ctx);
//! let users = queries.find("User", Some(r#"{"where": {"active": true}}"#)).await?;
//! ```

/// Extracts a value from a reference to another type.
///
/// Types that implement `FromRef<T>` can be built from `&T`.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

/// Any Clone type can be extracted from itself.
impl<T: Clone> FromRef<T> for T {
    fn from_ref(input: &T) -> Self {
        input.clone()
    }
}

pub use di_macros::{Context, FromContext};
