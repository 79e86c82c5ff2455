//! Declarative query criteria and their compilation.
//!
//! A [`Criteria`] describes what a query wants: filter conditions, a
//! projection, related-entity includes, ordering, grouping, a transaction
//! scope and two shaping flags. [`compile`] turns any criteria into a
//! [`QueryDescriptor`], the normalized form handed to the storage backend.
//!
//! # Usage
//!
//! ```ignore
//! use quarry::criteria::{compile, OrderBy, QueryCriteria};
//!
//! let criteria = QueryCriteria::new()
//!     .filter("status", "active")
//!     .order_by(OrderBy::asc("name"));
//!
//! let descriptor = compile(Some(&criteria));
//! ```
//!
//! The crate never interprets conditions or projections; both are forwarded
//! verbatim.

mod base;
mod compile;
mod identity;

pub use base::{Conditions, Criteria, Direction, OrderBy, QueryCriteria};
pub use compile::{compile, Pagination, QueryDescriptor, DEFAULT_PAGE_SIZE};
pub use identity::IdentityCriteria;
