//! Generic repositories over backend model handles.
//!
//! A [`Repository`] orchestrates reads and writes for one model: it compiles
//! criteria, applies field protection, [`SaveHooks`] and optional
//! [`Validator`] gating around writes, and normalizes backend failures.
//! A [`RepositoryRegistry`] holds the application's repositories by name.

mod base;
mod hooks;
mod registry;
mod validation;

pub use base::{remove_protected_fields, Repository, PROTECTED_FIELDS};
pub use hooks::{Phase, SaveHooks, Subject, TracingHooks};
pub use registry::{RepositoryDefinition, RepositoryRegistry};
pub use validation::{FieldKind, FieldRule, Schema, Validation, ValidationFailure, Validator};
