//! Quarry - criteria-driven generic repositories.
//!
//! Callers describe reads with [`criteria::Criteria`] objects, which compile
//! into backend-neutral [`criteria::QueryDescriptor`]s. A
//! [`repository::Repository`] runs those descriptors and orchestrates writes
//! (field protection, hooks, validation) over a [`backend::ModelHandle`],
//! and a [`repository::RepositoryRegistry`] exposes repositories by name.

pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
pub mod criteria;
pub mod di;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

// Re-export FromRef at crate root for di-macros generated code
pub use di::FromRef;
