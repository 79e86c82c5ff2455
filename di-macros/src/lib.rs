//! Compile-time dependency injection macros for Quarry.
//!
//! - `#[derive(Context)]` turns a struct into a DI root whose fields are
//!   resolvable by type
//! - `#[derive(FromContext)]` builds a service by resolving each field from
//!   the root
//!
//! Generated code refers to `crate::FromRef`, which the consuming crate
//! defines (Quarry re-exports it from `quarry::di`).

use proc_macro::TokenStream;

mod context;
mod from_context;

/// Derive macro for the DI root.
///
/// Generates `impl FromRef<Root> for FieldType` for every field, so that
/// services can pull shared dependencies out of the root by type.
///
/// # Example
///
/// ```ignore
/// #[derive(Context, Clone)]
/// pub struct Context {
///     pub models: Arc<ModelRegistry>,
///     pub repositories: Arc<RepositoryRegistry>,
///     pub config: Arc<Config>,
/// }
///
/// // Generated:
/// // impl FromRef<Context> for Arc<ModelRegistry> { ... }
/// // impl FromRef<Context> for Arc<RepositoryRegistry> { ... }
/// // impl FromRef<Context> for Arc<Config> { ... }
/// ```
#[proc_macro_derive(Context)]
pub fn derive_context(input: TokenStream) -> TokenStream {
    context::derive_context_impl(input)
}

/// Derive macro for services built from a DI root.
///
/// Each field is resolved with `FromRef::from_ref(ctx)`, except fields marked
/// `#[from_context(default)]`, which start from `Default::default()`. The
/// root type defaults to `Context` and can be overridden with
/// `#[from_context(Context = "MyRoot")]`.
///
/// # Example
///
/// ```ignore
/// #[derive(FromContext, Clone)]
/// pub struct QueryService {
///     repositories: Arc<RepositoryRegistry>,
///     #[from_context(default)]
///     stats: Arc<QueryStats>,
/// }
///
/// // Generated:
/// // impl FromRef<Context> for QueryService {
/// //     fn from_ref(ctx: &Context) -> Self {
/// //         Self {
/// //             repositories: <Arc<RepositoryRegistry> as FromRef<Context>>::from_ref(ctx),
/// //             stats: <Arc<QueryStats> as Default>::default(),
/// //         }
/// //     }
/// // }
/// ```
#[proc_macro_derive(FromContext, attributes(from_context))]
pub fn derive_from_context(input: TokenStream) -> TokenStream {
    from_context::derive_from_context_impl(input)
}
