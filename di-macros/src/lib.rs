//! Compile-time dependency injection derives for Dramatis.
//!
//! - `#[derive(Context)]` exposes every field of the root context through `FromRef`.
//! - `#[derive(FromContext)]` builds a service by resolving each of its fields
//!   from the context.
//!
//! Generated code refers to `crate::FromRef`, so the consuming crate re-exports
//! the trait at its root.

use proc_macro::TokenStream;

mod context;
mod fields;
mod from_context;

/// Derive `FromRef<Self>` for the type of every named field.
///
/// ```ignore
/// #[derive(Context, Clone)]
/// pub struct Context {
///     pub store: AppStore,
///     pub dialogue: AppDialogue,
/// }
///
/// // impl FromRef<Context> for AppStore { .. }
/// // impl FromRef<Context> for AppDialogue { .. }
/// ```
///
/// Two fields of the same type would produce conflicting impls; wrap one of
/// them in a newtype.
#[proc_macro_derive(Context)]
pub fn derive_context(input: TokenStream) -> TokenStream {
    context::derive_context_impl(input)
}

/// Derive `FromRef<Context>` for a service whose fields are all resolvable
/// from the context.
///
/// ```ignore
/// #[derive(FromContext, Clone)]
/// pub struct SimulationScheduler {
///     store: AppStore,
///     dialogue: AppDialogue,
///     config: Arc<Config>,
/// }
/// ```
///
/// The context type defaults to `Context`; override it with
/// `#[from_context(Context = "TestContext")]`.
#[proc_macro_derive(FromContext, attributes(from_context))]
pub fn derive_from_context(input: TokenStream) -> TokenStream {
    from_context::derive_from_context_impl(input)
}
