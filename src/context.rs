//! Application context providing dependency injection root.

use std::sync::Arc;

use crate::config::Config;
use crate::di::Context as ContextDerive;
use crate::llm::{DialogueWriter, EntityWriter};
use crate::repositories::Store;

/// Shared persistence backend.
pub type AppStore = Arc<dyn Store>;

/// Shared backstory and text-trait writer.
pub type AppWriter = Arc<dyn EntityWriter>;

/// Shared dialogue writer.
pub type AppDialogue = Arc<dyn DialogueWriter>;

/// Root application context for dependency injection.
///
/// `#[derive(Context)]` makes every field extractable via `FromRef`, so
/// services declare the collaborators they need and resolve them with
/// `Service::from_ref(&ctx)`.
#[derive(ContextDerive, Clone)]
pub struct Context {
    pub store: AppStore,
    pub writer: AppWriter,
    pub dialogue: AppDialogue,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl Context {
    /// Creates a new context with the given dependencies.
    pub fn new(
        store: impl Store + 'static,
        writer: impl EntityWriter + 'static,
        dialogue: impl DialogueWriter + 'static,
        config: Config,
    ) -> Self {
        Self {
            store: Arc::new(store),
            writer: Arc::new(writer),
            dialogue: Arc::new(dialogue),
            config: Arc::new(config),
        }
    }
}
