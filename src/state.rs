use crate::db::LinkRepository;
use crate::services::store::UrlStore;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Wrapped in `Arc` and handed to Axum's State extraction. All dependencies
/// are constructed at startup and injected here; there are no module-level
/// singletons.
#[derive(Clone)]
pub struct AppState {
    /// The URL store: code allocation, lookups, and expiry
    pub store: UrlStore,

    /// Storage handle used directly by the health check
    pub repository: Arc<dyn LinkRepository>,
}
