use std::sync::Arc;

use crate::db::DbPool;
use crate::registry::Registry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex> (accounts only)
    pub db: DbPool,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Presence registry: phone number -> live connection
    pub registry: Arc<Registry>,
}
