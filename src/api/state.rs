use std::sync::Arc;

use crate::services::RecommendationContext;

/// Shared application state
///
/// The tables never change after startup, so handlers read them without locking.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<RecommendationContext>,
}

impl AppState {
    /// Wraps the reconciled tables for sharing across handlers
    pub fn new(context: RecommendationContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }
}
