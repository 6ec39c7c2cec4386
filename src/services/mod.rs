pub mod profile;
pub mod ranker;
pub mod reconciler;

pub use profile::{build_profile, UserProfile};
pub use ranker::{RankParams, Recommendation};
pub use reconciler::{reconcile, Reconciler, SnapshotPaths};

use rand::Rng;

use crate::{
    error::InsufficientData,
    models::{CatalogTable, HistoryTable},
};

/// Read-only tables every recommendation is computed from
///
/// Built once at startup, after reconciliation, and shared between requests.
#[derive(Debug, Clone)]
pub struct RecommendationContext {
    history: HistoryTable,
    catalog: CatalogTable,
}

impl RecommendationContext {
    pub fn new(history: HistoryTable, catalog: CatalogTable) -> Self {
        Self { history, catalog }
    }

    pub fn history(&self) -> &HistoryTable {
        &self.history
    }

    pub fn catalog(&self) -> &CatalogTable {
        &self.catalog
    }

    /// Builds the listener profile and samples tracks dissimilar to it
    pub fn recommend<R: Rng + ?Sized>(
        &self,
        params: RankParams,
        rng: &mut R,
    ) -> Result<Vec<Recommendation>, InsufficientData> {
        let profile = build_profile(&self.history)?;
        ranker::recommend(&self.catalog, &profile, params, rng)
    }
}
