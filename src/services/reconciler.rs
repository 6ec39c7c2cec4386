use std::path::PathBuf;
use std::time::Instant;

use crate::{
    db::SnapshotStore,
    error::AppResult,
    models::{CatalogTable, HistoryTable},
    services::RecommendationContext,
};

/// Merges catalog features into the listening history
///
/// For every feature, a present catalog value wins over the history value; the
/// history value is kept when the catalog has none or the track is not in the
/// catalog. Absent stays absent. The inputs are not modified, so running this
/// again on the same originals gives the same table.
pub fn reconcile(history: &HistoryTable, catalog: &CatalogTable) -> HistoryTable {
    if catalog.is_empty() {
        tracing::info!("Catalog is empty, history passes through unchanged");
        return history.clone();
    }

    let mut matched = 0usize;
    let mut overridden = 0usize;

    let records = history
        .records()
        .iter()
        .map(|record| match catalog.get(&record.track_id) {
            Some(entry) => {
                matched += 1;
                let merged = record.features.overlay(&entry.features);
                overridden += record
                    .features
                    .iter()
                    .filter(|&(feature, value)| value != merged.get(feature))
                    .count();
                record.with_features(merged)
            }
            None => record.clone(),
        })
        .collect();

    tracing::info!(
        rows = history.len(),
        matched,
        values_changed = overridden,
        "History reconciled against catalog"
    );

    history.with_records(records)
}

/// Snapshot locations used by the startup pipeline
#[derive(Debug, Clone)]
pub struct SnapshotPaths {
    pub history: PathBuf,
    pub catalog: PathBuf,
    /// Where the reconciled history is written; may equal `history`
    pub reconciled: PathBuf,
}

/// Startup pipeline: load both snapshots, reconcile, persist
pub struct Reconciler<S> {
    store: S,
    paths: SnapshotPaths,
}

impl<S: SnapshotStore> Reconciler<S> {
    pub fn new(store: S, paths: SnapshotPaths) -> Self {
        Self { store, paths }
    }

    /// Runs the pipeline and returns the context requests are served from
    ///
    /// Schema problems in either snapshot abort here. When the reconciled path is
    /// the history path the original file is overwritten.
    pub fn run(&self) -> AppResult<RecommendationContext> {
        let start = Instant::now();

        let history = HistoryTable::from_raw(self.store.load(&self.paths.history)?)?;
        let catalog = CatalogTable::from_raw(self.store.load(&self.paths.catalog)?)?;

        let reconciled = reconcile(&history, &catalog);

        if self.paths.reconciled == self.paths.history {
            tracing::warn!(
                path = %self.paths.history.display(),
                "Overwriting original history snapshot with reconciled table"
            );
        }
        self.store.save(&reconciled.to_raw(), &self.paths.reconciled)?;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            history_rows = reconciled.len(),
            catalog_tracks = catalog.len(),
            "Reconciliation completed"
        );

        Ok(RecommendationContext::new(reconciled, catalog))
    }
}
