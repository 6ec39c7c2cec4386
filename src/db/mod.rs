pub mod snapshot;

pub use snapshot::{CsvSnapshotStore, SnapshotStore};

#[cfg(test)]
pub use snapshot::MockSnapshotStore;
