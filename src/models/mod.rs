pub mod catalog;
pub mod feature;
pub mod history;
pub mod table;

pub use catalog::{CatalogRecord, CatalogTable};
pub use feature::{Feature, FeatureValues, FEATURE_COUNT};
pub use history::{HistoryRecord, HistoryTable};
pub use table::{RawTable, TRACK_ID};
