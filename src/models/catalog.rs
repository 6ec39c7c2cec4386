use std::collections::HashMap;
use std::sync::Arc;

use serde::{ser::SerializeMap, Serialize, Serializer};

use super::feature::{coerce, Feature, FeatureValues, FEATURE_COUNT};
use super::table::{RawTable, TRACK_ID};
use crate::error::AppResult;

/// A candidate track with its audio features
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    pub track_id: String,
    pub features: FeatureValues,
    pub extra: Vec<String>,
    extra_columns: Arc<[String]>,
}

impl CatalogRecord {
    /// Value of a non-feature column such as `track_name` or `track_genre`
    pub fn extra(&self, column: &str) -> Option<&str> {
        self.extra_columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.extra.get(i))
            .map(String::as_str)
    }
}

impl Serialize for CatalogRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.extra.len() + FEATURE_COUNT))?;
        map.serialize_entry(TRACK_ID, &self.track_id)?;
        for (name, value) in self.extra_columns.iter().zip(&self.extra) {
            let value = (!value.is_empty()).then_some(value);
            map.serialize_entry(name, &value)?;
        }
        for (feature, value) in self.features.iter() {
            map.serialize_entry(feature.column(), &value.filter(|v| v.is_finite()))?;
        }
        map.end()
    }
}

/// The candidate catalog, one record per track in file order
#[derive(Debug, Clone, Default)]
pub struct CatalogTable {
    records: Vec<CatalogRecord>,
    by_track: HashMap<String, usize>,
}

impl CatalogTable {
    /// Types a raw catalog snapshot
    ///
    /// The key column and every feature column must be present. Cells that are
    /// not numbers become absent. Repeated track ids keep their first row.
    pub fn from_raw(raw: RawTable) -> AppResult<Self> {
        let raw = raw.dedup_columns();
        let key = raw.require_column(TRACK_ID, "catalog")?;

        let mut feature_positions = Vec::with_capacity(FEATURE_COUNT);
        for feature in Feature::ALL {
            feature_positions.push((feature, raw.require_column(feature.column(), "catalog")?));
        }

        let extra_positions: Vec<usize> = (0..raw.headers.len())
            .filter(|&i| i != key && !feature_positions.iter().any(|&(_, p)| p == i))
            .collect();
        let extra_columns: Arc<[String]> = extra_positions
            .iter()
            .map(|&i| raw.headers[i].clone())
            .collect();

        let mut records = Vec::with_capacity(raw.len());
        let mut by_track = HashMap::with_capacity(raw.len());
        let mut malformed = 0usize;
        let mut duplicates = 0usize;

        for row in &raw.rows {
            let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
            let track_id = cell(key).to_string();

            if by_track.contains_key(&track_id) {
                duplicates += 1;
                continue;
            }

            let features = feature_positions
                .iter()
                .map(|&(feature, i)| {
                    let value = coerce(cell(i));
                    if value.is_none() && !cell(i).trim().is_empty() {
                        tracing::trace!(track_id = %track_id, feature = %feature, raw = cell(i), "Coercion failed");
                        malformed += 1;
                    }
                    (feature, value)
                })
                .collect();

            by_track.insert(track_id.clone(), records.len());
            records.push(CatalogRecord {
                track_id,
                features,
                extra: extra_positions.iter().map(|&i| cell(i).to_string()).collect(),
                extra_columns: Arc::clone(&extra_columns),
            });
        }

        if malformed > 0 {
            tracing::warn!(malformed, "Catalog feature values could not be coerced, treating as absent");
        }
        if duplicates > 0 {
            tracing::info!(duplicates, "Dropped repeated catalog track ids");
        }

        tracing::info!(tracks = records.len(), "Loaded track catalog");

        Ok(Self { records, by_track })
    }

    pub fn get(&self, track_id: &str) -> Option<&CatalogRecord> {
        self.by_track.get(track_id).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
