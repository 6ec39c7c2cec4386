use std::sync::Arc;

use serde::{ser::SerializeMap, Serialize, Serializer};

use super::feature::{coerce, render, Feature, FeatureValues, FEATURE_COUNT};
use super::table::{RawTable, TRACK_ID};
use crate::error::AppResult;

/// Where a snapshot column's value comes from when writing the table back out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    TrackId,
    Feature(Feature),
    Extra(usize),
}

/// One listening event with whatever audio features are known for it
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub track_id: String,
    pub features: FeatureValues,
    /// Non-feature cells, named by `extra_columns`
    pub extra: Vec<String>,
    extra_columns: Arc<[String]>,
}

impl HistoryRecord {
    /// Value of a non-feature column such as `track_name` or `played_at`
    pub fn extra(&self, column: &str) -> Option<&str> {
        self.extra_columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.extra.get(i))
            .map(String::as_str)
    }

    /// Copy of this record carrying different feature values
    pub fn with_features(&self, features: FeatureValues) -> HistoryRecord {
        HistoryRecord {
            features,
            ..self.clone()
        }
    }
}

impl Serialize for HistoryRecord {
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

/// The listener's history, typed for feature work but keeping its file layout
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTable {
    layout: Vec<Column>,
    extra_columns: Arc<[String]>,
    records: Vec<HistoryRecord>,
}

impl HistoryTable {
    /// Types a raw history snapshot
    ///
    /// Duplicate columns collapse to their first occurrence. Feature columns the
    /// file lacks are added as absent and appended to the layout. Unparseable
    /// feature cells become absent.
    pub fn from_raw(raw: RawTable) -> AppResult<Self> {
        let raw = raw.dedup_columns();
        let key = raw.require_column(TRACK_ID, "history")?;

        let mut layout = Vec::with_capacity(raw.headers.len());
        let mut extra_columns = Vec::new();
        let mut feature_positions = Vec::new();
        let mut extra_positions = Vec::new();

        for (i, name) in raw.headers.iter().enumerate() {
            if i == key {
                layout.push(Column::TrackId);
            } else if let Ok(feature) = name.parse::<Feature>() {
                layout.push(Column::Feature(feature));
                feature_positions.push((feature, i));
            } else {
                layout.push(Column::Extra(extra_columns.len()));
                extra_columns.push(name.clone());
                extra_positions.push(i);
            }
        }

        for feature in Feature::ALL {
            if !layout.contains(&Column::Feature(feature)) {
                tracing::debug!(feature = %feature, "History snapshot lacks feature column");
                layout.push(Column::Feature(feature));
            }
        }

        let extra_columns: Arc<[String]> = extra_columns.into();
        let mut malformed = 0usize;

        let records = raw
            .rows
            .iter()
            .map(|row| {
                let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
                let features = feature_positions
                    .iter()
                    .map(|&(feature, i)| {
                        let value = coerce(cell(i));
                        if value.is_none() && !cell(i).trim().is_empty() {
                            malformed += 1;
                        }
                        (feature, value)
                    })
                    .collect();

                HistoryRecord {
                    track_id: cell(key).to_string(),
                    features,
                    extra: extra_positions.iter().map(|&i| cell(i).to_string()).collect(),
                    extra_columns: Arc::clone(&extra_columns),
                }
            })
            .collect::<Vec<_>>();

        if malformed > 0 {
            tracing::warn!(malformed, "History feature values could not be parsed, treating as absent");
        }

        tracing::info!(
            rows = records.len(),
            columns = layout.len(),
            "Loaded listening history"
        );

        Ok(Self {
            layout,
            extra_columns,
            records,
        })
    }

    /// Renders the table back to a raw snapshot in its file layout
    pub fn to_raw(&self) -> RawTable {
        let headers = self
            .layout
            .iter()
            .map(|column| match column {
                Column::TrackId => TRACK_ID.to_string(),
                Column::Feature(feature) => feature.column().to_string(),
                Column::Extra(i) => self.extra_columns[*i].clone(),
            })
            .collect();

        let rows = self
            .records
            .iter()
            .map(|record| {
                self.layout
                    .iter()
                    .map(|column| match column {
                        Column::TrackId => record.track_id.clone(),
                        Column::Feature(feature) => render(record.features.get(*feature)),
                        Column::Extra(i) => record.extra[*i].clone(),
                    })
                    .collect()
            })
            .collect();

        RawTable::new(headers, rows)
    }

    /// New table with the same layout and the given records
    pub fn with_records(&self, records: Vec<HistoryRecord>) -> HistoryTable {
        HistoryTable {
            layout: self.layout.clone(),
            extra_columns: Arc::clone(&self.extra_columns),
            records,
        }
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
