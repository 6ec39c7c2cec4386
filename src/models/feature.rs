use std::{fmt::Display, str::FromStr};

/// Number of audio features tracked per record
pub const FEATURE_COUNT: usize = 11;

/// One named numeric dimension of a track's audio characteristics
///
/// The declaration order is the vector order used by every distance computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Popularity,
    Acousticness,
    Danceability,
    DurationMs,
    Energy,
    Instrumentalness,
    Liveness,
    Loudness,
    Speechiness,
    Tempo,
    Valence,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Popularity,
        Feature::Acousticness,
        Feature::Danceability,
        Feature::DurationMs,
        Feature::Energy,
        Feature::Instrumentalness,
        Feature::Liveness,
        Feature::Loudness,
        Feature::Speechiness,
        Feature::Tempo,
        Feature::Valence,
    ];

    /// Column name in snapshot files
    pub fn column(self) -> &'static str {
        match self {
            Feature::Popularity => "popularity",
            Feature::Acousticness => "acousticness",
            Feature::Danceability => "danceability",
            Feature::DurationMs => "duration_ms",
            Feature::Energy => "energy",
            Feature::Instrumentalness => "instrumentalness",
            Feature::Liveness => "liveness",
            Feature::Loudness => "loudness",
            Feature::Speechiness => "speechiness",
            Feature::Tempo => "tempo",
            Feature::Valence => "valence",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Feature {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|feature| feature.column() == s)
            .ok_or(())
    }
}

/// Parses a raw cell as a feature value
///
/// Empty cells, NaN and anything that is not a number are absent. Infinities
/// are kept.
pub fn coerce(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Renders a feature value back into a snapshot cell
pub fn render(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Feature values of a single record, each possibly absent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureValues([Option<f64>; FEATURE_COUNT]);

impl FeatureValues {
    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.0[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: Option<f64>) {
        self.0[feature.index()] = value;
    }

    /// Number of features with a value
    pub fn present_count(&self) -> usize {
        self.0.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.present_count() == FEATURE_COUNT
    }

    /// Prefers `other`'s value for every feature it has, keeping ours otherwise
    pub fn overlay(&self, other: &FeatureValues) -> FeatureValues {
        let mut merged = *self;
        for feature in Feature::ALL {
            if let Some(value) = other.get(feature) {
                merged.set(feature, Some(value));
            }
        }
        merged
    }

    /// Dense vector in `Feature::ALL` order with absent values as zero
    pub fn to_dense(&self) -> [f64; FEATURE_COUNT] {
        self.0.map(|v| v.unwrap_or(0.0))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, Option<f64>)> + '_ {
        Feature::ALL.into_iter().map(|feature| (feature, self.get(feature)))
    }
}

impl FromIterator<(Feature, Option<f64>)> for FeatureValues {
    fn from_iter<I: IntoIterator<Item = (Feature, Option<f64>)>>(iter: I) -> Self {
        let mut values = FeatureValues::default();
        for (feature, value) in iter {
            values.set(feature, value);
        }
        values
    }
}
