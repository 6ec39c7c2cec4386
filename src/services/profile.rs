use crate::{
    error::InsufficientData,
    models::{Feature, FeatureValues, HistoryTable, FEATURE_COUNT},
};

/// History rows need at least this many known features to count toward the profile
pub const MIN_PRESENT_FEATURES: usize = 5;

/// The listener's aggregate feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    /// Per-feature mean; absent when no qualifying row knows the feature
    pub features: FeatureValues,
    /// Number of history rows the means were taken over
    pub rows_used: usize,
}

impl UserProfile {
    /// Dense vector in `Feature::ALL` order, unknown features as zero
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        self.features.to_dense()
    }
}

/// Builds the profile using the default eligibility threshold
pub fn build_profile(history: &HistoryTable) -> Result<UserProfile, InsufficientData> {
    build_profile_with_threshold(history, MIN_PRESENT_FEATURES)
}

/// Builds the profile from rows with at least `min_present` known features
///
/// Each feature's mean is over the rows that know it, so a row missing one
/// feature still counts toward all the others.
pub fn build_profile_with_threshold(
    history: &HistoryTable,
    min_present: usize,
) -> Result<UserProfile, InsufficientData> {
    let mut sums = [0.0f64; FEATURE_COUNT];
    let mut counts = [0usize; FEATURE_COUNT];
    let mut rows_used = 0usize;

    for record in history
        .records()
        .iter()
        .filter(|r| r.features.present_count() >= min_present)
    {
        rows_used += 1;
        for (i, (_, value)) in record.features.iter().enumerate() {
            if let Some(v) = value {
                sums[i] += v;
                counts[i] += 1;
            }
        }
    }

    if rows_used == 0 {
        tracing::debug!(
            history_rows = history.len(),
            min_present,
            "No history rows meet the feature threshold"
        );
        return Err(InsufficientData::NoHistoryFeatures);
    }

    let features = Feature::ALL
        .into_iter()
        .enumerate()
        .map(|(i, feature)| {
            let mean = (counts[i] > 0).then(|| sums[i] / counts[i] as f64);
            (feature, mean)
        })
        .collect();

    tracing::debug!(rows_used, "User profile built");

    Ok(UserProfile { features, rows_used })
}
