use rand::Rng;
use serde::Serialize;

use crate::{
    error::{AppError, AppResult, InsufficientData},
    models::{CatalogRecord, CatalogTable, FEATURE_COUNT},
    services::profile::UserProfile,
};

pub const DEFAULT_LIMIT: usize = 20;
pub const DEFAULT_PERCENTILE: f64 = 0.5;

/// Distance reported when either vector has zero length
///
/// A zero vector has no direction, so it is treated as orthogonal to everything.
pub const ZERO_NORM_DISTANCE: f64 = 1.0;

/// Validated recommendation request parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankParams {
    limit: usize,
    percentile: f64,
}

impl Default for RankParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            percentile: DEFAULT_PERCENTILE,
        }
    }
}

impl RankParams {
    /// `limit` must be at least 1 and `percentile` within [0, 1]
    pub fn new(limit: usize, percentile: f64) -> AppResult<Self> {
        if limit < 1 {
            return Err(AppError::InvalidInput("limit must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&percentile) {
            return Err(AppError::InvalidInput(format!(
                "percentile must be between 0 and 1, got {}",
                percentile
            )));
        }
        Ok(Self { limit, percentile })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn percentile(&self) -> f64 {
        self.percentile
    }
}

/// A catalog track picked for the listener
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub track: CatalogRecord,
    /// Cosine distance from the profile; `None` when it was not a finite number
    pub dissimilarity: Option<f64>,
}

/// `1 - cos(a, b)`, clamped to [0, 2]
///
/// Returns [`ZERO_NORM_DISTANCE`] when either vector has zero length. Non-finite
/// inputs produce NaN.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return ZERO_NORM_DISTANCE;
    }

    (1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0)
}

/// Catalog tracks in the most dissimilar `percentile` slice, most dissimilar first
///
/// Only tracks with every feature known are candidates. The slice holds
/// `floor(candidates * percentile)` tracks, at least one. Equal distances keep
/// catalog order; NaN distances rank below every number.
pub fn dissimilar_pool<'a>(
    catalog: &'a CatalogTable,
    profile: &UserProfile,
    percentile: f64,
) -> Result<Vec<(&'a CatalogRecord, f64)>, InsufficientData> {
    let target = profile.to_vector();

    let mut scored: Vec<(&CatalogRecord, f64)> = catalog
        .records()
        .iter()
        .filter(|record| record.features.is_complete())
        .map(|record| {
            let vector: [f64; FEATURE_COUNT] = record.features.to_dense();
            (record, cosine_distance(&vector, &target))
        })
        .collect();

    if scored.is_empty() {
        return Err(InsufficientData::NoCompleteCandidates);
    }

    let rank_key = |d: f64| if d.is_nan() { f64::NEG_INFINITY } else { d };
    scored.sort_by(|(_, a), (_, b)| rank_key(*b).total_cmp(&rank_key(*a)));

    let cutoff = ((scored.len() as f64 * percentile).floor() as usize).clamp(1, scored.len());

    tracing::debug!(
        candidates = scored.len(),
        cutoff,
        "Dissimilar pool selected"
    );

    scored.truncate(cutoff);
    Ok(scored)
}

/// Picks up to `limit` tracks at random from the dissimilar pool
///
/// The pool is returned whole when it is no larger than `limit`. Sampling is
/// unweighted and without replacement; the result order carries no meaning.
pub fn recommend<R: Rng + ?Sized>(
    catalog: &CatalogTable,
    profile: &UserProfile,
    params: RankParams,
    rng: &mut R,
) -> Result<Vec<Recommendation>, InsufficientData> {
    let pool = dissimilar_pool(catalog, profile, params.percentile)?;

    let picked: Vec<(&CatalogRecord, f64)> = if pool.len() > params.limit {
        rand::seq::index::sample(rng, pool.len(), params.limit)
            .into_iter()
            .map(|i| pool[i])
            .collect()
    } else {
        pool
    };

    tracing::debug!(returned = picked.len(), limit = params.limit, "Recommendations sampled");

    Ok(picked
        .into_iter()
        .map(|(track, distance)| Recommendation {
            track: track.clone(),
            dissimilarity: distance.is_finite().then_some(distance),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feature, HistoryTable, RawTable};
    use crate::services::profile::build_profile;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn headers() -> Vec<String> {
        let mut headers = vec!["track_id".to_string()];
        headers.extend(Feature::ALL.iter().map(|f| f.column().to_string()));
        headers
    }

    /// Row with popularity and acousticness set, every other feature zero
    fn row(id: &str, popularity: f64, acousticness: f64) -> Vec<String> {
        let mut row = vec![id.to_string(), popularity.to_string(), acousticness.to_string()];
        row.extend(std::iter::repeat("0".to_string()).take(FEATURE_COUNT - 2));
        row
    }

    /// Ten tracks sweeping from acoustic-heavy (`t0`) to popularity-heavy (`t9`)
    fn linear_catalog() -> CatalogTable {
        let rows = (0..10)
            .map(|i| row(&format!("t{}", i), (i + 1) as f64, (10 - i) as f64))
            .collect();
        CatalogTable::from_raw(RawTable::new(headers(), rows)).unwrap()
    }

    /// Mean of two history rows: popularity 10, acousticness 1
    fn popular_profile() -> UserProfile {
        let history = HistoryTable::from_raw(RawTable::new(
            headers(),
            vec![row("h1", 9.0, 0.0), row("h2", 11.0, 2.0)],
        ))
        .unwrap();
        build_profile(&history).unwrap()
    }

    fn ids(recommendations: &[Recommendation]) -> HashSet<String> {
        recommendations.iter().map(|r| r.track.track_id.clone()).collect()
    }

    #[test]
    fn test_params_validation() {
        assert!(RankParams::new(1, 0.0).is_ok());
        assert!(RankParams::new(5, 1.0).is_ok());
        assert!(matches!(RankParams::new(0, 0.5), Err(AppError::InvalidInput(_))));
        assert!(matches!(RankParams::new(5, 1.5), Err(AppError::InvalidInput(_))));
        assert!(matches!(RankParams::new(5, -0.1), Err(AppError::InvalidInput(_))));
        assert!(matches!(RankParams::new(5, f64::NAN), Err(AppError::InvalidInput(_))));
        assert_eq!(RankParams::default(), RankParams::new(20, 0.5).unwrap());
    }

    #[test]
    fn test_cosine_distance() {
        assert!((cosine_distance(&[1.0, 0.0], &[2.0, 0.0])).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 3.0]) - 1.0).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 1.0], &[-1.0, -1.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_distance_zero_norm_convention() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 2.0]), ZERO_NORM_DISTANCE);
        assert_eq!(cosine_distance(&[1.0, 2.0], &[0.0, 0.0]), ZERO_NORM_DISTANCE);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[0.0, 0.0]), ZERO_NORM_DISTANCE);
    }

    #[test]
    fn test_pool_is_most_dissimilar_slice_in_descending_order() {
        let catalog = linear_catalog();
        let pool = dissimilar_pool(&catalog, &popular_profile(), 0.3).unwrap();

        let ids: Vec<&str> = pool.iter().map(|(r, _)| r.track_id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2"]);
        assert!(pool.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_result_capped_by_pool_not_limit() {
        let catalog = linear_catalog();
        let params = RankParams::new(5, 0.3).unwrap();
        let result = recommend(&catalog, &popular_profile(), params, &mut StdRng::seed_from_u64(7)).unwrap();

        assert_eq!(result.len(), 3);
        let expected: HashSet<String> = ["t0", "t1", "t2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids(&result), expected);
    }

    #[test]
    fn test_result_size_is_min_of_limit_and_pool() {
        let catalog = linear_catalog();
        let profile = popular_profile();
        let mut rng = StdRng::seed_from_u64(42);

        for limit in 1..=12 {
            for percentile in [0.0, 0.1, 0.25, 0.5, 0.75, 1.0] {
                let pool = ((10.0 * percentile) as usize).max(1);
                let params = RankParams::new(limit, percentile).unwrap();
                let result = recommend(&catalog, &profile, params, &mut rng).unwrap();
                assert_eq!(result.len(), limit.min(pool), "limit={} percentile={}", limit, percentile);
                assert_eq!(ids(&result).len(), result.len());
            }
        }
    }

    #[test]
    fn test_sampling_stays_within_pool() {
        let catalog = linear_catalog();
        let pool: HashSet<String> = ["t0", "t1", "t2", "t3", "t4"].iter().map(|s| s.to_string()).collect();
        let params = RankParams::new(2, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..20 {
            let result = recommend(&catalog, &popular_profile(), params, &mut rng).unwrap();
            assert_eq!(result.len(), 2);
            assert!(ids(&result).is_subset(&pool));
        }
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let catalog = linear_catalog();
        let profile = popular_profile();
        let params = RankParams::new(3, 1.0).unwrap();

        let first = recommend(&catalog, &profile, params, &mut StdRng::seed_from_u64(99)).unwrap();
        let second = recommend(&catalog, &profile, params, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(
            first.iter().map(|r| &r.track.track_id).collect::<Vec<_>>(),
            second.iter().map(|r| &r.track.track_id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_unseeded_calls_vary() {
        let catalog = linear_catalog();
        let profile = popular_profile();
        let params = RankParams::new(3, 1.0).unwrap();

        let draws: HashSet<Vec<String>> = (0..50)
            .map(|_| {
                let mut picked: Vec<String> = recommend(&catalog, &profile, params, &mut rand::rng())
                    .unwrap()
                    .into_iter()
                    .map(|r| r.track.track_id)
                    .collect();
                picked.sort();
                picked
            })
            .collect();
        assert!(draws.len() > 1);
    }

    #[test]
    fn test_nan_catalog_rows_are_not_candidates() {
        let mut with_nan = row("nan", 1.0, 10.0);
        with_nan[3] = "NaN".to_string();
        let catalog = CatalogTable::from_raw(RawTable::new(
            headers(),
            vec![with_nan, row("whole", 10.0, 1.0)],
        ))
        .unwrap();

        let pool = dissimilar_pool(&catalog, &popular_profile(), 1.0).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].0.track_id, "whole");
        assert!(pool[0].1.is_finite());
    }

    #[test]
    fn test_incomplete_candidates_are_skipped() {
        let mut incomplete = row("gap", 1.0, 10.0);
        incomplete[5] = String::new();
        let catalog = CatalogTable::from_raw(RawTable::new(
            headers(),
            vec![incomplete, row("whole", 10.0, 1.0)],
        ))
        .unwrap();

        let result = recommend(&catalog, &popular_profile(), RankParams::new(5, 1.0).unwrap(), &mut rand::rng()).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].track.track_id, "whole");
    }

    #[test]
    fn test_no_complete_candidates_signal() {
        let mut incomplete = row("gap", 1.0, 10.0);
        incomplete[3] = "??".to_string();
        let catalog = CatalogTable::from_raw(RawTable::new(headers(), vec![incomplete])).unwrap();

        let err = recommend(&catalog, &popular_profile(), RankParams::default(), &mut rand::rng()).unwrap_err();
        assert_eq!(err, InsufficientData::NoCompleteCandidates);
    }

    #[test]
    fn test_non_finite_values_are_sanitized() {
        let mut infinite = row("inf", 1.0, 1.0);
        infinite[4] = "inf".to_string();
        let catalog = CatalogTable::from_raw(RawTable::new(
            headers(),
            vec![infinite, row("plain", 1.0, 10.0)],
        ))
        .unwrap();

        let result = recommend(&catalog, &popular_profile(), RankParams::new(10, 1.0).unwrap(), &mut rand::rng()).unwrap();
        assert_eq!(result.len(), 2);

        for recommendation in &result {
            let json = serde_json::to_value(recommendation).unwrap();
            for (_, value) in json.as_object().unwrap() {
                if let Some(n) = value.as_f64() {
                    assert!(n.is_finite());
                }
            }
        }

        let inf = result.iter().find(|r| r.track.track_id == "inf").unwrap();
        assert_eq!(inf.dissimilarity, None);
        let json = serde_json::to_value(inf).unwrap();
        assert!(json["duration_ms"].is_null());
        assert!(json["dissimilarity"].is_null());
    }

    #[test]
    fn test_nan_distances_rank_last() {
        let mut infinite = row("inf", 1.0, 1.0);
        infinite[4] = "inf".to_string();
        let catalog = CatalogTable::from_raw(RawTable::new(
            headers(),
            vec![infinite, row("near", 10.0, 1.0), row("far", 1.0, 10.0)],
        ))
        .unwrap();

        let pool = dissimilar_pool(&catalog, &popular_profile(), 1.0).unwrap();
        let ids: Vec<&str> = pool.iter().map(|(r, _)| r.track_id.as_str()).collect();
        assert_eq!(ids, vec!["far", "near", "inf"]);
    }

    #[test]
    fn test_zero_profile_ranks_everything_equally_in_catalog_order() {
        let history = HistoryTable::from_raw(RawTable::new(headers(), vec![row("h", 0.0, 0.0)])).unwrap();
        let profile = build_profile(&history).unwrap();
        let catalog = linear_catalog();

        let pool = dissimilar_pool(&catalog, &profile, 0.2).unwrap();
        let ids: Vec<&str> = pool.iter().map(|(r, _)| r.track_id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t1"]);
        assert!(pool.iter().all(|(_, d)| *d == ZERO_NORM_DISTANCE));
    }
}
