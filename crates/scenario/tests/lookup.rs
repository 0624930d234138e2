mod common;

use common::{database, grid_records, index, key};
use physics::{TireCompound, Weather};
use scenario::{Coverage, LiveQuery, LookupConfig, SamplingGrid, ScenarioError, ScenarioIndex};
use std::time::Instant;

fn query(distance: f32, speed_kmh: f32) -> LiveQuery {
    LiveQuery::new(distance, speed_kmh, TireCompound::Soft, Weather::Dry)
}

#[test]
fn exact_key_returns_the_stored_record() {
    let index = index();
    let grid = SamplingGrid::default();
    let stored = index.get(&key(4, 2)).unwrap().clone();

    let hit = index.lookup(&LiveQuery::at_key(&key(4, 2), &grid)).unwrap();
    assert!(hit.exact);
    assert_eq!(hit.action, stored.action);
    assert_eq!(hit.predicted_delta, stored.predicted_delta);
    assert_eq!(hit.confidence, 1.0);
    assert_eq!(hit.coverage, Coverage::Converged);
    assert_eq!(hit.distance, 0.0);
    assert_eq!(hit.nearest, key(4, 2));
}

#[test]
fn degraded_records_report_half_confidence() {
    let hit = index().lookup(&query(15.0, 90.0)).unwrap();
    assert!(hit.exact);
    assert_eq!(hit.nearest, key(3, 3));
    assert_eq!(hit.coverage, Coverage::Degraded);
    assert_eq!(hit.confidence, 0.5);
}

#[test]
fn equidistant_neighbours_are_blended_the_same_way_every_time() {
    let index = index();
    // Halfway between position buckets 4 and 5 at speed bucket 2.
    let q = query(22.5, 80.0);
    let first = index.lookup(&q).unwrap();
    assert!(!first.exact);
    assert_eq!(first.neighbors, 2);
    assert_eq!(first.distance, 0.5);
    assert!((first.action.throttle - 45.0).abs() < 1e-4);
    assert!((first.predicted_delta - 4.5).abs() < 1e-5);
    assert!((first.confidence - (-0.25f32).exp()).abs() < 1e-6);
    assert_eq!(first.nearest, key(4, 2));
    for _ in 0..10 {
        assert_eq!(index.lookup(&q).unwrap(), first);
    }

    let rebuilt = ScenarioIndex::build(database(grid_records()), LookupConfig::default()).unwrap();
    assert_eq!(rebuilt.lookup(&q).unwrap(), first);
}

#[test]
fn a_single_nearest_record_is_used_with_decayed_confidence() {
    let hit = index().lookup(&query(21.0, 80.0)).unwrap();
    assert!(!hit.exact);
    assert_eq!(hit.neighbors, 1);
    assert_eq!(hit.nearest, key(4, 2));
    assert!((hit.action.throttle - 40.0).abs() < 1e-4);
    assert!((hit.distance - 0.2).abs() < 1e-5);
    assert!((hit.confidence - (-0.1f32).exp()).abs() < 1e-5);
}

#[test]
fn a_tie_with_a_degraded_record_degrades_the_blend() {
    // Halfway between (3, 3) and (4, 3).
    let hit = index().lookup(&query(17.5, 90.0)).unwrap();
    assert_eq!(hit.neighbors, 2);
    assert_eq!(hit.coverage, Coverage::Degraded);
    assert!((hit.confidence - 0.5 * (-0.25f32).exp()).abs() < 1e-6);
}

#[test]
fn uncovered_queries_are_reported_not_guessed() {
    let index = index();
    let far = index.lookup(&query(20.0, 320.0)).unwrap_err();
    match &far {
        ScenarioError::NoCoverage { nearest: Some(d), max_distance } => {
            assert!(d > max_distance);
            assert!(far.is_fallback());
        }
        other => panic!("expected no coverage, got {other:?}"),
    }

    let wet = LiveQuery::new(20.0, 80.0, TireCompound::Soft, Weather::Wet);
    assert!(matches!(index.lookup(&wet), Err(ScenarioError::NoCoverage { nearest: None, .. })));

    let nan = query(f32::NAN, 80.0);
    assert!(matches!(index.lookup(&nan), Err(ScenarioError::NoCoverage { .. })));
}

#[test]
fn coverage_ends_at_the_maximum_distance() {
    let index = index();
    // Speed bucket 4 is the last; 2.9 buckets past it is still covered.
    assert!(index.lookup(&query(20.0, 60.0 + 6.9 * 10.0)).is_ok());
    assert!(index.lookup(&query(20.0, 60.0 + 7.1 * 10.0)).is_err());
}

#[test]
fn an_expired_deadline_times_out() {
    let index = index();
    let err = index.lookup_before(&query(20.0, 80.0), Instant::now()).unwrap_err();
    assert!(matches!(err, ScenarioError::QueryTimeout { .. }));
    assert!(err.is_fallback());
}

#[test]
fn building_rejects_empty_and_duplicate_records() {
    assert!(matches!(
        ScenarioIndex::build(database(Vec::new()), LookupConfig::default()),
        Err(ScenarioError::EmptyDatabase)
    ));
    let mut records = grid_records();
    records.push(records[0].clone());
    assert!(matches!(
        ScenarioIndex::build(database(records), LookupConfig::default()),
        Err(ScenarioError::Corrupt(_))
    ));
}
