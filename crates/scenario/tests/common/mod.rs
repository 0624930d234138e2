#![allow(dead_code)]

use physics::{Action, TireCompound, Weather};
use scenario::{
    CompilerConfig, Coverage, LookupConfig, PolicySource, ScenarioDatabase, ScenarioIndex, ScenarioKey,
    ScenarioRecord,
};
use std::sync::Arc;
use track::{PointDescription, TrackDescription, TrackGeometry};

pub fn straight(length: f32) -> Arc<TrackGeometry> {
    let n = (length / 5.0) as usize;
    let desc = TrackDescription {
        name: "drag strip".into(),
        points: (0..=n).map(|i| PointDescription::new(i as f32 * 5.0, 0.0)).collect(),
        turns: Vec::new(),
        closed: Some(false),
    };
    Arc::new(TrackGeometry::from_description(&desc).unwrap())
}

pub fn key(position: u32, speed: u32) -> ScenarioKey {
    ScenarioKey { compound: TireCompound::Soft, weather: Weather::Dry, position, speed }
}

/// Soft/dry records on positions 0..10 and speeds 0..5. Throttle is ten
/// times the position, the delta equals the position, and (3, 3) is
/// degraded.
pub fn grid_records() -> Vec<ScenarioRecord> {
    let mut records = Vec::new();
    for position in 0..10 {
        for speed in 0..5 {
            records.push(ScenarioRecord {
                key: key(position, speed),
                action: Action::new(position as f32 * 10.0, 0.0, speed as f32 * 0.1),
                predicted_delta: position as f32,
                coverage: if (position, speed) == (3, 3) { Coverage::Degraded } else { Coverage::Converged },
                samples: 1,
            });
        }
    }
    records
}

pub fn database(records: Vec<ScenarioRecord>) -> ScenarioDatabase {
    let track = straight(200.0);
    let source = PolicySource::new("fixture", Some("000001-abcdef012345".into()));
    ScenarioDatabase::new(&track, &CompilerConfig::default(), &source, 1.0, records).unwrap()
}

pub fn index() -> ScenarioIndex {
    ScenarioIndex::build(database(grid_records()), LookupConfig::default()).unwrap()
}
