use track::{
    description_from_telemetry, reference_circuit, telemetry::sample_distances, TelemetrySample,
    TrackGeometry, DEFAULT_HALF_WIDTH,
};

/// One sample per centreline point of the reference circuit, driven at the
/// reference speed.
fn synthetic_lap() -> Vec<TelemetrySample> {
    let track = reference_circuit().unwrap();
    let points = track.points();
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let speed = p.reference_speed * 3.6;
            let next = points.get(i + 1).map_or(speed, |n| n.reference_speed * 3.6);
            let (throttle, brake) = if next < speed - 0.5 {
                (0.0, 100.0)
            } else if next > speed + 0.1 {
                (100.0, 0.0)
            } else {
                (60.0, 0.0)
            };
            TelemetrySample {
                x: p.position.x,
                y: p.position.y,
                speed,
                throttle,
                brake,
                distance: None,
                time: p.reference_time,
            }
        })
        .collect()
}

#[test]
fn telemetry_lap_builds_a_valid_track() {
    let samples = synthetic_lap();
    let desc = description_from_telemetry("synthetic", &samples, DEFAULT_HALF_WIDTH).unwrap();
    let track = TrackGeometry::from_description(&desc).unwrap();
    let reference = reference_circuit().unwrap();

    assert!((track.length() - reference.length()).abs() < 1.0);
    assert!(track.turns().len() >= 8, "found {} turns", track.turns().len());
    for t in track.turns() {
        assert!(t.apex_speed < 150.0);
        let nearest = reference
            .turns()
            .iter()
            .min_by(|a, b| {
                (a.apex_distance - t.apex_distance).abs().total_cmp(&(b.apex_distance - t.apex_distance).abs())
            })
            .unwrap();
        assert_eq!(t.direction, nearest.direction, "turn at {}", t.apex_distance);
    }
}

#[test]
fn recorded_distances_are_rebased_to_zero() {
    let samples: Vec<TelemetrySample> = (0..5)
        .map(|i| TelemetrySample {
            x: i as f32,
            y: 0.0,
            speed: 100.0,
            throttle: 100.0,
            brake: 0.0,
            distance: Some(1_000.0 + i as f32 * 1.1),
            time: 0.0,
        })
        .collect();
    let d = sample_distances(&samples);
    assert_eq!(d[0], 0.0);
    assert!((d[4] - 4.4).abs() < 1e-3);
}

#[test]
fn stationary_samples_are_not_a_track() {
    let sample = TelemetrySample {
        x: 1.0,
        y: 1.0,
        speed: 0.0,
        throttle: 0.0,
        brake: 0.0,
        distance: None,
        time: 0.0,
    };
    assert!(description_from_telemetry("parked", &vec![sample; 10], DEFAULT_HALF_WIDTH).is_err());
}
