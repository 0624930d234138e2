use physics::{TireCompound, Weather};
use racelab::commands::{self, LookupAnswer, RaceEntry};
use racelab::config::RacelabConfig;
use scenario::{AggregateStats, CompilerConfig, LiveQuery, LookupConfig, LookupService, SamplingGrid};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use track::{PointDescription, TrackDescription};

fn write_straight(path: &Path) {
    let desc = TrackDescription {
        name: "pit straight".into(),
        points: (0..=60).map(|i| PointDescription::new(i as f32 * 5.0, 0.0)).collect(),
        turns: Vec::new(),
        closed: Some(false),
    };
    std::fs::write(path, serde_json::to_string(&desc).unwrap()).unwrap();
}

fn small_compiler() -> CompilerConfig {
    let config = RacelabConfig::from_json(
        r#"{
            "compiler": {
                "grid": {
                    "position_step": 50.0,
                    "speed_min_kmh": 100.0,
                    "speed_max_kmh": 140.0,
                    "speed_step_kmh": 20.0,
                    "compounds": ["SOFT"],
                    "weather": ["dry"]
                },
                "seed": 3,
                "rollout_steps": 40
            }
        }"#,
    )
    .unwrap();
    config.compiler()
}

#[test]
fn track_compile_lookup_and_serve() {
    let dir = tempfile::tempdir().unwrap();
    let track_path = dir.path().join("track.json");
    let db_path = dir.path().join("scenarios.rlsc");
    write_straight(&track_path);

    let track = commands::load_track(Some(&track_path)).unwrap();
    let summary = commands::summarize_track(&track);
    assert_eq!(summary.name, "pit straight");
    assert!(!summary.closed);
    assert!((summary.length - 300.0).abs() < 0.5);

    let compiler = small_compiler();
    let stats = commands::compile_database(&track, &compiler, None, &db_path).unwrap();
    assert_eq!(stats.records, 6 * 3);
    assert!(db_path.exists());

    let report = commands::stats(&db_path, LookupConfig::default()).unwrap();
    assert_eq!(report.meta.policy, "line-follower");
    assert_eq!(report.meta.source_checkpoint, None);
    assert_eq!(report.stats.total_scenarios, 18);
    assert_eq!(report.stats.queries, 0);

    let exact = LiveQuery::new(100.0, 120.0, TireCompound::Soft, Weather::Dry);
    match commands::lookup(&db_path, LookupConfig::default(), &exact).unwrap() {
        LookupAnswer::Match(r) => {
            assert!(r.exact);
            assert_eq!(r.nearest.position, 2);
            assert_eq!(r.nearest.speed, 1);
        }
        other => panic!("expected a match, got {other:?}"),
    }
    let wet = LiveQuery::new(100.0, 120.0, TireCompound::Soft, Weather::Wet);
    assert_eq!(
        commands::lookup(&db_path, LookupConfig::default(), &wet).unwrap(),
        LookupAnswer::NoCoverage { nearest: None }
    );

    let service = LookupService::open(&db_path, LookupConfig::default()).unwrap();
    let input = format!("{}\nnot json\n\n", serde_json::to_string(&exact).unwrap());
    let mut output = Vec::new();
    let answered = commands::serve(&service, Cursor::new(input), &mut output).unwrap();
    assert_eq!(answered, 1);

    let lines: Vec<&str> = std::str::from_utf8(&output).unwrap().lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(matches!(serde_json::from_str::<LookupAnswer>(lines[0]).unwrap(), LookupAnswer::Match(_)));
    assert!(lines[1].contains("\"error\""));
    let served: AggregateStats = serde_json::from_str(lines[2]).unwrap();
    assert_eq!(served.queries, 1);
    assert_eq!(served.exact_hits, 1);
}

#[test]
fn grid_flags_default_to_the_full_matrix() {
    let config = RacelabConfig::default().compiler();
    assert_eq!(config.grid, SamplingGrid::default());
    assert_eq!(config.grid.compounds.len(), 3);
    assert_eq!(config.grid.weather.len(), 3);
}

#[test]
fn the_reference_circuit_is_the_default_track() {
    let track = commands::load_track(None).unwrap();
    let summary = commands::summarize_track(&track);
    assert!(summary.length > 1000.0);
    assert!(!summary.turns.is_empty());
    assert!(summary.reference_lap_time > 0.0);
}

#[test]
fn missing_inputs_are_reported_with_their_paths() {
    let err = commands::load_track(Some(Path::new("/no/such/track.json"))).unwrap_err();
    assert!(format!("{err:#}").contains("/no/such/track.json"));
    let err = commands::stats(Path::new("/no/such/db.rlsc"), LookupConfig::default()).unwrap_err();
    assert!(format!("{err:#}").contains("/no/such/db.rlsc"));
}

#[test]
fn checkpoints_of_the_wrong_shape_cannot_drive() {
    let dir = tempfile::tempdir().unwrap();
    let store = rl::CheckpointStore::open(dir.path()).unwrap();
    let narrow = ml::PolicyParameters::new(rl::OBS_SIZE - 3, &[8], rl::ACTION_SIZE, -0.5, 4);
    let path = store
        .write(&rl::Checkpoint::new(0, narrow, rl::Hyperparameters::default(), vec![8], 1, 0, None))
        .unwrap();
    let err = commands::load_policy(Some(&path)).err().expect("mismatched network accepted");
    assert!(format!("{err:#}").contains("racing environment needs"));

    let fits = ml::PolicyParameters::new(rl::OBS_SIZE, &[8], rl::ACTION_SIZE, -0.5, 4);
    let path = store
        .write(&rl::Checkpoint::new(1, fits, rl::Hyperparameters::default(), vec![8], 1, 0, None))
        .unwrap();
    let (_, source) = commands::load_policy(Some(&path)).unwrap();
    assert_eq!(source.name, "ppo");
    assert!(source.checkpoint.is_some());
}

#[test]
fn strategy_calls_and_races_run_on_any_track() {
    let track = commands::load_track(None).unwrap();
    let config = RacelabConfig::default();
    let state = rl::RaceState {
        current_lap: 47,
        total_laps: 50,
        position: 4,
        compound: TireCompound::Soft,
        tire_life: 45,
        gap_ahead: 6.0,
        gap_behind: 6.0,
        track_status: rl::TrackStatus::Green,
    };
    let report = commands::strategy(&track, &config.env, &config.strategy, &state, 3).unwrap();
    assert_eq!(report.stints.len(), 3);
    assert!(report.stints.iter().all(|s| s.optimal_length >= 1));
    assert_eq!(report.window.pit_lap, None);
    assert!(report.decision.should_pit);

    let dir = tempfile::tempdir().unwrap();
    let track_path = dir.path().join("track.json");
    write_straight(&track_path);
    let straight = commands::load_track(Some(&track_path)).unwrap();

    let race = commands::race(Arc::clone(&straight), &config.env, &config.strategy, None, 5).unwrap();
    assert_eq!(race.classification.len(), 3);
    assert_eq!(race.standings.len(), 6);
    assert!(race.classification.iter().all(|c| c.driver.starts_with("line-follower/")));

    let entries = [
        RaceEntry { driver: "one-stop".into(), checkpoint: None, compound: TireCompound::Soft, stops: Vec::new() },
        RaceEntry { driver: "hard".into(), checkpoint: None, compound: TireCompound::Hard, stops: Vec::new() },
    ];
    let mut entries = entries.to_vec();
    entries[0].stops.push(rl::PlannedStop { lap: 3, compound: TireCompound::Medium });
    let entries_path = dir.path().join("entries.json");
    std::fs::write(&entries_path, serde_json::to_string(&entries).unwrap()).unwrap();
    let race = commands::race(straight, &config.env, &config.strategy, Some(&entries_path), 5).unwrap();
    let one_stop = race.classification.iter().find(|c| c.driver == "one-stop").unwrap();
    assert_eq!(one_stop.stops, 1);
}

#[test]
fn backtests_read_recorded_races() {
    let dir = tempfile::tempdir().unwrap();
    let history_path = dir.path().join("history.json");
    let laps: Vec<rl::HistoricLap> = (1..=20)
        .map(|lap| rl::HistoricLap {
            driver: "NOR".into(),
            lap,
            stint: if lap < 11 { 1 } else { 2 },
            position: Some(2),
            compound: Some(TireCompound::Medium),
            tire_life: Some(if lap < 11 { lap } else { lap - 10 }),
        })
        .collect();
    std::fs::write(&history_path, serde_json::to_string(&laps).unwrap()).unwrap();

    let track = commands::load_track(None).unwrap();
    let config = RacelabConfig::default();
    let report = commands::backtest(&track, &config.env, &config.strategy, &history_path, "NOR").unwrap();
    assert_eq!(report.actual_pit_laps, vec![11]);
    assert_eq!(report.total_laps, 20);

    let err = commands::backtest(&track, &config.env, &config.strategy, &history_path, "PIA").unwrap_err();
    assert!(format!("{err:#}").contains("PIA"));
}
