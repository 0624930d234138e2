use physics::{TireCompound, TireParams, Weather};
use rl::{
    evaluate_lap, simulate_race, EnvConfig, Entrant, Finish, LapComparison, LineFollower, Outcome, StintModel,
    StrategyConfig, TrainError,
};
use std::sync::Arc;
use track::{PointDescription, TrackDescription, TrackGeometry};

fn model() -> StintModel {
    StintModel::new(TireParams::default(), Weather::Dry, 5000.0, 90.0, StrategyConfig::default()).unwrap()
}

fn pace(lap_time: Option<f32>, outcome: Outcome) -> LapComparison {
    LapComparison {
        track: "test".into(),
        outcome,
        lap_time,
        distance: 5000.0,
        elapsed: lap_time.unwrap_or(30.0),
        reference_time: 90.0,
        delta: 0.0,
        sectors: Vec::new(),
        top_speed_kmh: 320.0,
        average_speed_kmh: 200.0,
        steps: 9000,
    }
}

fn entrant(driver: &str, lap_time: f32) -> Entrant {
    Entrant::new(driver, TireCompound::Soft, pace(Some(lap_time), Outcome::LapComplete))
}

#[test]
fn the_quickest_car_wins_from_the_back() {
    let field = [entrant("C", 92.0), entrant("B", 91.0), entrant("A", 90.0)];
    let race = simulate_race(&model(), &field, 5).unwrap();

    assert_eq!(race.standings.len(), 6);
    let grid: Vec<&str> = race.standings[0].order.iter().map(|s| s.driver.as_str()).collect();
    assert_eq!(grid, ["C", "B", "A"]);

    let finish: Vec<&str> = race.classification.iter().map(|c| c.driver.as_str()).collect();
    assert_eq!(finish, ["A", "B", "C"]);
    assert_eq!(race.winner().unwrap().driver, "A");
    match race.classification[1].finish {
        Finish::Finished { gap } => assert!((gap - 5.0).abs() < 0.05, "gap {gap}"),
        ref other => panic!("expected a finish, got {other:?}"),
    }
    let last = race.standings.last().unwrap();
    assert!(last.order.iter().all(|s| s.laps == 5 && s.tire_life == 5 && s.stops == 0));

    assert_eq!(race.overtakes.len(), 1);
    let pass = &race.overtakes[0];
    assert_eq!((pass.lap, pass.from_position, pass.to_position), (1, 3, 1));
    assert_eq!(pass.overtaken, ["C", "B"]);
    assert_eq!(race.overtakes_by("A").count(), 1);
    assert_eq!(race.overtakes_by("B").count(), 0);
}

#[test]
fn a_stop_pays_off_once_fresh_tyres_catch_up() {
    let field = [entrant("A", 90.0), entrant("B", 90.0).with_stop(20, TireCompound::Soft)];
    let race = simulate_race(&model(), &field, 40).unwrap();

    let lap20 = &race.standings[20].order;
    assert_eq!(lap20[1].driver, "B");
    assert_eq!((lap20[1].stops, lap20[1].tire_life), (1, 1));
    assert!(lap20[1].gap_to_leader.unwrap() > 15.0);

    let winner = race.winner().unwrap();
    assert_eq!(winner.driver, "B");
    assert_eq!(winner.stops, 1);
    let passes: Vec<_> = race.overtakes_by("B").collect();
    assert_eq!(passes.len(), 1);
    assert!(passes[0].lap > 20);
    assert_eq!(passes[0].overtaken, ["A"]);
}

#[test]
fn unfinished_laps_retire_on_the_grid() {
    let crashed = Entrant::new("C", TireCompound::Soft, pace(None, Outcome::OffTrack));
    let field = [crashed, entrant("A", 90.0), entrant("B", 91.0)];
    let race = simulate_race(&model(), &field, 3).unwrap();

    let last = race.classification.last().unwrap();
    assert_eq!(last.driver, "C");
    assert_eq!(last.finish, Finish::Retired { outcome: Outcome::OffTrack });
    assert_eq!(race.standings[1].order[2].gap_to_leader, None);
    assert!(race.overtakes.is_empty());
}

#[test]
fn race_plans_are_checked() {
    let model = model();
    let strategy = |r: Result<_, TrainError>| matches!(r, Err(TrainError::Strategy(_)));
    assert!(strategy(simulate_race(&model, &[entrant("A", 90.0)], 0)));
    assert!(strategy(simulate_race(&model, &[], 10)));
    assert!(strategy(simulate_race(&model, &[entrant("A", 90.0), entrant("A", 91.0)], 10)));
    assert!(strategy(simulate_race(&model, &[entrant("A", 90.0).with_stop(0, TireCompound::Hard)], 10)));
    assert!(strategy(simulate_race(&model, &[entrant("A", 90.0).with_stop(11, TireCompound::Hard)], 10)));
}

#[test]
fn evaluated_laps_set_the_pace() {
    let desc = TrackDescription {
        name: "drag strip".into(),
        points: (0..=80).map(|i| PointDescription::new(i as f32 * 5.0, 0.0)).collect(),
        turns: Vec::new(),
        closed: Some(false),
    };
    let track = Arc::new(TrackGeometry::from_description(&desc).unwrap());
    let env = EnvConfig::default();
    let model = StintModel::for_track(&track, &env, StrategyConfig::default()).unwrap();

    let field: Vec<Entrant> = [TireCompound::Soft, TireCompound::Hard]
        .into_iter()
        .map(|compound| {
            let env = EnvConfig { compound, ..env.clone() };
            let lap = evaluate_lap(Arc::clone(&track), &env, &LineFollower::default(), 2);
            Entrant::new(compound.name(), compound, lap)
        })
        .collect();
    let race = simulate_race(&model, &field, 4).unwrap();

    assert_eq!(race.classification.len(), 2);
    assert!(race.winner().is_some());
    let first_lap = &race.standings[1].order;
    for row in first_lap {
        let entrant = field.iter().find(|e| e.driver == row.driver).unwrap();
        assert!((row.total_time - entrant.pace.lap_time.unwrap()).abs() < 1e-3);
    }
}
