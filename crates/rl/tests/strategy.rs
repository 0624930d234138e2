use physics::{TireCompound, TireParams, Weather};
use rl::{HistoricLap, RaceState, Reason, StintModel, StrategyConfig, TrackStatus, TrainError};

fn model_with(config: StrategyConfig) -> StintModel {
    StintModel::new(TireParams::default(), Weather::Dry, 5000.0, 90.0, config).unwrap()
}

fn model() -> StintModel {
    model_with(StrategyConfig::default())
}

fn state(current_lap: u32, total_laps: u32, compound: TireCompound, tire_life: u32) -> RaceState {
    RaceState {
        current_lap,
        total_laps,
        position: 5,
        compound,
        tire_life,
        gap_ahead: 5.0,
        gap_behind: 5.0,
        track_status: TrackStatus::Green,
    }
}

#[test]
fn stints_lose_pace_as_the_tyres_wear() {
    let stint = model().predict_stint(TireCompound::Soft, 30);
    assert_eq!(stint.len(), 30);
    assert_eq!(stint[0].tire_life, 1);
    assert_eq!(stint[0].delta, 0.0);
    for pair in stint.windows(2) {
        assert!(pair[1].wear > pair[0].wear);
        assert!(pair[1].grip < pair[0].grip);
        assert!(pair[1].delta > pair[0].delta);
    }
}

#[test]
fn softer_compounds_wear_out_sooner() {
    let model = model();
    let soft = model.optimal_stint_length(TireCompound::Soft);
    let medium = model.optimal_stint_length(TireCompound::Medium);
    let hard = model.optimal_stint_length(TireCompound::Hard);
    assert!(soft < medium, "soft {soft} medium {medium}");
    assert!(medium < hard, "medium {medium} hard {hard}");
    assert!(hard < StrategyConfig::default().max_stint_laps);

    let forecast = model.forecast(TireCompound::Soft);
    assert_eq!(forecast.optimal_length, soft);
    let ended = &forecast.laps[soft as usize - 1];
    assert!(ended.delta > StrategyConfig::default().degradation_threshold);
    assert!(forecast.laps[soft as usize - 2].delta <= StrategyConfig::default().degradation_threshold);
}

#[test]
fn stints_that_never_degrade_enough_run_to_the_cap() {
    let model = model_with(StrategyConfig { degradation_threshold: 1000.0, max_stint_laps: 40, ..Default::default() });
    assert_eq!(model.optimal_stint_length(TireCompound::Soft), 40);
}

#[test]
fn worn_tyres_make_a_stop_worthwhile() {
    let model = model();
    let worn = state(10, 50, TireCompound::Soft, 20);
    let window = model.find_pit_window(&worn, &TireCompound::ALL);
    let (lap, _, saved) = window.worthwhile().expect("a stop should beat 41 laps on worn softs");
    assert!((11..30).contains(&lap));
    assert!(saved > 0.0);
    assert!(window.total_time.unwrap() < window.baseline_time);
    assert!((window.baseline_time - model.time_to_finish(&worn, None)).abs() < 1e-3);
}

#[test]
fn no_window_opens_in_the_closing_laps() {
    let model = model();
    let late = state(44, 50, TireCompound::Medium, 2);
    let window = model.find_pit_window(&late, &TireCompound::ALL);
    assert_eq!(window.pit_lap, None);
    assert_eq!(window.time_saved, None);

    let decision = model.make_decision(&late);
    assert!(!decision.should_pit);
    assert_eq!(decision.alternative_lap, None);
    assert_eq!(decision.reasoning, vec![Reason::StayOut { window_in: None, tire_life: 2 }]);
}

#[test]
fn neutralised_races_call_a_stop() {
    let mut under_caution = state(5, 50, TireCompound::Soft, 5);
    under_caution.track_status = TrackStatus::SafetyCar;
    let decision = model().make_decision(&under_caution);
    assert!(decision.should_pit);
    assert!((decision.confidence - 0.95).abs() < 1e-6);
    assert_eq!(decision.recommended_compound, TireCompound::Medium);
    assert!(decision.expected_time_delta > 0.0);
    assert_eq!(decision.reasoning, vec![Reason::Neutralised { status: TrackStatus::SafetyCar }]);
}

#[test]
fn an_imminent_window_means_pit_now() {
    let decision = model().make_decision(&state(20, 50, TireCompound::Soft, 40));
    assert!(decision.should_pit);
    assert!(matches!(decision.reasoning[0], Reason::PitWindow { lap, .. } if lap <= 22));
    assert!(decision.expected_time_delta > 0.0);
    assert_eq!(decision.alternative_lap, None);
}

#[test]
fn dead_tyres_stop_even_without_a_window() {
    let decision = model().make_decision(&state(47, 50, TireCompound::Soft, 40));
    assert!(decision.should_pit);
    assert!(matches!(decision.reasoning[0], Reason::Degradation { pace_loss } if pace_loss > 1.5));
    assert_eq!(decision.expected_time_delta, 0.0);
    assert_eq!(decision.recommended_compound, TireCompound::Medium);
}

#[test]
fn undercuts_need_a_close_car_ahead() {
    let model = model();
    let mut close = state(10, 60, TireCompound::Medium, 24);
    close.gap_ahead = 1.0;
    assert!(model.undercut_advantage(&close, 29) > 0.3);
    let decision = model.make_decision(&close);
    assert!(decision.should_pit);
    assert!(matches!(decision.reasoning[0], Reason::Undercut { .. }));
    assert_eq!(decision.expected_position_change, -1);

    let clear = RaceState { gap_ahead: 5.0, ..close };
    let decision = model.make_decision(&clear);
    assert!(!decision.should_pit);
    assert!(decision.alternative_lap.is_some());
    assert!(matches!(decision.reasoning[0], Reason::StayOut { window_in: Some(_), tire_life: 24 }));
}

#[test]
fn overcuts_fade_as_the_tyres_age() {
    let model = model();
    let fresh = model.overcut_advantage(&state(10, 50, TireCompound::Soft, 1), 3);
    let worn = model.overcut_advantage(&state(10, 50, TireCompound::Soft, 40), 3);
    assert!(fresh > worn);
    assert!(fresh > 0.0);
    assert_eq!(model.overcut_advantage(&state(10, 50, TireCompound::Soft, 1), 0), model.config().pit_loss);
}

fn recorded_race(driver: &str, stop_at: Option<u32>) -> Vec<HistoricLap> {
    let mut stint = 1;
    let mut life = 0;
    (1..=30)
        .map(|lap| {
            if Some(lap) == stop_at {
                stint += 1;
                life = 0;
            }
            life += 1;
            HistoricLap {
                driver: driver.into(),
                lap,
                stint,
                position: Some(3),
                compound: Some(if stint == 1 { TireCompound::Soft } else { TireCompound::Hard }),
                tire_life: Some(life),
            }
        })
        .collect()
}

#[test]
fn backtests_compare_calls_with_the_stops_made() {
    let mut history = recorded_race("VER", Some(16));
    history.extend(recorded_race("LEC", None));
    history.reverse();

    let report = model().backtest("VER", &history).unwrap();
    assert_eq!(report.driver, "VER");
    assert_eq!(report.total_laps, 30);
    assert_eq!(report.actual_pit_laps, vec![16]);
    assert!((0.0..=1.0).contains(&report.agreement_rate));
    assert!(report.calls.iter().all(|c| (1..=30).contains(&c.lap) && !c.reasoning.is_empty()));
    let agreed = report.calls.iter().any(|c| c.lap == 16);
    assert_eq!(report.agreement_rate, if agreed { 1.0 } else { 0.0 });

    let steady = model().backtest("LEC", &history).unwrap();
    assert!(steady.actual_pit_laps.is_empty());
    assert_eq!(steady.agreement_rate, 0.0);

    assert!(matches!(model().backtest("HAM", &history), Err(TrainError::Strategy(_))));
}

#[test]
fn unusable_strategy_settings_are_rejected() {
    for config in [
        StrategyConfig { pit_loss: -1.0, ..Default::default() },
        StrategyConfig { utilisation: 1.5, ..Default::default() },
        StrategyConfig { wear_scale: 0.0, ..Default::default() },
        StrategyConfig { max_stint_laps: 0, ..Default::default() },
    ] {
        let result = StintModel::new(TireParams::default(), Weather::Dry, 5000.0, 90.0, config);
        assert!(matches!(result, Err(TrainError::Strategy(_))));
    }
    assert!(StintModel::new(TireParams::default(), Weather::Dry, 0.0, 90.0, StrategyConfig::default()).is_err());
}
