use physics::{Action, CarState, Vec2};
use proptest::prelude::*;
use rl::{Env, EnvConfig, Outcome, RacingEnv, RewardWeights, TrainError, OBS_SIZE};
use std::sync::{Arc, OnceLock};
use track::{reference_circuit, PointDescription, TrackDescription, TrackGeometry};

fn circuit() -> Arc<TrackGeometry> {
    static TRACK: OnceLock<Arc<TrackGeometry>> = OnceLock::new();
    Arc::clone(TRACK.get_or_init(|| Arc::new(reference_circuit().unwrap())))
}

fn straight(length: f32) -> Arc<TrackGeometry> {
    let n = (length / 5.0) as usize;
    let desc = TrackDescription {
        name: "drag strip".into(),
        points: (0..=n).map(|i| PointDescription::new(i as f32 * 5.0, 0.0)).collect(),
        turns: Vec::new(),
        closed: Some(false),
    };
    Arc::new(TrackGeometry::from_description(&desc).unwrap())
}

fn run(env: &mut RacingEnv, action: Action) -> Outcome {
    loop {
        if let Some(outcome) = env.step_action(action).outcome {
            return outcome;
        }
    }
}

#[test]
fn reset_places_the_car_at_a_rolling_start() {
    let mut env = RacingEnv::new(circuit(), EnvConfig::default());
    let obs = env.reset();
    assert_eq!(obs.len(), OBS_SIZE);
    assert_eq!(env.obs_size(), OBS_SIZE);
    assert_eq!(env.action_size(), 3);
    assert!((env.state().speed - 30.0 / 3.6).abs() < 1e-4);
    assert!(obs[0].abs() < 1e-3, "starts on the line");
    assert!((obs[2] - 30.0 / 3.6 / 100.0).abs() < 1e-4);
    assert_eq!(env.outcome(), None);
    assert_eq!(env.steps(), 0);
}

#[test]
fn full_throttle_progresses_until_a_deterministic_end() {
    let drive = || {
        let mut env = RacingEnv::new(circuit(), EnvConfig::default());
        env.reset();
        let mut last = env.progress();
        loop {
            let step = env.step(&[1.0, -1.0, 0.0]);
            assert!(env.progress() > last, "progress stalled at step {}", env.steps());
            last = env.progress();
            if let Some(outcome) = step.outcome {
                return (outcome, env.steps(), *env.state());
            }
        }
    };
    let (outcome, steps, state) = drive();
    assert!(matches!(outcome, Outcome::OffTrack | Outcome::MaxSteps), "{outcome}");
    assert!(steps <= 10_000);
    assert_eq!(drive(), (outcome, steps, state));
}

#[test]
fn standing_still_ends_as_stuck() {
    let mut env = RacingEnv::new(circuit(), EnvConfig::default());
    assert_eq!(run(&mut env, Action::new(0.0, 100.0, 0.0)), Outcome::Stuck);
    assert!(env.steps() > 500);
    assert_eq!(env.state().speed, 0.0);
}

#[test]
fn step_budget_ends_as_max_steps() {
    let config = EnvConfig { max_steps: 50, ..EnvConfig::default() };
    let mut env = RacingEnv::new(circuit(), config);
    assert_eq!(run(&mut env, Action::COAST), Outcome::MaxSteps);
    assert_eq!(env.steps(), 50);
}

#[test]
fn reaching_the_end_of_the_line_completes_the_lap() {
    let config = EnvConfig::default();
    let bonus = config.rewards.completion;
    let mut env = RacingEnv::new(straight(200.0), config);
    let (outcome, last_reward) = loop {
        let step = env.step_action(Action::full_throttle());
        if let Some(outcome) = step.outcome {
            break (outcome, step.reward);
        }
    };
    assert_eq!(outcome, Outcome::LapComplete);
    assert!(env.progress() + 0.5 >= 200.0);
    assert!(last_reward > 0.5 * bonus);
}

#[test]
fn divergence_is_a_zero_reward_terminal_state() {
    let mut config = EnvConfig::default();
    config.car.mass = f32::NAN;
    let mut env = RacingEnv::new(circuit(), config);
    let step = env.step_action(Action::full_throttle());
    assert_eq!(step.outcome, Some(Outcome::Diverged));
    assert!(step.done);
    assert_eq!(step.reward, 0.0);

    let again = env.step_action(Action::full_throttle());
    assert_eq!(again.outcome, Some(Outcome::Diverged));
    assert_eq!(again.reward, 0.0);
    assert_eq!(env.steps(), 1);
}

#[test]
fn leaving_the_track_is_penalised() {
    let config = EnvConfig::default();
    let penalty = config.rewards.off_track;
    let track = circuit();
    let mut env = RacingEnv::new(Arc::clone(&track), config);
    let start = track.point_at(100.0);
    let offset = Vec2::from_angle(start.heading).perp() * 7.45;
    let state = CarState::new(start.position + offset, start.heading + 0.3, 20.0, physics::TireCompound::Soft);
    env.reset_to(state);
    let step = env.step_action(Action::COAST);
    assert_eq!(step.outcome, Some(Outcome::OffTrack));
    assert!(step.reward < -0.5 * penalty);
}

#[test]
fn reset_to_starts_counting_from_the_given_state() {
    let track = circuit();
    let mut env = RacingEnv::new(Arc::clone(&track), EnvConfig::default());
    let p = track.point_at(1000.0);
    let obs = env.reset_to(CarState::new(p.position, p.heading, 40.0, physics::TireCompound::Hard));
    assert_eq!(obs.len(), OBS_SIZE);
    assert!((env.start_distance() - 1000.0).abs() < 0.5);
    assert_eq!(env.progress(), 0.0);
    assert!((env.lap_target() - (track.length() - env.start_distance())).abs() < 1e-3);
    env.step_action(Action::COAST);
    assert!(env.progress() > 0.0);
}

#[test]
fn recorded_episode_matches_the_steps_taken() {
    let config = EnvConfig { max_steps: 30, record_episode: true, ..EnvConfig::default() };
    let mut env = RacingEnv::new(circuit(), config);
    run(&mut env, Action::full_throttle());
    let episode = env.take_episode().unwrap();
    assert_eq!(episode.len(), 30);
    assert_eq!(episode.outcome, Some(Outcome::MaxSteps));
    assert!(episode.transitions.last().unwrap().done);
    assert!(episode.transitions.iter().rev().skip(1).all(|t| !t.done));
    assert!((episode.total_reward() - env.total_reward()).abs() < 1e-3);
}

#[test]
fn reward_terms_are_weighted_separately() {
    let progress_only = RewardWeights {
        progress: 1.0,
        speed: 0.0,
        lateral: 0.0,
        smoothness: 0.0,
        clamp: 0.0,
        off_track: 0.0,
        completion: 0.0,
    };
    let track = circuit();
    let p = track.point_at(50.0);
    let start = CarState::new(
        p.position + Vec2::from_angle(p.heading).perp() * 3.0,
        p.heading,
        20.0,
        physics::TireCompound::Soft,
    );

    let mut env = RacingEnv::new(
        Arc::clone(&track),
        EnvConfig { rewards: progress_only.clone(), ..EnvConfig::default() },
    );
    env.reset_to(start);
    let plain = env.step_action(Action::COAST).reward;
    assert!((plain - env.progress()).abs() < 1e-5);

    let lateral = RewardWeights { lateral: 1.0, ..progress_only };
    let mut env = RacingEnv::new(track, EnvConfig { rewards: lateral, ..EnvConfig::default() });
    env.reset_to(start);
    let penalised = env.step_action(Action::COAST).reward;
    // 3 m out of a 7.5 m half width
    assert!((plain - penalised - 0.16).abs() < 0.01);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn every_episode_ends_exactly_once_within_budget(
        actions in prop::collection::vec((0.0f32..100.0, 0.0f32..100.0, -1.0f32..1.0), 1..40),
    ) {
        let config = EnvConfig { max_steps: 120, ..EnvConfig::default() };
        let mut env = RacingEnv::new(circuit(), config);
        let mut outcome = None;
        for i in 0..200 {
            let (t, b, s) = actions[i % actions.len()];
            let step = env.step_action(Action::new(t, b, s));
            prop_assert_eq!(step.done, step.outcome.is_some());
            if step.done {
                outcome = step.outcome;
                break;
            }
        }
        prop_assert!(outcome.is_some());
        prop_assert!(env.steps() <= 120);
        let after = env.step_action(Action::full_throttle());
        prop_assert_eq!(after.outcome, outcome);
        prop_assert!(after.done);
    }
}

#[test]
fn configurations_without_a_step_budget_are_rejected() {
    assert!(EnvConfig::default().validate().is_ok());
    let no_steps = EnvConfig { max_steps: 0, ..EnvConfig::default() };
    assert!(matches!(no_steps.validate(), Err(TrainError::Config(_))));
    let frozen = EnvConfig { dt: 0.0, ..EnvConfig::default() };
    assert!(frozen.validate().is_err());
    let reversing = EnvConfig { start_speed_kmh: -10.0, ..EnvConfig::default() };
    assert!(reversing.validate().is_err());
}
