//! Race classification.
//!
//! Each entrant brings one evaluated lap. The stint model re-paced to that
//! lap degrades it with tyre life and fuel; planned stops add the pit loss
//! and fit a new set. Standings after every lap give the final
//! classification and every overtake. An entrant whose evaluated lap did
//! not finish retires on the grid.

use crate::env::Outcome;
use crate::error::TrainError;
use crate::evaluate::LapComparison;
use crate::strategy::StintModel;
use physics::TireCompound;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::info;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStop {
    /// The stop is made at the start of this lap.
    pub lap: u32,
    pub compound: TireCompound,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entrant {
    pub driver: String,
    /// Starting set.
    pub compound: TireCompound,
    pub stops: Vec<PlannedStop>,
    /// A lap driven on a fresh set of `compound`.
    pub pace: LapComparison,
}

impl Entrant {
    #[must_use]
    pub fn new(driver: impl Into<String>, compound: TireCompound, pace: LapComparison) -> Self {
        Self { driver: driver.into(), compound, stops: Vec::new(), pace }
    }

    #[must_use]
    pub fn with_stop(mut self, lap: u32, compound: TireCompound) -> Self {
        self.stops.push(PlannedStop { lap, compound });
        self
    }
}

/// One row of the order after a lap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub position: u32,
    pub driver: String,
    pub laps: u32,
    pub total_time: f32,
    /// Behind the leader, for cars still running.
    pub gap_to_leader: Option<f32>,
    pub compound: TireCompound,
    pub tire_life: u32,
    pub stops: u32,
    pub retired: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LapStandings {
    /// 0 is the grid.
    pub lap: u32,
    pub order: Vec<Standing>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Finish {
    Winner,
    Finished { gap: f32 },
    Retired { outcome: Outcome },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEntry {
    pub position: u32,
    pub driver: String,
    pub total_time: f32,
    pub stops: u32,
    pub finish: Finish,
}

/// A driver gaining places over one lap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Overtake {
    pub lap: u32,
    pub driver: String,
    pub from_position: u32,
    pub to_position: u32,
    pub overtaken: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub laps: u32,
    /// Grid first, then one entry per lap.
    pub standings: Vec<LapStandings>,
    pub classification: Vec<ClassifiedEntry>,
    pub overtakes: Vec<Overtake>,
}

impl RaceResult {
    pub fn overtakes_by<'a>(&'a self, driver: &'a str) -> impl Iterator<Item = &'a Overtake> + 'a {
        self.overtakes.iter().filter(move |o| o.driver == driver)
    }

    #[must_use]
    pub fn winner(&self) -> Option<&ClassifiedEntry> {
        self.classification.first().filter(|c| c.finish == Finish::Winner)
    }
}

struct Car<'a> {
    entrant: &'a Entrant,
    model: Option<StintModel>,
    compound: TireCompound,
    tire_life: u32,
    stops: u32,
    laps: u32,
    total_time: f32,
}

impl Car<'_> {
    fn retired(&self) -> bool {
        self.model.is_none()
    }
}

fn validate(entrants: &[Entrant], laps: u32) -> Result<(), TrainError> {
    if laps == 0 {
        return Err(TrainError::Strategy("a race needs at least one lap".into()));
    }
    if entrants.is_empty() {
        return Err(TrainError::Strategy("a race needs at least one entrant".into()));
    }
    let mut seen = HashSet::new();
    for entrant in entrants {
        if !seen.insert(entrant.driver.as_str()) {
            return Err(TrainError::Strategy(format!("driver {} is entered twice", entrant.driver)));
        }
        if let Some(stop) = entrant.stops.iter().find(|s| s.lap == 0 || s.lap > laps) {
            return Err(TrainError::Strategy(format!(
                "{} plans a stop at lap {} of a {laps}-lap race",
                entrant.driver, stop.lap
            )));
        }
    }
    Ok(())
}

/// Running cars by total time, then retirements, ties in grid order.
fn order(cars: &[Car<'_>], lap: u32) -> LapStandings {
    let mut ranked: Vec<(usize, &Car<'_>)> = cars.iter().enumerate().collect();
    ranked.sort_by(|(ia, a), (ib, b)| match (a.retired(), b.retired()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => ia.cmp(ib),
        (false, false) => a.total_time.total_cmp(&b.total_time).then(ia.cmp(ib)),
    });
    let leader = ranked.first().map_or(0.0, |(_, car)| car.total_time);
    let order = ranked
        .iter()
        .enumerate()
        .map(|(i, (_, car))| Standing {
            position: i as u32 + 1,
            driver: car.entrant.driver.clone(),
            laps: car.laps,
            total_time: car.total_time,
            gap_to_leader: (!car.retired()).then(|| car.total_time - leader),
            compound: car.compound,
            tire_life: car.tire_life,
            stops: car.stops,
            retired: car.retired(),
        })
        .collect();
    LapStandings { lap, order }
}

/// Every car in entry order, retirements included.
fn grid(cars: &[Car<'_>]) -> LapStandings {
    let order = cars
        .iter()
        .enumerate()
        .map(|(i, car)| Standing {
            position: i as u32 + 1,
            driver: car.entrant.driver.clone(),
            laps: 0,
            total_time: 0.0,
            gap_to_leader: Some(0.0),
            compound: car.compound,
            tire_life: 0,
            stops: 0,
            retired: false,
        })
        .collect();
    LapStandings { lap: 0, order }
}

/// Places gained between consecutive standings, with the running cars
/// passed on the way.
fn overtakes(before: &LapStandings, after: &LapStandings) -> Vec<Overtake> {
    after
        .order
        .iter()
        .filter(|row| !row.retired)
        .filter_map(|row| {
            let from = before.order.iter().find(|b| b.driver == row.driver)?.position;
            if row.position >= from {
                return None;
            }
            let overtaken: Vec<String> = before
                .order
                .iter()
                .filter(|b| b.position >= row.position && b.position < from && b.driver != row.driver)
                .filter(|b| after.order.iter().any(|a| a.driver == b.driver && !a.retired && a.position > row.position))
                .map(|b| b.driver.clone())
                .collect();
            (!overtaken.is_empty()).then(|| Overtake {
                lap: after.lap,
                driver: row.driver.clone(),
                from_position: from,
                to_position: row.position,
                overtaken,
            })
        })
        .collect()
}

/// Run a `laps`-lap race between `entrants`, who line up on the grid in
/// the order given.
///
/// # Errors
///
/// [`TrainError::Strategy`] for a race without laps or entrants, a driver
/// entered twice or a stop outside the race distance.
pub fn simulate_race(model: &StintModel, entrants: &[Entrant], laps: u32) -> Result<RaceResult, TrainError> {
    validate(entrants, laps)?;
    let mut cars = entrants
        .iter()
        .map(|entrant| {
            let paced = match entrant.pace.lap_time {
                Some(lap_time) => Some(model.paced_by(lap_time, entrant.compound)?),
                None => None,
            };
            Ok(Car { entrant, model: paced, compound: entrant.compound, tire_life: 0, stops: 0, laps: 0, total_time: 0.0 })
        })
        .collect::<Result<Vec<_>, TrainError>>()?;

    let mut standings = vec![grid(&cars)];
    let mut passes = Vec::new();
    for lap in 1..=laps {
        for car in &mut cars {
            let Some(model) = &car.model else { continue };
            if let Some(stop) = car.entrant.stops.iter().find(|s| s.lap == lap) {
                car.total_time += model.config().pit_loss;
                car.compound = stop.compound;
                car.tire_life = 0;
                car.stops += 1;
            }
            car.tire_life += 1;
            car.total_time += model.lap_time(car.compound, car.tire_life, lap);
            car.laps = lap;
        }
        let current = order(&cars, lap);
        if let Some(previous) = standings.last() {
            passes.extend(overtakes(previous, &current));
        }
        standings.push(current);
    }

    let classification = classify(&cars, standings.last());
    if let Some(winner) = classification.first() {
        info!(
            laps,
            entrants = entrants.len(),
            winner = %winner.driver,
            time = winner.total_time,
            overtakes = passes.len(),
            "race classified"
        );
    }
    Ok(RaceResult { laps, standings, classification, overtakes: passes })
}

fn classify(cars: &[Car<'_>], last: Option<&LapStandings>) -> Vec<ClassifiedEntry> {
    let Some(last) = last else { return Vec::new() };
    let winner_time = last.order.first().filter(|r| !r.retired).map(|r| r.total_time);
    last.order
        .iter()
        .filter_map(|row| {
            let car = cars.iter().find(|c| c.entrant.driver == row.driver)?;
            let finish = if row.retired {
                Finish::Retired { outcome: car.entrant.pace.outcome }
            } else if row.position == 1 {
                Finish::Winner
            } else {
                Finish::Finished { gap: row.total_time - winner_time.unwrap_or(row.total_time) }
            };
            Some(ClassifiedEntry {
                position: row.position,
                driver: row.driver.clone(),
                total_time: row.total_time,
                stops: row.stops,
                finish,
            })
        })
        .collect()
}
