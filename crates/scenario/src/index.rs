//! Immutable nearest-key index over compiled scenarios.
//!
//! Records are partitioned by the categorical key fields (compound and
//! weather), which must match exactly. Inside a partition a 2-d tree over
//! (position bucket, speed bucket) answers nearest-neighbour queries with
//! Euclidean distance in bucket units.
//!
//! A query collects every record within `tie_tolerance` of the nearest one.
//! A single neighbour is returned as stored; several are blended with
//! inverse-distance weights in record order, so the answer depends only on
//! the neighbour set.

use crate::database::{DatabaseMeta, ScenarioDatabase};
use crate::error::ScenarioError;
use crate::key::{LiveQuery, ScenarioKey};
use crate::record::{Coverage, Recommendation, ScenarioRecord};
use physics::{Action, TireCompound, Weather};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Instant;

const NONE: u32 = u32::MAX;
/// Nodes visited between deadline checks.
const DEADLINE_STRIDE: usize = 64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Bucket distance beyond which a query has no coverage.
    pub max_distance: f32,
    /// Bucket distance over which confidence falls by `1/e`.
    pub decay: f32,
    /// Neighbours this close to the nearest distance count as ties.
    pub tie_tolerance: f32,
    pub latency_budget_ms: f64,
    /// Seconds the replaced real-time computation takes, for the speedup
    /// statistic.
    pub baseline_compute_s: f64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            max_distance: 3.0,
            decay: 2.0,
            tie_tolerance: 1e-3,
            latency_budget_ms: 12.0,
            baseline_compute_s: 7.8,
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct Node {
    point: [f32; 2],
    record: u32,
    axis: u8,
    left: u32,
    right: u32,
}

#[derive(Clone, Debug)]
struct KdTree {
    nodes: Vec<Node>,
    root: u32,
}

/// Nearest distance and every record within tolerance of it.
struct Neighbors {
    best: f32,
    found: Vec<(f32, u32)>,
}

struct Expired;

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

impl KdTree {
    fn build(mut items: Vec<([f32; 2], u32)>) -> Self {
        let mut nodes = Vec::with_capacity(items.len());
        let root = Self::split(&mut items, 0, &mut nodes);
        Self { nodes, root }
    }

    fn split(items: &mut [([f32; 2], u32)], depth: usize, nodes: &mut Vec<Node>) -> u32 {
        if items.is_empty() {
            return NONE;
        }
        let axis = depth % 2;
        let mid = items.len() / 2;
        // Ties on the split axis are ordered by record so the tree shape is
        // a function of the records alone.
        items.select_nth_unstable_by(mid, |a, b| a.0[axis].total_cmp(&b.0[axis]).then(a.1.cmp(&b.1)));
        let (point, record) = items[mid];
        let id = nodes.len() as u32;
        nodes.push(Node { point, record, axis: axis as u8, left: NONE, right: NONE });
        let (lower, upper) = items.split_at_mut(mid);
        let left = Self::split(lower, depth + 1, nodes);
        let right = Self::split(&mut upper[1..], depth + 1, nodes);
        let node = &mut nodes[id as usize];
        node.left = left;
        node.right = right;
        id
    }

    fn search(
        &self,
        query: [f32; 2],
        max_distance: f32,
        tolerance: f32,
        deadline: Option<Instant>,
    ) -> Result<Neighbors, Expired> {
        let mut best = f32::INFINITY;
        let mut found: Vec<(f32, u32)> = Vec::new();
        let mut stack: Vec<(u32, f32)> = Vec::with_capacity(64);
        if self.root != NONE {
            stack.push((self.root, 0.0));
        }
        let mut visits = 0usize;
        while let Some((id, bound)) = stack.pop() {
            if visits % DEADLINE_STRIDE == 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(Expired);
            }
            visits += 1;
            if bound > best.min(max_distance) + tolerance {
                continue;
            }
            let node = &self.nodes[id as usize];
            let d = distance(query, node.point);
            if d < best {
                best = d;
                found.retain(|&(other, _)| other <= best + tolerance);
                found.push((d, node.record));
            } else if d <= best + tolerance {
                found.push((d, node.record));
            }

            let axis = usize::from(node.axis);
            let diff = query[axis] - node.point[axis];
            let (near, far) = if diff < 0.0 { (node.left, node.right) } else { (node.right, node.left) };
            if far != NONE {
                stack.push((far, diff.abs().max(bound)));
            }
            if near != NONE {
                stack.push((near, bound));
            }
        }
        Ok(Neighbors { best, found })
    }
}

/// Compiled scenarios ready for concurrent read-only queries.
#[derive(Clone, Debug)]
pub struct ScenarioIndex {
    meta: DatabaseMeta,
    records: Vec<ScenarioRecord>,
    partitions: BTreeMap<(TireCompound, Weather), KdTree>,
    keys: HashMap<ScenarioKey, u32>,
    config: LookupConfig,
    encoded_bytes: u64,
}

impl ScenarioIndex {
    /// # Errors
    ///
    /// [`ScenarioError::EmptyDatabase`] without records,
    /// [`ScenarioError::Corrupt`] when two records share a key.
    pub fn build(database: ScenarioDatabase, config: LookupConfig) -> Result<Self, ScenarioError> {
        let ScenarioDatabase { meta, records } = database;
        if records.is_empty() {
            return Err(ScenarioError::EmptyDatabase);
        }
        let mut keys = HashMap::with_capacity(records.len());
        let mut grouped: BTreeMap<(TireCompound, Weather), Vec<([f32; 2], u32)>> = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            let i = i as u32;
            if keys.insert(record.key, i).is_some() {
                return Err(ScenarioError::Corrupt(format!("duplicate key {}", record.key)));
            }
            grouped.entry(record.key.partition()).or_default().push((record.key.coordinates(), i));
        }
        let partitions = grouped.into_iter().map(|(p, items)| (p, KdTree::build(items))).collect();
        Ok(Self { meta, records, partitions, keys, config, encoded_bytes: 0 })
    }

    /// Load, verify and index a database file.
    ///
    /// # Errors
    ///
    /// See [`ScenarioDatabase::load`] and [`build`](Self::build).
    pub fn open(path: &Path, config: LookupConfig) -> Result<Self, ScenarioError> {
        let bytes = std::fs::metadata(path)?.len();
        let index = Self::build(ScenarioDatabase::load(path)?, config)?;
        Ok(index.with_encoded_size(bytes))
    }

    #[must_use]
    pub fn with_encoded_size(mut self, bytes: u64) -> Self {
        self.encoded_bytes = bytes;
        self
    }

    #[must_use]
    pub fn meta(&self) -> &DatabaseMeta {
        &self.meta
    }

    #[must_use]
    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    #[must_use]
    pub fn records(&self) -> &[ScenarioRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Size of the file the index was loaded from, 0 when built in memory.
    #[must_use]
    pub fn encoded_bytes(&self) -> u64 {
        self.encoded_bytes
    }

    #[must_use]
    pub fn get(&self, key: &ScenarioKey) -> Option<&ScenarioRecord> {
        self.keys.get(key).map(|&i| &self.records[i as usize])
    }

    /// # Errors
    ///
    /// [`ScenarioError::NoCoverage`] when nothing lies within
    /// `max_distance` of the query.
    pub fn lookup(&self, query: &LiveQuery) -> Result<Recommendation, ScenarioError> {
        self.search(query, None)
    }

    /// As [`lookup`](Self::lookup), giving up once `deadline` passes.
    ///
    /// # Errors
    ///
    /// [`ScenarioError::QueryTimeout`] past the deadline, otherwise as
    /// [`lookup`](Self::lookup).
    pub fn lookup_before(&self, query: &LiveQuery, deadline: Instant) -> Result<Recommendation, ScenarioError> {
        self.search(query, Some(deadline))
    }

    fn search(&self, query: &LiveQuery, deadline: Option<Instant>) -> Result<Recommendation, ScenarioError> {
        let no_coverage = |nearest| ScenarioError::NoCoverage { nearest, max_distance: self.config.max_distance };
        let point = self.meta.grid.coordinates(query.distance, query.speed_kmh);
        if !point.iter().all(|v| v.is_finite()) {
            return Err(no_coverage(None));
        }
        let Some(tree) = self.partitions.get(&(query.compound, query.weather)) else {
            return Err(no_coverage(None));
        };
        let tolerance = self.config.tie_tolerance.max(0.0);
        let Neighbors { best, mut found } = tree
            .search(point, self.config.max_distance, tolerance, deadline)
            .map_err(|Expired| ScenarioError::QueryTimeout { budget_ms: self.config.latency_budget_ms })?;
        if found.is_empty() || best > self.config.max_distance {
            return Err(no_coverage(best.is_finite().then_some(best)));
        }
        found.retain(|&(d, _)| d <= best + tolerance);
        found.sort_unstable_by_key(|&(_, i)| i);
        Ok(self.recommend(best, &found))
    }

    fn recommend(&self, best: f32, found: &[(f32, u32)]) -> Recommendation {
        let decay = self.config.decay.max(f32::EPSILON);
        let confidence = |coverage| {
            let c = (-best / decay).exp();
            if coverage == Coverage::Degraded {
                0.5 * c
            } else {
                c
            }
        };

        // An exact hit wins over any tie; a lone neighbour is returned as stored.
        let single = found.iter().find(|&&(d, _)| d == 0.0).or(if found.len() == 1 { found.first() } else { None });
        if let Some(&(d, i)) = single {
            let record = &self.records[i as usize];
            return Recommendation {
                action: record.action,
                predicted_delta: record.predicted_delta,
                confidence: confidence(record.coverage),
                coverage: record.coverage,
                exact: d == 0.0,
                distance: d,
                neighbors: 1,
                nearest: record.key,
            };
        }

        let mut total = 0.0;
        let (mut throttle, mut brake, mut steering, mut delta) = (0.0, 0.0, 0.0, 0.0);
        let mut coverage = Coverage::Converged;
        let mut nearest = found[0];
        for &(d, i) in found {
            let record = &self.records[i as usize];
            let w = 1.0 / d;
            total += w;
            throttle += w * record.action.throttle;
            brake += w * record.action.brake;
            steering += w * record.action.steering;
            delta += w * record.predicted_delta;
            if record.coverage == Coverage::Degraded {
                coverage = Coverage::Degraded;
            }
            if d < nearest.0 {
                nearest = (d, i);
            }
        }
        Recommendation {
            action: Action::new(throttle / total, brake / total, steering / total),
            predicted_delta: delta / total,
            confidence: confidence(coverage),
            coverage,
            exact: false,
            distance: best,
            neighbors: found.len(),
            nearest: self.records[nearest.1 as usize].key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brute_force(points: &[[f32; 2]], q: [f32; 2]) -> f32 {
        points.iter().map(|&p| distance(p, q)).fold(f32::INFINITY, f32::min)
    }

    #[test]
    fn empty_tree_finds_nothing() {
        let tree = KdTree::build(Vec::new());
        let Ok(n) = tree.search([0.0, 0.0], 3.0, 1e-3, None) else { panic!("no deadline") };
        assert!(n.found.is_empty());
    }

    #[test]
    fn expired_deadline_stops_the_search() {
        let tree = KdTree::build(vec![([1.0, 1.0], 0)]);
        let past = Instant::now();
        assert!(tree.search([0.0, 0.0], 3.0, 1e-3, Some(past)).is_err());
    }

    proptest! {
        #[test]
        fn nearest_matches_a_full_scan(
            raw in prop::collection::vec((0u32..40, 0u32..27), 1..200),
            q in (-5.0f32..45.0, -5.0f32..32.0),
        ) {
            let mut points: Vec<[f32; 2]> = raw.iter().map(|&(p, s)| [p as f32, s as f32]).collect();
            points.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
            points.dedup();
            let items = points.iter().enumerate().map(|(i, &p)| (p, i as u32)).collect();
            let tree = KdTree::build(items);
            let q = [q.0, q.1];
            let expected = brute_force(&points, q);
            let Ok(n) = tree.search(q, f32::INFINITY, 1e-3, None) else { panic!("no deadline") };
            prop_assert!((n.best - expected).abs() < 1e-5);
            let mut ties: Vec<u32> = points
                .iter()
                .enumerate()
                .filter(|(_, &p)| distance(p, q) <= expected + 1e-3)
                .map(|(i, _)| i as u32)
                .collect();
            let mut got: Vec<u32> = n.found.iter().filter(|(d, _)| *d <= n.best + 1e-3).map(|&(_, i)| i).collect();
            ties.sort_unstable();
            got.sort_unstable();
            prop_assert_eq!(got, ties);
        }
    }
}
