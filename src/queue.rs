//! The mutation-candidate seed queue and its two power schedules.
//!
//! Selection is index-based: `select` hands back a position, the loop updates
//! counters and energy through that position once the trial is done, and new
//! seeds are only pushed afterwards. This replaces the borrow-while-inserting
//! pattern the schedules would otherwise need.

use std::str::FromStr;

use rand::{Rng, RngCore};

use crate::coverage::{PathId, PathRegistry};
use crate::error::{Error, Result};

/// An input retained for mutation, annotated with its execution path and
/// schedule metadata.
#[derive(Debug, Clone)]
pub struct Seed {
    pub input: Vec<u8>,
    pub path: PathId,
    pub exec_time_ms: f64,
    pub n_selected: usize,
    pub n_improved: usize,
    pub energy: f64,
}

impl Seed {
    pub fn new(input: Vec<u8>, path: PathId, exec_time_ms: f64) -> Self {
        debug_assert!(!input.is_empty());
        let mut seed = Self {
            input,
            path,
            exec_time_ms,
            n_selected: 1,
            n_improved: 1,
            energy: 0.0,
        };
        seed.energy = seed.power();
        seed
    }

    /// Deterministic energy used by the simple schedule: fast, short and
    /// productive seeds score high.
    fn power(&self) -> f64 {
        1.0 / (self.exec_time_ms * self.input.len() as f64 * self.n_selected as f64
            / self.n_improved as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Simple,
    Boosted,
}

impl FromStr for Schedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simple" => Ok(Self::Simple),
            "boosted" => Ok(Self::Boosted),
            other => Err(Error::UnknownSchedule(other.to_string())),
        }
    }
}

impl Schedule {
    pub fn build(self) -> Box<dyn SeedQueue> {
        match self {
            Self::Simple => Box::new(SimpleQueue::default()),
            Self::Boosted => Box::new(BoostedQueue::default()),
        }
    }
}

/// Common interface of the two schedules.
pub trait SeedQueue {
    fn add(&mut self, seed: Seed);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, idx: usize) -> &Seed;

    /// Draw one seed with probability weighted by its energy. Refuses on an
    /// empty queue.
    fn select(&mut self, rng: &mut dyn RngCore, registry: &PathRegistry) -> Result<usize>;

    fn mark_selected(&mut self, idx: usize);

    fn reward_improved(&mut self, idx: usize);

    /// Recompute the seed's energy from its counters and restore the queue
    /// order after a trial.
    fn reweigh(&mut self, idx: usize);
}

/// Deterministic weighting, storage ordered by energy descending. The best
/// tenth of the queue shares half the probability mass uniformly; the rest
/// shares the other half.
#[derive(Default)]
pub struct SimpleQueue {
    seeds: Vec<Seed>,
}

impl SimpleQueue {
    fn insert_sorted(&mut self, seed: Seed) {
        let at = self.seeds.partition_point(|other| other.energy >= seed.energy);
        self.seeds.insert(at, seed);
    }
}

impl SeedQueue for SimpleQueue {
    fn add(&mut self, seed: Seed) {
        self.insert_sorted(seed);
    }

    fn len(&self) -> usize {
        self.seeds.len()
    }

    fn get(&self, idx: usize) -> &Seed {
        &self.seeds[idx]
    }

    fn select(&mut self, rng: &mut dyn RngCore, _registry: &PathRegistry) -> Result<usize> {
        if self.seeds.is_empty() {
            return Err(Error::EmptyQueue);
        }
        if self.seeds.len() == 1 {
            return Ok(0);
        }

        let top = (self.seeds.len() / 10).max(1);
        let weight_good = 0.5 / top as f64;
        let weight_rest = 0.5 / (self.seeds.len() - top) as f64;

        let roll: f64 = rng.gen();
        let mut cumulative = 0.0;
        for i in 0..self.seeds.len() {
            cumulative += if i < top { weight_good } else { weight_rest };
            if roll <= cumulative {
                return Ok(i);
            }
        }
        Ok(self.seeds.len() - 1)
    }

    fn mark_selected(&mut self, idx: usize) {
        self.seeds[idx].n_selected += 1;
    }

    fn reward_improved(&mut self, idx: usize) {
        self.seeds[idx].n_improved += 1;
    }

    fn reweigh(&mut self, idx: usize) {
        let mut seed = self.seeds.remove(idx);
        seed.energy = seed.power();
        self.insert_sorted(seed);
    }
}

/// Rarity weighting, storage in insertion order. Energy is read lazily at
/// selection time as `1 / occurrences(path)^5`, so a path that keeps showing
/// up bleeds energy without any bookkeeping on the seeds.
#[derive(Default)]
pub struct BoostedQueue {
    seeds: Vec<Seed>,
}

impl BoostedQueue {
    fn rarity(seed: &Seed, registry: &PathRegistry) -> f64 {
        1.0 / (registry.occurrences(seed.path) as f64).powi(5)
    }
}

impl SeedQueue for BoostedQueue {
    fn add(&mut self, seed: Seed) {
        self.seeds.push(seed);
    }

    fn len(&self) -> usize {
        self.seeds.len()
    }

    fn get(&self, idx: usize) -> &Seed {
        &self.seeds[idx]
    }

    fn select(&mut self, rng: &mut dyn RngCore, registry: &PathRegistry) -> Result<usize> {
        if self.seeds.is_empty() {
            return Err(Error::EmptyQueue);
        }

        let total: f64 = self
            .seeds
            .iter()
            .map(|seed| Self::rarity(seed, registry))
            .sum();

        let roll = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        for (i, seed) in self.seeds.iter().enumerate() {
            cumulative += Self::rarity(seed, registry);
            if roll <= cumulative {
                return Ok(i);
            }
        }
        Ok(self.seeds.len() - 1)
    }

    fn mark_selected(&mut self, idx: usize) {
        self.seeds[idx].n_selected += 1;
    }

    fn reward_improved(&mut self, idx: usize) {
        self.seeds[idx].n_improved += 1;
    }

    fn reweigh(&mut self, _idx: usize) {
        // Rarity is read from the registry at selection time.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CoveragePath;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn registry_with_paths(n: usize) -> (PathRegistry, Vec<PathId>) {
        let mut registry = PathRegistry::new();
        let ids = (0..n)
            .map(|i| {
                let bits = (0..n).map(|j| j == i).collect();
                registry.record(CoveragePath::new(bits)).0
            })
            .collect();
        (registry, ids)
    }

    #[test]
    fn both_schedules_refuse_an_empty_queue() {
        let mut rng = StdRng::seed_from_u64(1);
        let (registry, _) = registry_with_paths(1);

        let mut simple = SimpleQueue::default();
        assert!(matches!(
            simple.select(&mut rng, &registry),
            Err(Error::EmptyQueue)
        ));

        let mut boosted = BoostedQueue::default();
        assert!(matches!(
            boosted.select(&mut rng, &registry),
            Err(Error::EmptyQueue)
        ));
    }

    #[test]
    fn simple_queue_orders_by_energy_descending() {
        let (_, ids) = registry_with_paths(3);
        let mut queue = SimpleQueue::default();

        // Larger inputs and slower runs score lower.
        queue.add(Seed::new(vec![b'a'; 100], ids[0], 10.0));
        queue.add(Seed::new(vec![b'a'; 2], ids[1], 1.0));
        queue.add(Seed::new(vec![b'a'; 10], ids[2], 1.0));

        assert_eq!(queue.get(0).input.len(), 2);
        assert_eq!(queue.get(1).input.len(), 10);
        assert_eq!(queue.get(2).input.len(), 100);
    }

    #[test]
    fn reweigh_demotes_an_often_selected_seed() {
        let (_, ids) = registry_with_paths(2);
        let mut queue = SimpleQueue::default();
        queue.add(Seed::new(b"aa".to_vec(), ids[0], 1.0));
        queue.add(Seed::new(b"aaa".to_vec(), ids[1], 1.0));
        assert_eq!(queue.get(0).input, b"aa");

        for _ in 0..10 {
            queue.mark_selected(0);
        }
        queue.reweigh(0);

        assert_eq!(queue.get(0).input, b"aaa");
        assert_eq!(queue.get(1).n_selected, 11);
    }

    #[test]
    fn simple_selection_favors_the_top_seed() {
        let mut rng = StdRng::seed_from_u64(2);
        let (registry, ids) = registry_with_paths(20);
        let mut queue = SimpleQueue::default();
        for (i, id) in ids.iter().enumerate() {
            queue.add(Seed::new(vec![b'a'; i + 1], *id, 1.0));
        }

        let mut top_picks = 0;
        const ROUNDS: usize = 2000;
        for _ in 0..ROUNDS {
            let idx = queue.select(&mut rng, &registry).unwrap();
            if idx < 2 {
                top_picks += 1;
            }
        }
        // The top tenth (2 of 20) carries half the probability mass.
        assert!(top_picks > ROUNDS / 3, "top picks: {top_picks}");
    }

    #[test]
    fn boosted_selection_prefers_rare_paths() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut registry = PathRegistry::new();

        let common = CoveragePath::new(vec![true, false]);
        let rare = CoveragePath::new(vec![false, true]);
        let (common_id, _) = registry.record(common.clone());
        for _ in 0..9 {
            registry.record(common.clone());
        }
        let (rare_id, _) = registry.record(rare);

        let mut queue = BoostedQueue::default();
        queue.add(Seed::new(b"common".to_vec(), common_id, 1.0));
        queue.add(Seed::new(b"rare".to_vec(), rare_id, 1.0));

        let mut rare_picks = 0;
        const ROUNDS: usize = 1000;
        for _ in 0..ROUNDS {
            if queue.select(&mut rng, &registry).unwrap() == 1 {
                rare_picks += 1;
            }
        }
        // Rarity is raised to the fifth power; the common path is 10x more
        // frequent, so the rare seed should win essentially always.
        assert!(rare_picks > ROUNDS * 9 / 10, "rare picks: {rare_picks}");
    }

    #[test]
    fn boosted_queue_keeps_insertion_order() {
        let (_, ids) = registry_with_paths(2);
        let mut queue = BoostedQueue::default();
        queue.add(Seed::new(b"first".to_vec(), ids[0], 50.0));
        queue.add(Seed::new(b"second".to_vec(), ids[1], 1.0));
        assert_eq!(queue.get(0).input, b"first");
        assert_eq!(queue.get(1).input, b"second");
    }
}
