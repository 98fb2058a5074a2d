//! Speciation: partitioning the population by genetic distance.
//!
//! > The idea is to divide the population into species such that similar
//! > topologies are in the same species.
//! [Pag. 110, NEAT](http://nn.cs.utexas.edu/downloads/papers/stanley.ec02.pdf)
//!
//! Every genome joins the first existing species (ascending species key)
//! whose representative is within the compatibility threshold, or founds a
//! new species with itself as representative. Representatives are refreshed
//! to the member closest to the previous representative, which keeps species
//! identity stable across generations.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::genome::Genome;

/// A group of genetically similar genomes, tracked across generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    pub key: u64,
    /// Generation the species was founded in.
    pub created: usize,
    /// Generation of the last fitness-history improvement.
    pub last_improved: usize,
    /// The genome new candidates are compared against.
    pub representative: Genome,
    /// Keys of the member genomes, current generation only.
    pub members: Vec<u64>,
    /// Mean member fitness of the current generation.
    pub fitness: Option<f64>,
    pub adjusted_fitness: Option<f64>,
    /// One mean-fitness entry per lived generation.
    pub fitness_history: Vec<f64>,
}

impl Species {
    fn new(key: u64, generation: usize, representative: Genome) -> Species {
        Species {
            key,
            created: generation,
            last_improved: generation,
            representative,
            members: Vec::new(),
            fitness: None,
            adjusted_fitness: None,
            fitness_history: Vec::new(),
        }
    }

    /// Generations since the species last improved its best mean fitness.
    pub fn generations_stagnant(&self, generation: usize) -> usize {
        generation.saturating_sub(self.last_improved)
    }
}

/// Distance cache for one speciation pass. Distance is symmetric, so pairs
/// are keyed with the smaller genome key first.
struct DistanceCache<'a> {
    config: &'a Config,
    distances: HashMap<(u64, u64), f64>,
    hits: usize,
    misses: usize,
}

impl<'a> DistanceCache<'a> {
    fn new(config: &'a Config) -> DistanceCache<'a> {
        DistanceCache { config, distances: HashMap::new(), hits: 0, misses: 0 }
    }

    fn distance(&mut self, g1: &Genome, g2: &Genome) -> f64 {
        let key = if g1.key() <= g2.key() { (g1.key(), g2.key()) } else { (g2.key(), g1.key()) };
        match self.distances.get(&key) {
            Some(&d) => {
                self.hits += 1;
                d
            }
            None => {
                self.misses += 1;
                let d = g1.distance(g2, &self.config.genome);
                self.distances.insert(key, d);
                d
            }
        }
    }
}

/// The set of all living species plus the adaptive compatibility threshold.
#[derive(Clone, Serialize, Deserialize)]
pub struct SpeciesSet {
    species: BTreeMap<u64, Species>,
    next_key: u64,
    compatibility_threshold: f64,
    genome_to_species: HashMap<u64, u64>,
}

impl SpeciesSet {
    pub fn new(config: &Config) -> SpeciesSet {
        SpeciesSet {
            species: BTreeMap::new(),
            next_key: 0,
            compatibility_threshold: config.speciation.compatibility_threshold,
            genome_to_species: HashMap::new(),
        }
    }

    pub fn species(&self) -> &BTreeMap<u64, Species> {
        &self.species
    }

    pub(crate) fn species_mut(&mut self) -> &mut BTreeMap<u64, Species> {
        &mut self.species
    }

    pub fn compatibility_threshold(&self) -> f64 {
        self.compatibility_threshold
    }

    /// The species a genome was assigned to in the last speciation pass.
    pub fn species_of(&self, genome_key: u64) -> Option<u64> {
        self.genome_to_species.get(&genome_key).copied()
    }

    /// Partition the population into species.
    ///
    /// Every genome lands in exactly one species. Species left without
    /// members are dropped; afterwards, when a target species count is
    /// configured, the threshold is stepped toward it (never below the
    /// configured floor).
    pub fn speciate(
        &mut self,
        genomes: &BTreeMap<u64, Genome>,
        generation: usize,
        config: &Config,
    ) {
        let mut cache = DistanceCache::new(config);

        for species in self.species.values_mut() {
            species.members.clear();
            species.fitness = None;
            species.adjusted_fitness = None;
        }
        self.genome_to_species.clear();

        for genome in genomes.values() {
            let mut assigned = None;
            for species in self.species.values_mut() {
                if cache.distance(genome, &species.representative) < self.compatibility_threshold {
                    assigned = Some(species.key);
                    species.members.push(genome.key());
                    break;
                }
            }
            let species_key = match assigned {
                Some(key) => key,
                None => {
                    let key = self.next_key;
                    self.next_key += 1;
                    let mut species = Species::new(key, generation, genome.clone());
                    species.members.push(genome.key());
                    self.species.insert(key, species);
                    key
                }
            };
            self.genome_to_species.insert(genome.key(), species_key);
        }

        self.species.retain(|_, s| !s.members.is_empty());

        // Refresh each representative to the member nearest the previous one,
        // so the species' genetic identity drifts with its population.
        for species in self.species.values_mut() {
            let mut best: Option<(u64, f64)> = None;
            for &member_key in &species.members {
                let d = cache.distance(&genomes[&member_key], &species.representative);
                if best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((member_key, d));
                }
            }
            if let Some((member_key, _)) = best {
                species.representative = genomes[&member_key].clone();
            }
        }

        if let Some(target) = config.speciation.target_species {
            if self.species.len() > target {
                self.compatibility_threshold += config.speciation.threshold_adjust_step;
            } else if self.species.len() < target {
                self.compatibility_threshold = (self.compatibility_threshold
                    - config.speciation.threshold_adjust_step)
                    .max(config.speciation.threshold_floor);
            }
        }

        debug!(
            species = self.species.len(),
            threshold = self.compatibility_threshold,
            cache_hits = cache.hits,
            cache_misses = cache.misses,
            "speciated population"
        );
    }

    /// Recompute each species' mean fitness, update its history and
    /// stagnation clock, and report `(species key, is_stagnant)` pairs.
    ///
    /// The `species_elitism` fittest species are never marked stagnant, so
    /// stagnation alone cannot extinguish the population.
    pub fn update_fitness_and_stagnation(
        &mut self,
        genomes: &BTreeMap<u64, Genome>,
        generation: usize,
        config: &Config,
    ) -> Vec<(u64, bool)> {
        for species in self.species.values_mut() {
            let fitnesses: Vec<f64> =
                species.members.iter().filter_map(|k| genomes[k].fitness()).collect();
            let mean = if fitnesses.is_empty() {
                0.0
            } else {
                fitnesses.iter().sum::<f64>() / fitnesses.len() as f64
            };
            let previous_best =
                species.fitness_history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            species.fitness = Some(mean);
            species.fitness_history.push(mean);
            if mean > previous_best {
                species.last_improved = generation;
            }
        }

        // Ascending fitness: the strongest species sit at the end of the
        // list, inside the elitism window.
        let ranked: Vec<(u64, f64)> = self
            .species
            .values()
            .map(|s| (s.key, s.fitness.unwrap_or(f64::NEG_INFINITY)))
            .sorted_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .collect();

        let total = ranked.len();
        let protected = config.stagnation.species_elitism.min(total);
        ranked
            .iter()
            .enumerate()
            .map(|(rank, &(key, _))| {
                let stagnant = rank < total - protected
                    && self.species[&key].generations_stagnant(generation)
                        >= config.stagnation.max_stagnation;
                (key, stagnant)
            })
            .collect()
    }

    /// Drop a species, forgetting its members.
    pub fn remove(&mut self, species_key: u64) {
        if let Some(species) = self.species.remove(&species_key) {
            for member in species.members {
                self.genome_to_species.remove(&member);
            }
        }
    }
}
