//! Offspring allocation and production of the next generation.
//!
//! Spawn counts per species are proportional to fitness-shared (adjusted)
//! species fitness, smoothed toward the previous species size so allocations
//! do not thrash. Within a species the fittest genomes are copied verbatim
//! (elitism) and the top survival fraction serves as the parent pool for
//! crossover plus mutation.

use std::collections::BTreeMap;

use itertools::{Itertools, MinMaxResult};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::config::Config;
use crate::errors::NeatError;
use crate::genome::Genome;
use crate::innovation::InnovationTracker;
use crate::species::SpeciesSet;

pub struct Reproduction {
    next_genome_key: u64,
}

/// Smooth each species' allocation halfway from its previous size toward its
/// fitness-proportional share, then rescale so the counts sum to `pop_size`.
fn compute_spawn(
    adjusted_fitness: &[f64],
    previous_sizes: &[usize],
    pop_size: usize,
    min_species_size: usize,
) -> Vec<usize> {
    let af_sum: f64 = adjusted_fitness.iter().sum();

    let mut spawn_amounts: Vec<i64> = Vec::with_capacity(adjusted_fitness.len());
    for (&af, &prev) in adjusted_fitness.iter().zip(previous_sizes) {
        let share = if af_sum > 0.0 {
            (min_species_size as f64).max(af / af_sum * pop_size as f64)
        } else {
            min_species_size as f64
        };
        let delta = (share - prev as f64) * 0.5;
        let step = delta.round() as i64;
        let spawn = if step != 0 {
            prev as i64 + step
        } else if delta > 0.0 {
            prev as i64 + 1
        } else if delta < 0.0 {
            prev as i64 - 1
        } else {
            prev as i64
        };
        spawn_amounts.push(spawn);
    }

    let total: i64 = spawn_amounts.iter().sum();
    let norm = pop_size as f64 / total as f64;
    let mut spawn_amounts: Vec<usize> = spawn_amounts
        .iter()
        .map(|&n| min_species_size.max((n as f64 * norm).round() as usize))
        .collect();

    // Rounding drift is settled on the largest allocation so the population
    // size stays exact.
    let total: usize = spawn_amounts.iter().sum();
    if let Some(largest) = spawn_amounts.iter_mut().max() {
        if total > pop_size {
            *largest = largest.saturating_sub(total - pop_size).max(min_species_size);
        } else {
            *largest += pop_size - total;
        }
    }
    spawn_amounts
}

impl Reproduction {
    pub fn new() -> Reproduction {
        Reproduction { next_genome_key: 0 }
    }

    /// Restore the key counter from a checkpoint.
    pub fn with_next_genome_key(next_genome_key: u64) -> Reproduction {
        Reproduction { next_genome_key }
    }

    pub fn next_genome_key(&self) -> u64 {
        self.next_genome_key
    }

    /// A fresh random population of `pop_size` genomes.
    pub fn create_new_population(
        &mut self,
        config: &Config,
        rng: &mut impl Rng,
    ) -> BTreeMap<u64, Genome> {
        let mut genomes = BTreeMap::new();
        for _ in 0..config.pop_size {
            let key = self.next_genome_key;
            self.next_genome_key += 1;
            genomes.insert(key, Genome::configure_new(key, &config.genome, rng));
        }
        genomes
    }

    /// Produce the next generation from the speciated, evaluated current one.
    ///
    /// Stagnant species are removed first; if nothing survives, the
    /// population is extinct and the error is returned for the caller to
    /// handle. Returns the new population together with the keys of the
    /// species removed for stagnation.
    pub fn reproduce(
        &mut self,
        config: &Config,
        species_set: &mut SpeciesSet,
        genomes: &BTreeMap<u64, Genome>,
        generation: usize,
        innovations: &mut InnovationTracker,
        rng: &mut impl Rng,
    ) -> Result<(BTreeMap<u64, Genome>, Vec<u64>), NeatError> {
        innovations.begin_generation();

        let flagged = species_set.update_fitness_and_stagnation(genomes, generation, config);
        let mut removed = Vec::new();
        for (species_key, stagnant) in flagged {
            if stagnant {
                info!(species = species_key, "removing stagnant species");
                species_set.remove(species_key);
                removed.push(species_key);
            }
        }
        if species_set.species().is_empty() {
            return Err(NeatError::CompleteExtinction);
        }

        // Fitness sharing: rescale each species' mean fitness into [0, 1]
        // relative to the population's fitness range.
        let (min_fitness, max_fitness) = match species_set
            .species()
            .values()
            .flat_map(|s| s.members.iter().filter_map(|k| genomes[k].fitness()))
            .minmax()
        {
            MinMaxResult::NoElements => (0.0, 0.0),
            MinMaxResult::OneElement(f) => (f, f),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        };
        let fitness_range = (max_fitness - min_fitness).max(1.0);

        let mut species_keys = Vec::new();
        let mut adjusted = Vec::new();
        let mut previous_sizes = Vec::new();
        for species in species_set.species_mut().values_mut() {
            let mean = species.fitness.unwrap_or(min_fitness);
            let af = (mean - min_fitness) / fitness_range;
            species.adjusted_fitness = Some(af);
            species_keys.push(species.key);
            adjusted.push(af);
            previous_sizes.push(species.members.len());
        }

        let min_species_size = config.reproduction.min_species_size.max(config.reproduction.elitism);
        let spawn_amounts =
            compute_spawn(&adjusted, &previous_sizes, config.pop_size, min_species_size);
        debug!(?species_keys, ?spawn_amounts, "allocated offspring");

        let mut next = BTreeMap::new();
        for (&species_key, &spawn) in species_keys.iter().zip(&spawn_amounts) {
            let species = &species_set.species()[&species_key];

            // Fittest first.
            let mut members: Vec<&Genome> = species.members.iter().map(|k| &genomes[k]).collect();
            members.sort_by(|a, b| {
                b.fitness()
                    .unwrap_or(f64::NEG_INFINITY)
                    .partial_cmp(&a.fitness().unwrap_or(f64::NEG_INFINITY))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut spawn = spawn;
            for elite in members.iter().take(config.reproduction.elitism) {
                if spawn == 0 {
                    break;
                }
                let mut clone = (*elite).clone();
                clone.clear_fitness();
                next.insert(clone.key(), clone);
                spawn -= 1;
            }

            let cutoff = ((config.reproduction.survival_threshold * members.len() as f64).ceil()
                as usize)
                .max(2)
                .min(members.len());
            let parents = &members[..cutoff];

            for _ in 0..spawn {
                let parent1 = parents.choose(rng).copied();
                let parent2 = parents.choose(rng).copied();
                let (Some(parent1), Some(parent2)) = (parent1, parent2) else { continue };
                let key = self.next_genome_key;
                self.next_genome_key += 1;
                let mut child = Genome::crossover(key, parent1, parent2, &config.genome, rng);
                child.mutate(&config.genome, innovations, rng);
                next.insert(key, child);
            }
        }

        Ok((next, removed))
    }
}

impl Default for Reproduction {
    fn default() -> Self {
        Reproduction::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn spawn_counts_sum_to_population_size() {
        let adjusted = [0.9, 0.3, 0.0];
        let previous = [40, 40, 70];
        let spawn = compute_spawn(&adjusted, &previous, 150, 2);
        assert_eq!(spawn.iter().sum::<usize>(), 150);
        assert!(spawn.iter().all(|&s| s >= 2));
    }

    #[test]
    fn zero_fitness_everywhere_still_spawns_minimums() {
        let spawn = compute_spawn(&[0.0, 0.0], &[5, 5], 10, 2);
        assert_eq!(spawn.iter().sum::<usize>(), 10);
    }

    #[test]
    fn fitter_species_receive_more_offspring() {
        let spawn = compute_spawn(&[1.0, 0.1], &[50, 50], 100, 2);
        assert!(spawn[0] > spawn[1]);
    }

    #[test]
    fn fresh_population_has_pop_size_genomes_with_unique_keys() {
        let mut config = Config::new(2, 1);
        config.pop_size = 25;
        let mut reproduction = Reproduction::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let genomes = reproduction.create_new_population(&config, &mut rng);
        assert_eq!(genomes.len(), 25);
        let second = reproduction.create_new_population(&config, &mut rng);
        assert!(second.keys().all(|k| !genomes.contains_key(k)));
    }

    #[test]
    fn reproduce_keeps_population_size_and_preserves_elites() {
        let mut config = Config::new(2, 1);
        config.pop_size = 30;
        let mut reproduction = Reproduction::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut innovations = InnovationTracker::new(config.genome.num_outputs);
        let mut genomes = reproduction.create_new_population(&config, &mut rng);
        for (i, genome) in genomes.values_mut().enumerate() {
            genome.set_fitness(i as f64);
        }
        let mut species_set = SpeciesSet::new(&config);
        species_set.speciate(&genomes, 0, &config);

        let (next, removed) = reproduction
            .reproduce(&config, &mut species_set, &genomes, 0, &mut innovations, &mut rng)
            .unwrap();
        assert_eq!(next.len(), 30);
        assert!(removed.is_empty());
        // The best genome survives verbatim under its own key, fitness
        // cleared for re-evaluation.
        let best_key = 29;
        assert!(next.contains_key(&best_key));
        assert_eq!(next[&best_key].connections(), genomes[&best_key].connections());
        assert!(next[&best_key].fitness().is_none());
    }

    #[test]
    fn universal_stagnation_is_complete_extinction() {
        let mut config = Config::new(2, 1);
        config.pop_size = 10;
        config.stagnation.max_stagnation = 1;
        config.stagnation.species_elitism = 1;
        let mut reproduction = Reproduction::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut innovations = InnovationTracker::new(config.genome.num_outputs);
        let mut genomes = reproduction.create_new_population(&config, &mut rng);
        for genome in genomes.values_mut() {
            genome.set_fitness(0.0);
        }
        let mut species_set = SpeciesSet::new(&config);
        species_set.speciate(&genomes, 0, &config);
        // Manually empty the set to model every species being culled.
        let keys: Vec<u64> = species_set.species().keys().copied().collect();
        for key in keys {
            species_set.remove(key);
        }
        let result =
            reproduction.reproduce(&config, &mut species_set, &genomes, 5, &mut innovations, &mut rng);
        assert!(matches!(result, Err(NeatError::CompleteExtinction)));
    }
}
