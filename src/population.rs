//! The generation loop.
//!
//! A [`Population`] owns the live genomes, the species partition, the
//! innovation tracker and the run's single random stream, and drives
//! evaluate → speciate → check-termination → reproduce until a termination
//! condition fires. Identical configuration and seed reproduce the identical
//! sequence of generations.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::errors::NeatError;
use crate::genome::Genome;
use crate::innovation::InnovationTracker;
use crate::reporting::{Reporter, ReporterSet};
use crate::reproduction::Reproduction;
use crate::species::SpeciesSet;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The best fitness reached the configured threshold.
    FitnessThreshold,
    /// The caller's generation budget was spent.
    GenerationLimit,
    /// Every species died and `reset_on_extinction` is off.
    CompleteExtinction,
    /// The stop handle was raised.
    Stopped,
}

/// Where the population is in its generation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Initialized,
    Evaluating,
    Speciating,
    CheckTermination,
    Reproducing,
    Terminated(TerminationReason),
}

/// Fitness evaluation of one generation's cohort.
///
/// The evaluator sees the whole cohort at once, so implementations are free
/// to batch, cache or parallelize. A result must carry a fitness for every
/// genome in the cohort; any failure aborts the generation.
pub trait Evaluation {
    fn evaluate(
        &self,
        cohort: &[(u64, &Genome)],
        config: &Config,
    ) -> Result<Vec<(u64, f64)>, NeatError>;
}

/// Evaluates genomes one at a time with a plain fitness function.
pub struct SerialEvaluator<F> {
    fitness: F,
}

impl<F> SerialEvaluator<F>
where
    F: Fn(&Genome, &Config) -> Result<f64, NeatError>,
{
    pub fn new(fitness: F) -> SerialEvaluator<F> {
        SerialEvaluator { fitness }
    }
}

impl<F> Evaluation for SerialEvaluator<F>
where
    F: Fn(&Genome, &Config) -> Result<f64, NeatError>,
{
    fn evaluate(
        &self,
        cohort: &[(u64, &Genome)],
        config: &Config,
    ) -> Result<Vec<(u64, f64)>, NeatError> {
        cohort
            .iter()
            .map(|&(key, genome)| Ok((key, (self.fitness)(genome, config)?)))
            .collect()
    }
}

/// Restorable snapshot of a run between generations.
///
/// Carries the random stream and the species state (representatives,
/// fitness histories, stagnation clocks), so a resumed run replays the
/// uninterrupted one byte for byte.
#[derive(Serialize, Deserialize)]
pub struct Checkpoint {
    pub generation: usize,
    pub genomes: BTreeMap<u64, Genome>,
    pub species: SpeciesSet,
    pub best: Option<Genome>,
    pub next_genome_key: u64,
    pub next_node_key: i64,
    pub rng: ChaCha8Rng,
}

pub struct Population {
    config: Config,
    genomes: BTreeMap<u64, Genome>,
    species: SpeciesSet,
    reproduction: Reproduction,
    innovations: InnovationTracker,
    generation: usize,
    best: Option<Genome>,
    rng: ChaCha8Rng,
    reporters: ReporterSet,
    state: State,
    stop: Arc<AtomicBool>,
}

impl Population {
    /// A fresh population of `pop_size` random genomes, speciated and ready
    /// for the first evaluation.
    pub fn new(config: Config) -> Result<Population, NeatError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut reproduction = Reproduction::new();
        let genomes = reproduction.create_new_population(&config, &mut rng);
        let mut species = SpeciesSet::new(&config);
        species.speciate(&genomes, 0, &config);
        let innovations = InnovationTracker::new(config.genome.num_outputs);
        Ok(Population {
            config,
            genomes,
            species,
            reproduction,
            innovations,
            generation: 0,
            best: None,
            rng,
            reporters: ReporterSet::new(),
            state: State::Initialized,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Resume from a [`Checkpoint`]. The restored run continues the
    /// original's random stream and species state exactly.
    pub fn from_checkpoint(config: Config, checkpoint: Checkpoint) -> Result<Population, NeatError> {
        config.validate()?;
        Ok(Population {
            reproduction: Reproduction::with_next_genome_key(checkpoint.next_genome_key),
            innovations: InnovationTracker::with_next_node_key(checkpoint.next_node_key),
            genomes: checkpoint.genomes,
            species: checkpoint.species,
            generation: checkpoint.generation,
            best: checkpoint.best,
            rng: checkpoint.rng,
            config,
            reporters: ReporterSet::new(),
            state: State::Initialized,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Snapshot the run between generations.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            generation: self.generation,
            genomes: self.genomes.clone(),
            species: self.species.clone(),
            best: self.best.clone(),
            next_genome_key: self.reproduction.next_genome_key(),
            next_node_key: self.innovations.next_node_key(),
            rng: self.rng.clone(),
        }
    }

    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter + Send>) {
        self.reporters.add(reporter);
    }

    /// Raising the returned flag stops the run before the next generation.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn genomes(&self) -> &BTreeMap<u64, Genome> {
        &self.genomes
    }

    pub fn species(&self) -> &SpeciesSet {
        &self.species
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Best genome seen across all generations so far, with the fitness it
    /// was evaluated at.
    pub fn best(&self) -> Option<&Genome> {
        self.best.as_ref()
    }

    fn apply_fitnesses(&mut self, fitnesses: Vec<(u64, f64)>) -> Result<(), NeatError> {
        for (key, fitness) in fitnesses {
            if !fitness.is_finite() {
                return Err(NeatError::Evaluation(format!(
                    "non-finite fitness {fitness} for genome {key}"
                )));
            }
            match self.genomes.get_mut(&key) {
                Some(genome) => genome.set_fitness(fitness),
                None => {
                    return Err(NeatError::Evaluation(format!("unknown genome key {key}")));
                }
            }
        }
        if let Some(missing) = self.genomes.values().find(|g| g.fitness().is_none()) {
            return Err(NeatError::Evaluation(format!(
                "evaluator returned no fitness for genome {}",
                missing.key()
            )));
        }
        Ok(())
    }

    /// Run one full generation. Returns the termination reason once a
    /// terminal condition fires, `None` while the run should continue.
    pub fn step(
        &mut self,
        evaluator: &impl Evaluation,
    ) -> Result<Option<TerminationReason>, NeatError> {
        self.reporters.start_generation(self.generation);

        self.state = State::Evaluating;
        let cohort: Vec<(u64, &Genome)> =
            self.genomes.iter().map(|(&key, genome)| (key, genome)).collect();
        let fitnesses = evaluator.evaluate(&cohort, &self.config)?;
        self.apply_fitnesses(fitnesses)?;

        let best_key = self
            .genomes
            .values()
            .max_by(|a, b| {
                a.fitness()
                    .unwrap_or(f64::NEG_INFINITY)
                    .partial_cmp(&b.fitness().unwrap_or(f64::NEG_INFINITY))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|g| g.key());
        if let Some(best_key) = best_key {
            let candidate = &self.genomes[&best_key];
            let improved = self
                .best
                .as_ref()
                .map_or(true, |best| candidate.fitness() > best.fitness());
            if improved {
                self.best = Some(candidate.clone());
            }
            let mean = self.genomes.values().filter_map(|g| g.fitness()).sum::<f64>()
                / self.genomes.len() as f64;
            self.reporters.post_evaluate(self.generation, candidate, mean);
        }

        self.state = State::CheckTermination;
        if let (Some(threshold), Some(best)) = (self.config.fitness_threshold, self.best.as_ref()) {
            if best.fitness().unwrap_or(f64::NEG_INFINITY) >= threshold {
                let best = best.clone();
                self.reporters.found_solution(self.generation, &best);
                self.terminate(TerminationReason::FitnessThreshold);
                return Ok(Some(TerminationReason::FitnessThreshold));
            }
        }

        self.state = State::Reproducing;
        match self.reproduction.reproduce(
            &self.config,
            &mut self.species,
            &self.genomes,
            self.generation,
            &mut self.innovations,
            &mut self.rng,
        ) {
            Ok((next, removed)) => {
                for species_key in removed {
                    self.reporters.species_stagnant(species_key);
                }
                self.genomes = next;
            }
            Err(NeatError::CompleteExtinction) => {
                self.reporters.complete_extinction(self.generation);
                if !self.config.reset_on_extinction {
                    self.terminate(TerminationReason::CompleteExtinction);
                    return Ok(Some(TerminationReason::CompleteExtinction));
                }
                warn!(generation = self.generation, "restarting from a fresh population");
                self.genomes = self.reproduction.create_new_population(&self.config, &mut self.rng);
                self.species = SpeciesSet::new(&self.config);
            }
            Err(other) => return Err(other),
        }

        self.state = State::Speciating;
        self.generation += 1;
        self.species.speciate(&self.genomes, self.generation, &self.config);
        self.reporters.post_speciate(self.generation, &self.species);

        self.reporters.end_generation(self.generation, self.genomes.len());
        Ok(None)
    }

    fn terminate(&mut self, reason: TerminationReason) {
        self.state = State::Terminated(reason);
        self.reporters.terminated(&reason);
    }

    /// Drive the loop until termination, for at most `max_generations`
    /// further generations when given.
    ///
    /// Returns the best genome seen and the reason the run ended.
    pub fn run(
        &mut self,
        evaluator: &impl Evaluation,
        max_generations: Option<usize>,
    ) -> Result<(Genome, TerminationReason), NeatError> {
        let mut remaining = max_generations;
        loop {
            if self.stop.load(Ordering::Relaxed) {
                self.terminate(TerminationReason::Stopped);
                return self.finish(TerminationReason::Stopped);
            }
            if remaining == Some(0) {
                self.terminate(TerminationReason::GenerationLimit);
                return self.finish(TerminationReason::GenerationLimit);
            }
            if let Some(r) = &mut remaining {
                *r -= 1;
            }
            if let Some(reason) = self.step(evaluator)? {
                return self.finish(reason);
            }
        }
    }

    fn finish(&self, reason: TerminationReason) -> Result<(Genome, TerminationReason), NeatError> {
        match &self.best {
            Some(best) => Ok((best.clone(), reason)),
            // Stopped or limited before the first evaluation completed.
            None => Err(NeatError::Evaluation("run ended before any evaluation".into())),
        }
    }
}
