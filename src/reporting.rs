//! Run observers.
//!
//! A [`Reporter`] is notified at the lifecycle points of a run; every hook
//! has a no-op default so implementors pick only what they care about.
//! [`TracingReporter`] forwards the events to the `tracing` subscriber and
//! [`StatisticsReporter`] accumulates per-generation numbers behind a shared
//! handle that outlives the population.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::genome::Genome;
use crate::population::TerminationReason;
use crate::species::SpeciesSet;

#[allow(unused_variables)]
pub trait Reporter {
    fn start_generation(&mut self, generation: usize) {}

    /// After the evaluation barrier: every genome carries a fitness.
    fn post_evaluate(&mut self, generation: usize, best: &Genome, mean_fitness: f64) {}

    fn post_speciate(&mut self, generation: usize, species: &SpeciesSet) {}

    fn species_stagnant(&mut self, species_key: u64) {}

    fn complete_extinction(&mut self, generation: usize) {}

    fn found_solution(&mut self, generation: usize, best: &Genome) {}

    fn end_generation(&mut self, generation: usize, population_size: usize) {}

    fn terminated(&mut self, reason: &TerminationReason) {}
}

/// Fans each event out to every registered reporter, in registration order.
#[derive(Default)]
pub struct ReporterSet {
    reporters: Vec<Box<dyn Reporter + Send>>,
}

impl ReporterSet {
    pub fn new() -> ReporterSet {
        ReporterSet { reporters: Vec::new() }
    }

    pub fn add(&mut self, reporter: Box<dyn Reporter + Send>) {
        self.reporters.push(reporter);
    }

    pub fn start_generation(&mut self, generation: usize) {
        for r in &mut self.reporters {
            r.start_generation(generation);
        }
    }

    pub fn post_evaluate(&mut self, generation: usize, best: &Genome, mean_fitness: f64) {
        for r in &mut self.reporters {
            r.post_evaluate(generation, best, mean_fitness);
        }
    }

    pub fn post_speciate(&mut self, generation: usize, species: &SpeciesSet) {
        for r in &mut self.reporters {
            r.post_speciate(generation, species);
        }
    }

    pub fn species_stagnant(&mut self, species_key: u64) {
        for r in &mut self.reporters {
            r.species_stagnant(species_key);
        }
    }

    pub fn complete_extinction(&mut self, generation: usize) {
        for r in &mut self.reporters {
            r.complete_extinction(generation);
        }
    }

    pub fn found_solution(&mut self, generation: usize, best: &Genome) {
        for r in &mut self.reporters {
            r.found_solution(generation, best);
        }
    }

    pub fn end_generation(&mut self, generation: usize, population_size: usize) {
        for r in &mut self.reporters {
            r.end_generation(generation, population_size);
        }
    }

    pub fn terminated(&mut self, reason: &TerminationReason) {
        for r in &mut self.reporters {
            r.terminated(reason);
        }
    }
}

/// Emits the run's progress as `tracing` events.
#[derive(Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn start_generation(&mut self, generation: usize) {
        info!(generation, "starting generation");
    }

    fn post_evaluate(&mut self, generation: usize, best: &Genome, mean_fitness: f64) {
        let (nodes, connections) = best.size();
        info!(
            generation,
            best_fitness = best.fitness().unwrap_or(f64::NEG_INFINITY),
            mean_fitness,
            best_nodes = nodes,
            best_connections = connections,
            "evaluated population"
        );
    }

    fn post_speciate(&mut self, generation: usize, species: &SpeciesSet) {
        info!(
            generation,
            species = species.species().len(),
            threshold = species.compatibility_threshold(),
            "speciated population"
        );
    }

    fn species_stagnant(&mut self, species_key: u64) {
        info!(species = species_key, "species removed for stagnation");
    }

    fn complete_extinction(&mut self, generation: usize) {
        warn!(generation, "all species extinct");
    }

    fn found_solution(&mut self, generation: usize, best: &Genome) {
        info!(
            generation,
            best_key = best.key(),
            best_fitness = best.fitness().unwrap_or(f64::NEG_INFINITY),
            "fitness threshold reached"
        );
    }

    fn end_generation(&mut self, generation: usize, population_size: usize) {
        info!(generation, population_size, "generation complete");
    }

    fn terminated(&mut self, reason: &TerminationReason) {
        info!(?reason, "run terminated");
    }
}

/// Per-generation aggregates of one run.
#[derive(Debug, Clone, Default)]
pub struct GenerationStatistics {
    pub generation: usize,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub species_count: usize,
}

#[derive(Default)]
struct StatisticsInner {
    generations: Vec<GenerationStatistics>,
    species_count: usize,
}

/// Read side of [`StatisticsReporter`]; clone it before handing the reporter
/// to the population.
#[derive(Clone, Default)]
pub struct StatisticsHandle {
    inner: Arc<Mutex<StatisticsInner>>,
}

impl StatisticsHandle {
    pub fn generations(&self) -> Vec<GenerationStatistics> {
        match self.inner.lock() {
            Ok(inner) => inner.generations.clone(),
            Err(_) => Vec::new(),
        }
    }

    pub fn best_fitness_per_generation(&self) -> Vec<f64> {
        self.generations().iter().map(|g| g.best_fitness).collect()
    }
}

/// Collects per-generation statistics, readable through a shared handle.
#[derive(Default)]
pub struct StatisticsReporter {
    handle: StatisticsHandle,
}

impl StatisticsReporter {
    pub fn new() -> StatisticsReporter {
        StatisticsReporter::default()
    }

    pub fn handle(&self) -> StatisticsHandle {
        self.handle.clone()
    }
}

impl Reporter for StatisticsReporter {
    fn post_evaluate(&mut self, generation: usize, best: &Genome, mean_fitness: f64) {
        if let Ok(mut inner) = self.handle.inner.lock() {
            let species_count = inner.species_count;
            inner.generations.push(GenerationStatistics {
                generation,
                best_fitness: best.fitness().unwrap_or(f64::NEG_INFINITY),
                mean_fitness,
                species_count,
            });
        }
    }

    fn post_speciate(&mut self, _generation: usize, species: &SpeciesSet) {
        if let Ok(mut inner) = self.handle.inner.lock() {
            inner.species_count = species.species().len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn statistics_accumulate_across_generations() {
        let config = Config::new(2, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut best = Genome::configure_new(0, &config.genome, &mut rng);
        best.set_fitness(1.5);

        let reporter = StatisticsReporter::new();
        let handle = reporter.handle();
        let mut set = ReporterSet::new();
        set.add(Box::new(reporter));

        set.post_evaluate(0, &best, 0.75);
        best.set_fitness(2.0);
        set.post_evaluate(1, &best, 1.0);

        let generations = handle.generations();
        assert_eq!(generations.len(), 2);
        assert_eq!(generations[0].best_fitness, 1.5);
        assert_eq!(generations[1].best_fitness, 2.0);
    }

    #[test]
    fn reporter_defaults_are_no_ops() {
        struct Silent;
        impl Reporter for Silent {}
        let mut set = ReporterSet::new();
        set.add(Box::new(Silent));
        set.start_generation(0);
        set.end_generation(0, 10);
        set.terminated(&TerminationReason::GenerationLimit);
    }
}
