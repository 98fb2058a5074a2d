//! Rayon-backed fitness evaluation.
//!
//! Fitness functions are pure with respect to the population, so the cohort
//! is scattered across the rayon pool and gathered back in key order. Any
//! single failure aborts the whole generation, matching the serial
//! evaluator's contract.

use rayon::prelude::*;

use crate::config::Config;
use crate::errors::NeatError;
use crate::genome::Genome;
use crate::population::Evaluation;

pub struct ParallelEvaluator<F> {
    fitness: F,
}

impl<F> ParallelEvaluator<F>
where
    F: Fn(&Genome, &Config) -> Result<f64, NeatError> + Sync,
{
    pub fn new(fitness: F) -> ParallelEvaluator<F> {
        ParallelEvaluator { fitness }
    }
}

impl<F> Evaluation for ParallelEvaluator<F>
where
    F: Fn(&Genome, &Config) -> Result<f64, NeatError> + Sync,
{
    fn evaluate(
        &self,
        cohort: &[(u64, &Genome)],
        config: &Config,
    ) -> Result<Vec<(u64, f64)>, NeatError> {
        cohort
            .par_iter()
            .map(|&(key, genome)| Ok((key, (self.fitness)(genome, config)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::{Population, SerialEvaluator, TerminationReason};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn connection_count(genome: &Genome, _: &Config) -> Result<f64, NeatError> {
        Ok(genome.connections().len() as f64)
    }

    #[test]
    fn parallel_and_serial_evaluation_agree() {
        let config = Config::new(3, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let genomes: Vec<Genome> =
            (0..16).map(|key| Genome::configure_new(key, &config.genome, &mut rng)).collect();
        let cohort: Vec<(u64, &Genome)> =
            genomes.iter().map(|genome| (genome.key(), genome)).collect();

        let mut parallel =
            ParallelEvaluator::new(connection_count).evaluate(&cohort, &config).unwrap();
        let mut serial = SerialEvaluator::new(connection_count).evaluate(&cohort, &config).unwrap();
        parallel.sort_by_key(|&(key, _)| key);
        serial.sort_by_key(|&(key, _)| key);
        assert_eq!(parallel, serial);
    }

    #[test]
    fn single_failure_aborts_the_cohort() {
        let config = Config::new(2, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let genomes: Vec<Genome> =
            (0..8).map(|key| Genome::configure_new(key, &config.genome, &mut rng)).collect();
        let cohort: Vec<(u64, &Genome)> =
            genomes.iter().map(|genome| (genome.key(), genome)).collect();

        let evaluator = ParallelEvaluator::new(|genome: &Genome, _: &Config| {
            if genome.key() == 5 {
                Err(NeatError::Evaluation("bad genome".into()))
            } else {
                Ok(1.0)
            }
        });
        assert!(evaluator.evaluate(&cohort, &config).is_err());
    }

    #[test]
    fn drives_a_full_run() {
        let mut config = Config::new(2, 1);
        config.pop_size = 20;
        let mut population = Population::new(config).unwrap();
        let evaluator = ParallelEvaluator::new(connection_count);
        let (_, reason) = population.run(&evaluator, Some(2)).unwrap();
        assert_eq!(reason, TerminationReason::GenerationLimit);
    }
}
