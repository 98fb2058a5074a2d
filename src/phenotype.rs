//! Tagged dispatch over the four network variants.
//!
//! The variants share one capability surface (`create`, `activate`, `reset`)
//! but are plain independent types; this enum picks one at configuration
//! time so evaluators can be written against a single network handle.

use crate::config::{Config, PhenotypeKind};
use crate::ctrnn::Ctrnn;
use crate::errors::NeatError;
use crate::feedforward::FeedForwardNetwork;
use crate::genome::Genome;
use crate::iznn::IzhikevichNetwork;
use crate::recurrent::RecurrentNetwork;

pub enum Phenotype {
    FeedForward(FeedForwardNetwork),
    Recurrent(RecurrentNetwork),
    Ctrnn(Ctrnn),
    Iznn(IzhikevichNetwork),
}

impl Phenotype {
    /// Compile the genome into the network variant the config selects.
    pub fn create(genome: &Genome, config: &Config) -> Result<Phenotype, NeatError> {
        Ok(match config.phenotype {
            PhenotypeKind::FeedForward => {
                Phenotype::FeedForward(FeedForwardNetwork::create(genome, config)?)
            }
            PhenotypeKind::Recurrent => {
                Phenotype::Recurrent(RecurrentNetwork::create(genome, config)?)
            }
            PhenotypeKind::Ctrnn => Phenotype::Ctrnn(Ctrnn::create(genome, config)?),
            PhenotypeKind::Iznn => Phenotype::Iznn(IzhikevichNetwork::create(genome, config)?),
        })
    }

    pub fn activate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NeatError> {
        match self {
            Phenotype::FeedForward(net) => net.activate(inputs),
            Phenotype::Recurrent(net) => net.activate(inputs),
            Phenotype::Ctrnn(net) => net.activate(inputs),
            Phenotype::Iznn(net) => net.activate(inputs),
        }
    }

    /// Clear carried state. A no-op for the stateless feed-forward variant.
    pub fn reset(&mut self) {
        match self {
            Phenotype::FeedForward(_) => {}
            Phenotype::Recurrent(net) => net.reset(),
            Phenotype::Ctrnn(net) => net.reset(),
            Phenotype::Iznn(net) => net.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::ConnectionGene;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn cyclic_genome(config: &Config) -> Genome {
        let mut genome =
            Genome::configure_new(0, &config.genome, &mut ChaCha8Rng::seed_from_u64(0));
        genome.insert_connection((0, 0), ConnectionGene::new(1.0));
        genome
    }

    #[test]
    fn each_kind_builds_and_activates() {
        for kind in [
            PhenotypeKind::FeedForward,
            PhenotypeKind::Recurrent,
            PhenotypeKind::Ctrnn,
            PhenotypeKind::Iznn,
        ] {
            let mut config = Config::new(2, 1);
            config.phenotype = kind;
            let genome =
                Genome::configure_new(0, &config.genome, &mut ChaCha8Rng::seed_from_u64(1));
            let mut net = Phenotype::create(&genome, &config).unwrap();
            assert_eq!(net.activate(&[0.5, -0.5]).unwrap().len(), 1);
            net.reset();
        }
    }

    #[test]
    fn kind_decides_cycle_legality() {
        let mut config = Config::new(2, 1);
        config.genome.feed_forward = false;
        let genome = cyclic_genome(&config);

        config.phenotype = PhenotypeKind::FeedForward;
        assert!(matches!(Phenotype::create(&genome, &config), Err(NeatError::CycleRejected)));

        config.phenotype = PhenotypeKind::Recurrent;
        assert!(Phenotype::create(&genome, &config).is_ok());
    }
}
