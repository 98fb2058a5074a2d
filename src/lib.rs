//! Implementation of `NeuroEvolution` of Augmenting Topologies [NEAT]
//! (http://nn.cs.utexas.edu/downloads/papers/stanley.ec02.pdf)
//!
//! Genomes carry node and connection genes keyed by innovation identifiers,
//! the population is partitioned into species by genetic distance, and each
//! species reproduces in proportion to its fitness-shared mean fitness.
//! Evolved genomes compile into one of four phenotypes: feed-forward,
//! recurrent, continuous-time (CTRNN) or spiking (Izhikevich).

pub mod activations;
pub mod aggregations;
pub mod config;
pub mod ctrnn;
pub mod errors;
pub mod feedforward;
pub mod genome;
pub mod graphs;
pub mod innovation;
pub mod iznn;
pub mod parallel;
pub mod phenotype;
pub mod population;
pub mod recurrent;
pub mod reporting;
pub mod reproduction;
pub mod species;

pub use self::config::{Config, GenomeConfig, InitialConnectivity, PhenotypeKind, SpikeOutput};
pub use self::ctrnn::Ctrnn;
pub use self::errors::NeatError;
pub use self::feedforward::FeedForwardNetwork;
pub use self::genome::{ConnKey, ConnectionGene, Genome, NodeGene};
pub use self::iznn::IzhikevichNetwork;
pub use self::parallel::ParallelEvaluator;
pub use self::phenotype::Phenotype;
pub use self::population::{Evaluation, Population, SerialEvaluator, TerminationReason};
pub use self::recurrent::RecurrentNetwork;
pub use self::reporting::{Reporter, StatisticsReporter, TracingReporter};
pub use self::species::{Species, SpeciesSet};
