//! Configuration surface of the engine.
//!
//! Plain structs with sensible defaults; the engine consumes a fully built
//! [`Config`] and never touches configuration files itself. Every stochastic
//! magnitude and probability of the genetic operators lives here, together
//! with the activation/aggregation registries (extendable before a run
//! starts).

use crate::activations::ActivationRegistry;
use crate::aggregations::AggregationRegistry;
use crate::errors::NeatError;

/// How the initial population's genomes are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialConnectivity {
    /// Every input connected to every output.
    Full,
    /// No connections; structure must be discovered by mutation.
    None,
}

/// Which executable network genomes compile into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhenotypeKind {
    FeedForward,
    Recurrent,
    Ctrnn,
    Iznn,
}

/// How a spiking network reports its outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpikeOutput {
    /// 1.0 on the tick a spike fired, 0.0 otherwise.
    Spike,
    /// The raw membrane potential.
    MembranePotential,
}

/// Genome shape, mutation probabilities and distance coefficients.
#[derive(Debug, Clone)]
pub struct GenomeConfig {
    pub num_inputs: usize,
    pub num_outputs: usize,
    /// Feed-forward legality mode: reject connections that would close a
    /// cycle. Recurrent mode permits arbitrary cycles including self-loops.
    pub feed_forward: bool,
    pub initial_connectivity: InitialConnectivity,

    pub activation_default: String,
    /// Pool drawn from when an activation mutation fires.
    pub activation_options: Vec<String>,
    pub activation_mutate_rate: f64,

    pub aggregation_default: String,
    pub aggregation_options: Vec<String>,
    pub aggregation_mutate_rate: f64,

    pub bias_init_mean: f64,
    pub bias_init_range: f64,
    pub bias_min: f64,
    pub bias_max: f64,
    pub bias_mutate_rate: f64,
    pub bias_replace_rate: f64,
    pub bias_mutate_power: f64,

    /// Response multiplier applied between aggregation and activation:
    /// `activation(bias + response * aggregation(inputs))`.
    pub response_init: f64,
    pub response_min: f64,
    pub response_max: f64,
    pub response_mutate_rate: f64,
    pub response_replace_rate: f64,
    pub response_mutate_power: f64,

    pub weight_init_mean: f64,
    pub weight_init_range: f64,
    pub weight_min: f64,
    pub weight_max: f64,
    pub weight_mutate_rate: f64,
    pub weight_replace_rate: f64,
    pub weight_mutate_power: f64,

    /// Probability of flipping a connection's enabled flag.
    pub enabled_mutate_rate: f64,

    pub conn_add_prob: f64,
    pub conn_delete_prob: f64,
    pub node_add_prob: f64,
    pub node_delete_prob: f64,

    /// During crossover, probability that a matching gene disabled in either
    /// parent stays disabled in the child.
    pub gene_disable_prob: f64,

    /// Bounded retry budget for structural mutations whose random pick is
    /// illegal (duplicate connection, would-be cycle). Exhausting it skips
    /// the mutation for this genome this generation.
    pub structural_mutation_attempts: usize,

    /// c1: weight of excess genes in genetic distance.
    pub compatibility_excess_coefficient: f64,
    /// c2: weight of disjoint genes in genetic distance.
    pub compatibility_disjoint_coefficient: f64,
    /// c3: weight of the mean matching weight/bias difference.
    pub compatibility_weight_coefficient: f64,
    /// N is clamped to 1 when both genomes have fewer connection genes
    /// than this.
    pub distance_size_floor: usize,
}

impl GenomeConfig {
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self {
        GenomeConfig {
            num_inputs,
            num_outputs,
            feed_forward: true,
            initial_connectivity: InitialConnectivity::Full,
            activation_default: "sigmoid".to_owned(),
            activation_options: vec!["sigmoid".to_owned()],
            activation_mutate_rate: 0.0,
            aggregation_default: "sum".to_owned(),
            aggregation_options: vec!["sum".to_owned()],
            aggregation_mutate_rate: 0.0,
            bias_init_mean: 0.0,
            bias_init_range: 1.0,
            bias_min: -30.0,
            bias_max: 30.0,
            bias_mutate_rate: 0.7,
            bias_replace_rate: 0.1,
            bias_mutate_power: 0.5,
            response_init: 1.0,
            response_min: -30.0,
            response_max: 30.0,
            response_mutate_rate: 0.0,
            response_replace_rate: 0.0,
            response_mutate_power: 0.0,
            weight_init_mean: 0.0,
            weight_init_range: 1.0,
            weight_min: -30.0,
            weight_max: 30.0,
            weight_mutate_rate: 0.8,
            weight_replace_rate: 0.1,
            weight_mutate_power: 0.5,
            enabled_mutate_rate: 0.01,
            conn_add_prob: 0.5,
            conn_delete_prob: 0.3,
            node_add_prob: 0.2,
            node_delete_prob: 0.1,
            gene_disable_prob: 0.75,
            structural_mutation_attempts: 20,
            compatibility_excess_coefficient: 1.0,
            compatibility_disjoint_coefficient: 1.0,
            compatibility_weight_coefficient: 0.5,
            distance_size_floor: 20,
        }
    }

    /// Keys of the reserved input slots, `-1..=-num_inputs`. Input nodes
    /// carry no gene; they are implicitly present in every genome.
    pub fn input_keys(&self) -> Vec<i64> {
        (0..self.num_inputs).map(|i| -(i as i64 + 1)).collect()
    }

    /// Keys of the output nodes, `0..num_outputs`. Always present in the
    /// node map and never deleted.
    pub fn output_keys(&self) -> Vec<i64> {
        (0..self.num_outputs as i64).collect()
    }
}

/// Speciation knobs.
#[derive(Debug, Clone)]
pub struct SpeciationConfig {
    /// Genomes within this genetic distance of a representative join its
    /// species.
    pub compatibility_threshold: f64,
    /// When set, the threshold is stepped after each speciation pass to
    /// steer the species count toward this target.
    pub target_species: Option<usize>,
    pub threshold_adjust_step: f64,
    /// The adaptive threshold never drops below this.
    pub threshold_floor: f64,
}

impl Default for SpeciationConfig {
    fn default() -> Self {
        SpeciationConfig {
            compatibility_threshold: 3.0,
            target_species: None,
            threshold_adjust_step: 0.3,
            threshold_floor: 0.5,
        }
    }
}

/// Stagnation culling knobs.
#[derive(Debug, Clone)]
pub struct StagnationConfig {
    /// Generations without improvement after which a species is culled.
    pub max_stagnation: usize,
    /// The fittest species protected from stagnation culling, at least 1.
    pub species_elitism: usize,
}

impl Default for StagnationConfig {
    fn default() -> Self {
        StagnationConfig { max_stagnation: 15, species_elitism: 1 }
    }
}

/// Offspring allocation knobs.
#[derive(Debug, Clone)]
pub struct ReproductionConfig {
    /// Top genomes copied verbatim into the next generation, per species.
    pub elitism: usize,
    /// Fraction of each species eligible as parents, fittest first.
    pub survival_threshold: f64,
    /// Minimum offspring allocated to a surviving species.
    pub min_species_size: usize,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        ReproductionConfig { elitism: 2, survival_threshold: 0.2, min_species_size: 2 }
    }
}

/// Continuous-time network integration parameters.
#[derive(Debug, Clone)]
pub struct CtrnnConfig {
    /// Membrane time constant applied to every node.
    pub time_constant: f64,
    /// Runge-Kutta step size.
    pub step_size: f64,
    /// Integration sub-steps per `activate` call.
    pub sub_steps: usize,
}

impl Default for CtrnnConfig {
    fn default() -> Self {
        CtrnnConfig { time_constant: 1.0, step_size: 0.05, sub_steps: 10 }
    }
}

/// Izhikevich spiking model parameters. Defaults are the regular-spiking
/// preset (a=0.02, b=0.2, c=-65, d=8).
#[derive(Debug, Clone)]
pub struct IznnConfig {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    /// Internal timestep in milliseconds.
    pub dt: f64,
    /// Internal steps per `activate` call.
    pub sub_steps: usize,
    pub output: SpikeOutput,
}

impl Default for IznnConfig {
    fn default() -> Self {
        IznnConfig {
            a: 0.02,
            b: 0.2,
            c: -65.0,
            d: 8.0,
            dt: 0.25,
            sub_steps: 4,
            output: SpikeOutput::Spike,
        }
    }
}

/// The complete, immutable configuration of a run.
#[derive(Clone)]
pub struct Config {
    pub pop_size: usize,
    /// Run terminates once the best fitness reaches this.
    pub fitness_threshold: Option<f64>,
    /// On complete extinction, restart from a fresh random population
    /// instead of aborting the run.
    pub reset_on_extinction: bool,
    /// Seed of the run's random stream. Identical seed and configuration
    /// reproduce the identical sequence of generations.
    pub seed: u64,
    /// Network variant built by [`crate::phenotype::Phenotype::create`].
    pub phenotype: PhenotypeKind,
    pub genome: GenomeConfig,
    pub speciation: SpeciationConfig,
    pub stagnation: StagnationConfig,
    pub reproduction: ReproductionConfig,
    pub ctrnn: CtrnnConfig,
    pub iznn: IznnConfig,
    pub activations: ActivationRegistry,
    pub aggregations: AggregationRegistry,
}

impl Config {
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self {
        Config {
            pop_size: 150,
            fitness_threshold: None,
            reset_on_extinction: false,
            seed: 0,
            phenotype: PhenotypeKind::FeedForward,
            genome: GenomeConfig::new(num_inputs, num_outputs),
            speciation: SpeciationConfig::default(),
            stagnation: StagnationConfig::default(),
            reproduction: ReproductionConfig::default(),
            ctrnn: CtrnnConfig::default(),
            iznn: IznnConfig::default(),
            activations: ActivationRegistry::default(),
            aggregations: AggregationRegistry::default(),
        }
    }

    /// Validate before a run. Unknown function names and out-of-range
    /// coefficients are fatal here rather than deep inside a generation.
    pub fn validate(&self) -> Result<(), NeatError> {
        if self.pop_size == 0 {
            return Err(NeatError::Config("pop_size must be positive".into()));
        }
        if self.genome.num_outputs == 0 {
            return Err(NeatError::Config("num_outputs must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.reproduction.survival_threshold)
            || self.reproduction.survival_threshold == 0.0
        {
            return Err(NeatError::Config("survival_threshold must be in (0, 1]".into()));
        }
        if self.reproduction.elitism > self.pop_size {
            return Err(NeatError::Config("elitism cannot exceed pop_size".into()));
        }
        if self.speciation.threshold_floor <= 0.0 {
            return Err(NeatError::Config("threshold_floor must be positive".into()));
        }
        if self.stagnation.species_elitism == 0 {
            return Err(NeatError::Config("species_elitism must be at least 1".into()));
        }
        // Every rate below is fed to `Rng::gen_bool`, which panics outside
        // [0, 1], so a bad value must be caught here.
        for (name, rate) in [
            ("activation_mutate_rate", self.genome.activation_mutate_rate),
            ("aggregation_mutate_rate", self.genome.aggregation_mutate_rate),
            ("bias_mutate_rate", self.genome.bias_mutate_rate),
            ("bias_replace_rate", self.genome.bias_replace_rate),
            ("response_mutate_rate", self.genome.response_mutate_rate),
            ("response_replace_rate", self.genome.response_replace_rate),
            ("weight_mutate_rate", self.genome.weight_mutate_rate),
            ("weight_replace_rate", self.genome.weight_replace_rate),
            ("enabled_mutate_rate", self.genome.enabled_mutate_rate),
            ("conn_add_prob", self.genome.conn_add_prob),
            ("conn_delete_prob", self.genome.conn_delete_prob),
            ("node_add_prob", self.genome.node_add_prob),
            ("node_delete_prob", self.genome.node_delete_prob),
            ("gene_disable_prob", self.genome.gene_disable_prob),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(NeatError::Config(format!("{name} must be in [0, 1], got {rate}")));
            }
        }
        for c in [
            self.genome.compatibility_excess_coefficient,
            self.genome.compatibility_disjoint_coefficient,
            self.genome.compatibility_weight_coefficient,
        ] {
            if !c.is_finite() || c < 0.0 {
                return Err(NeatError::Config("distance coefficients must be finite and non-negative".into()));
            }
        }
        for name in std::iter::once(&self.genome.activation_default)
            .chain(self.genome.activation_options.iter())
        {
            if !self.activations.contains(name) {
                return Err(NeatError::Config(format!("unknown activation function: {name}")));
            }
        }
        for name in std::iter::once(&self.genome.aggregation_default)
            .chain(self.genome.aggregation_options.iter())
        {
            if !self.aggregations.contains(name) {
                return Err(NeatError::Config(format!("unknown aggregation function: {name}")));
            }
        }
        Ok(())
    }
}
