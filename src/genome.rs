//! Genome representation: node genes, connection genes, and the genetic
//! operators (mutation, crossover, distance).
//!
//! A connection gene is keyed by its (input, output) node pair; that pair is
//! also its innovation key, so gene alignment between differently shaped
//! genomes during crossover and distance computation falls out of plain map
//! lookups. Node keys: negative keys are the reserved input slots (implicitly
//! present, never stored), `0..num_outputs` are outputs, hidden nodes get
//! fresh keys from the run's [`InnovationTracker`].
//!
//! Both gene maps are ordered, so every iteration below is deterministic for
//! a fixed random seed regardless of gene insertion order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{GenomeConfig, InitialConnectivity};
use crate::graphs;
use crate::innovation::InnovationTracker;

/// Serialize tuple-keyed maps as a sequence of pairs. JSON object keys must
/// be strings, so `BTreeMap<(i64, i64), _>` cannot round-trip as a map.
pub(crate) mod map_as_pairs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<M, K, V, S>(map: &M, serializer: S) -> Result<S::Ok, S::Error>
    where
        for<'a> &'a M: IntoIterator<Item = (&'a K, &'a V)>,
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.into_iter())
    }

    pub fn deserialize<'de, M, K, V, D>(deserializer: D) -> Result<M, D::Error>
    where
        M: FromIterator<(K, V)>,
        K: Deserialize<'de>,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Ok(Vec::<(K, V)>::deserialize(deserializer)?.into_iter().collect())
    }
}

/// Identity and innovation key of a connection gene: (input node, output node).
pub type ConnKey = (i64, i64);

/// A node gene. Output of the node is
/// `activation(bias + response * aggregation(weighted inputs))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub bias: f64,
    pub response: f64,
    /// Name resolved through the activation registry at network construction.
    pub activation: String,
    /// Name resolved through the aggregation registry at network construction.
    pub aggregation: String,
}

/// A connection gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub weight: f64,
    pub enabled: bool,
}

impl ConnectionGene {
    pub fn new(weight: f64) -> ConnectionGene {
        ConnectionGene { weight, enabled: true }
    }

    /// Set gene enabled
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Set gene disabled
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Toggle the enable state
    pub fn toggle_enabled(&mut self) {
        self.enabled = !self.enabled;
    }
}

/// A graph-structured individual: the unit of mutation and crossover.
///
/// Exclusively owned by the population for its lifetime; crossover copies
/// genes, it never aliases them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    key: u64,
    nodes: BTreeMap<i64, NodeGene>,
    #[serde(with = "map_as_pairs")]
    connections: BTreeMap<ConnKey, ConnectionGene>,
    fitness: Option<f64>,
}

fn init_weight(config: &GenomeConfig, rng: &mut impl Rng) -> f64 {
    let w = config.weight_init_mean
        + rng.gen_range(-config.weight_init_range..=config.weight_init_range);
    w.clamp(config.weight_min, config.weight_max)
}

fn init_node(config: &GenomeConfig, rng: &mut impl Rng) -> NodeGene {
    let bias =
        config.bias_init_mean + rng.gen_range(-config.bias_init_range..=config.bias_init_range);
    NodeGene {
        bias: bias.clamp(config.bias_min, config.bias_max),
        response: config.response_init,
        activation: config.activation_default.clone(),
        aggregation: config.aggregation_default.clone(),
    }
}

impl Genome {
    /// A fresh genome with the configured initial connectivity.
    pub fn configure_new(key: u64, config: &GenomeConfig, rng: &mut impl Rng) -> Genome {
        let mut nodes = BTreeMap::new();
        for out in config.output_keys() {
            nodes.insert(out, init_node(config, rng));
        }
        let mut connections = BTreeMap::new();
        if config.initial_connectivity == InitialConnectivity::Full {
            for input in config.input_keys() {
                for output in config.output_keys() {
                    connections
                        .insert((input, output), ConnectionGene::new(init_weight(config, rng)));
                }
            }
        }
        Genome { key, nodes, connections, fitness: None }
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn nodes(&self) -> &BTreeMap<i64, NodeGene> {
        &self.nodes
    }

    pub fn connections(&self) -> &BTreeMap<ConnKey, ConnectionGene> {
        &self.connections
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    /// Assign this generation's fitness. Called once per genome per
    /// generation by the population, after the evaluation barrier.
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    pub(crate) fn clear_fitness(&mut self) {
        self.fitness = None;
    }

    /// (node count, enabled connection count)
    pub fn size(&self) -> (usize, usize) {
        (self.nodes.len(), self.connections.values().filter(|g| g.enabled).count())
    }

    /// Insert a node gene directly. Intended for genome construction outside
    /// the mutation operators (tests, restored checkpoints).
    pub fn insert_node(&mut self, key: i64, gene: NodeGene) {
        self.nodes.insert(key, gene);
    }

    /// Insert a connection gene directly. Endpoints must be valid node keys
    /// or reserved input keys.
    pub fn insert_connection(&mut self, key: ConnKey, gene: ConnectionGene) {
        self.connections.insert(key, gene);
    }

    /// Recombine two fitness-evaluated parents into a child genome.
    ///
    /// The fitter parent dictates the child's structure: genes present in
    /// both parents are inherited from either with equal probability (values
    /// copied verbatim, never averaged), disjoint and excess genes come only
    /// from the fitter parent. A matching connection disabled in either
    /// parent is disabled in the child with probability `gene_disable_prob`.
    /// Fitness ties go to the structurally smaller parent (fewer connection
    /// genes); a full tie goes to the lower genome key.
    pub fn crossover(
        key: u64,
        parent1: &Genome,
        parent2: &Genome,
        config: &GenomeConfig,
        rng: &mut impl Rng,
    ) -> Genome {
        let f1 = parent1.fitness.unwrap_or(f64::NEG_INFINITY);
        let f2 = parent2.fitness.unwrap_or(f64::NEG_INFINITY);
        let (fitter, weaker) = match f1.partial_cmp(&f2).unwrap_or(Ordering::Equal) {
            Ordering::Greater => (parent1, parent2),
            Ordering::Less => (parent2, parent1),
            Ordering::Equal => match parent1.connections.len().cmp(&parent2.connections.len()) {
                Ordering::Less => (parent1, parent2),
                Ordering::Greater => (parent2, parent1),
                Ordering::Equal if parent1.key <= parent2.key => (parent1, parent2),
                Ordering::Equal => (parent2, parent1),
            },
        };

        let mut nodes = BTreeMap::new();
        for (node_key, gene1) in &fitter.nodes {
            let gene = match weaker.nodes.get(node_key) {
                Some(gene2) if rng.gen_bool(0.5) => gene2.clone(),
                _ => gene1.clone(),
            };
            nodes.insert(*node_key, gene);
        }

        let mut connections = BTreeMap::new();
        for (conn_key, gene1) in &fitter.connections {
            let gene = match weaker.connections.get(conn_key) {
                Some(gene2) => {
                    let mut gene = if rng.gen_bool(0.5) { gene2.clone() } else { gene1.clone() };
                    if !gene1.enabled || !gene2.enabled {
                        gene.enabled = !rng.gen_bool(config.gene_disable_prob);
                    }
                    gene
                }
                // Disjoint or excess: inherited from the fitter parent only.
                None => gene1.clone(),
            };
            connections.insert(*conn_key, gene);
        }

        Genome { key, nodes, connections, fitness: None }
    }

    /// Apply each mutation operator independently with its configured
    /// probability.
    pub fn mutate(
        &mut self,
        config: &GenomeConfig,
        innovations: &mut InnovationTracker,
        rng: &mut impl Rng,
    ) {
        if rng.gen_bool(config.node_add_prob) {
            let _ = self.mutate_add_node(config, innovations, rng);
        }
        if rng.gen_bool(config.node_delete_prob) {
            let _ = self.mutate_delete_node(config, rng);
        }
        if rng.gen_bool(config.conn_add_prob) {
            let _ = self.mutate_add_connection(config, rng);
        }
        if rng.gen_bool(config.conn_delete_prob) {
            let _ = self.mutate_delete_connection(rng);
        }

        for gene in self.connections.values_mut() {
            let r: f64 = rng.gen();
            if r < config.weight_mutate_rate {
                gene.weight = (gene.weight
                    + rng.gen_range(-config.weight_mutate_power..=config.weight_mutate_power))
                .clamp(config.weight_min, config.weight_max);
            } else if r < config.weight_mutate_rate + config.weight_replace_rate {
                gene.weight = init_weight(config, rng);
            }
            if config.enabled_mutate_rate > 0.0 && rng.gen_bool(config.enabled_mutate_rate) {
                gene.toggle_enabled();
            }
        }

        for gene in self.nodes.values_mut() {
            let r: f64 = rng.gen();
            if r < config.bias_mutate_rate {
                gene.bias = (gene.bias
                    + rng.gen_range(-config.bias_mutate_power..=config.bias_mutate_power))
                .clamp(config.bias_min, config.bias_max);
            } else if r < config.bias_mutate_rate + config.bias_replace_rate {
                gene.bias = (config.bias_init_mean
                    + rng.gen_range(-config.bias_init_range..=config.bias_init_range))
                .clamp(config.bias_min, config.bias_max);
            }
            let r: f64 = rng.gen();
            if r < config.response_mutate_rate {
                gene.response = (gene.response
                    + rng.gen_range(-config.response_mutate_power..=config.response_mutate_power))
                .clamp(config.response_min, config.response_max);
            } else if r < config.response_mutate_rate + config.response_replace_rate {
                gene.response = config.response_init;
            }
            if config.activation_mutate_rate > 0.0 && rng.gen_bool(config.activation_mutate_rate) {
                if let Some(name) = config.activation_options.choose(rng) {
                    gene.activation = name.clone();
                }
            }
            if config.aggregation_mutate_rate > 0.0 && rng.gen_bool(config.aggregation_mutate_rate)
            {
                if let Some(name) = config.aggregation_options.choose(rng) {
                    gene.aggregation = name.clone();
                }
            }
        }
    }

    /// Split a randomly chosen enabled connection through a new node.
    ///
    /// The original connection is disabled; the incoming replacement gets
    /// weight 1 and the outgoing one the old weight, so network behavior is
    /// near-invariant immediately after the split. The new node key comes
    /// from the innovation tracker, so the same split elsewhere in this
    /// generation aligns in crossover. Returns the new node key, or `None`
    /// when the genome has no enabled connection to split.
    pub fn mutate_add_node(
        &mut self,
        config: &GenomeConfig,
        innovations: &mut InnovationTracker,
        rng: &mut impl Rng,
    ) -> Option<i64> {
        let enabled: Vec<ConnKey> =
            self.connections.iter().filter(|(_, g)| g.enabled).map(|(k, _)| *k).collect();
        let &(source, target) = enabled.choose(rng)?;

        let mut node_key = innovations.node_for_split((source, target));
        if self.nodes.contains_key(&node_key) {
            // This genome already split this connection once this generation.
            node_key = innovations.fresh_node_key();
        }

        let old_weight = self.connections[&(source, target)].weight;
        if let Some(gene) = self.connections.get_mut(&(source, target)) {
            gene.disable();
        }

        self.nodes.insert(
            node_key,
            NodeGene {
                bias: 0.0,
                response: config.response_init,
                activation: config.activation_default.clone(),
                aggregation: config.aggregation_default.clone(),
            },
        );
        self.connections.insert((source, node_key), ConnectionGene::new(1.0));
        self.connections.insert((node_key, target), ConnectionGene::new(old_weight));
        Some(node_key)
    }

    /// Connect two previously unconnected nodes with a random weight.
    ///
    /// Candidate pairs that already exist or (in feed-forward mode) would
    /// close a cycle are rejected and re-drawn, up to the configured attempt
    /// budget; exhausting it skips the mutation. Returns the new key on
    /// success.
    pub fn mutate_add_connection(
        &mut self,
        config: &GenomeConfig,
        rng: &mut impl Rng,
    ) -> Option<ConnKey> {
        let sources: Vec<i64> =
            config.input_keys().into_iter().chain(self.nodes.keys().copied()).collect();
        let targets: Vec<i64> = self.nodes.keys().copied().collect();

        for _ in 0..config.structural_mutation_attempts {
            let &source = sources.choose(rng)?;
            let &target = targets.choose(rng)?;
            let key = (source, target);
            if self.connections.contains_key(&key) {
                continue;
            }
            if config.feed_forward && graphs::creates_cycle(self.connections.keys().copied(), key)
            {
                continue;
            }
            self.connections.insert(key, ConnectionGene::new(init_weight(config, rng)));
            return Some(key);
        }
        None
    }

    /// Remove a random hidden node and every connection referencing it.
    /// Input and output nodes are never deleted. Returns the removed key.
    pub fn mutate_delete_node(&mut self, config: &GenomeConfig, rng: &mut impl Rng) -> Option<i64> {
        let hidden: Vec<i64> =
            self.nodes.keys().copied().filter(|&k| k >= config.num_outputs as i64).collect();
        let &node_key = hidden.choose(rng)?;
        self.nodes.remove(&node_key);
        self.connections.retain(|&(source, target), _| source != node_key && target != node_key);
        Some(node_key)
    }

    /// Remove a random connection gene.
    pub fn mutate_delete_connection(&mut self, rng: &mut impl Rng) -> Option<ConnKey> {
        let keys: Vec<ConnKey> = self.connections.keys().copied().collect();
        let &key = keys.choose(rng)?;
        self.connections.remove(&key);
        Some(key)
    }

    /// Genetic distance δ = c1·E/N + c2·D/N + c3·W̄.
    ///
    /// > Genes that do not match are either disjoint or excess, depending on
    /// > whether they occur within or outside the range of the other parent's
    /// > innovation numbers.
    /// [Pag. 110, NEAT](http://nn.cs.utexas.edu/downloads/papers/stanley.ec02.pdf)
    ///
    /// E and D are counted over connection innovation keys; W̄ is the mean
    /// absolute difference over matching connection weights and matching node
    /// biases. N is the larger connection-gene count, clamped to 1 when both
    /// genomes are below the configured size floor. Symmetric by
    /// construction; the sole metric used for speciation.
    pub fn distance(&self, other: &Genome, config: &GenomeConfig) -> f64 {
        let max_self = self.connections.keys().next_back().copied();
        let max_other = other.connections.keys().next_back().copied();

        let mut excess = 0usize;
        let mut disjoint = 0usize;
        let mut diff_sum = 0.0;
        let mut matching = 0usize;

        for (key, gene1) in &self.connections {
            match other.connections.get(key) {
                Some(gene2) => {
                    diff_sum += (gene1.weight - gene2.weight).abs();
                    matching += 1;
                }
                None if Some(*key) > max_other => excess += 1,
                None => disjoint += 1,
            }
        }
        for key in other.connections.keys() {
            if !self.connections.contains_key(key) {
                if Some(*key) > max_self {
                    excess += 1;
                } else {
                    disjoint += 1;
                }
            }
        }
        for (key, node1) in &self.nodes {
            if let Some(node2) = other.nodes.get(key) {
                diff_sum += (node1.bias - node2.bias).abs();
                matching += 1;
            }
        }

        let larger = self.connections.len().max(other.connections.len());
        let n = if self.connections.len() < config.distance_size_floor
            && other.connections.len() < config.distance_size_floor
        {
            1
        } else {
            larger.max(1)
        };

        let mean_diff = if matching > 0 { diff_sum / matching as f64 } else { 0.0 };
        (config.compatibility_excess_coefficient * excess as f64
            + config.compatibility_disjoint_coefficient * disjoint as f64)
            / n as f64
            + config.compatibility_weight_coefficient * mean_diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn config() -> GenomeConfig {
        GenomeConfig::new(2, 1)
    }

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn new_genome_is_fully_connected() {
        let config = GenomeConfig::new(2, 3);
        let genome = Genome::configure_new(0, &config, &mut rng(0));
        assert_eq!(genome.connections().len(), 6);
        assert_eq!(genome.nodes().len(), 3);
        for input in config.input_keys() {
            for output in config.output_keys() {
                assert!(genome.connections().contains_key(&(input, output)));
            }
        }
    }

    #[test]
    fn unconnected_initial_genome_has_output_nodes_only() {
        let mut config = config();
        config.initial_connectivity = InitialConnectivity::None;
        let genome = Genome::configure_new(0, &config, &mut rng(0));
        assert!(genome.connections().is_empty());
        assert_eq!(genome.nodes().len(), 1);
    }

    #[test]
    fn distance_to_self_is_zero_and_symmetric() {
        let config = config();
        let mut r = rng(1);
        let mut g1 = Genome::configure_new(0, &config, &mut r);
        let mut g2 = Genome::configure_new(1, &config, &mut r);
        let mut innovations = InnovationTracker::new(config.num_outputs);
        for _ in 0..5 {
            g1.mutate(&config, &mut innovations, &mut r);
            g2.mutate(&config, &mut innovations, &mut r);
        }
        assert_abs_diff_eq!(g1.distance(&g1, &config), 0.0);
        assert_abs_diff_eq!(g1.distance(&g2, &config), g2.distance(&g1, &config));
    }

    #[test]
    fn distance_counts_missing_genes() {
        let config = config();
        let mut r = rng(2);
        let g1 = Genome::configure_new(0, &config, &mut r);
        let mut g2 = g1.clone();
        g2.insert_node(1, init_node(&config, &mut r));
        g2.insert_connection((1, 0), ConnectionGene::new(0.0));
        // (1, 0) is beyond g1's largest key, so it counts as excess.
        let d = g1.distance(&g2, &config);
        assert!(d >= config.compatibility_excess_coefficient);
    }

    #[test]
    fn add_node_splits_an_enabled_connection() {
        let mut config = config();
        config.num_inputs = 1;
        let mut r = rng(3);
        let mut genome = Genome::configure_new(0, &config, &mut r);
        let old_weight = genome.connections()[&(-1, 0)].weight;
        let mut innovations = InnovationTracker::new(config.num_outputs);
        let node_key = genome.mutate_add_node(&config, &mut innovations, &mut r).unwrap();

        assert!(!genome.connections()[&(-1, 0)].enabled);
        assert_abs_diff_eq!(genome.connections()[&(-1, node_key)].weight, 1.0);
        assert_abs_diff_eq!(genome.connections()[&(node_key, 0)].weight, old_weight);
        assert!(genome.connections()[&(-1, node_key)].enabled);
        assert!(genome.connections()[&(node_key, 0)].enabled);
    }

    #[test]
    fn parallel_splits_share_the_innovation_key() {
        let mut config = config();
        config.num_inputs = 1;
        let mut r = rng(4);
        let mut innovations = InnovationTracker::new(config.num_outputs);
        // Two genomes with the single connection (-1, 0); splitting it in the
        // same generation must produce the same node key in both.
        let mut g1 = Genome::configure_new(0, &config, &mut r);
        let mut g2 = Genome::configure_new(1, &config, &mut r);
        let k1 = g1.mutate_add_node(&config, &mut innovations, &mut r).unwrap();
        let k2 = g2.mutate_add_node(&config, &mut innovations, &mut r).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn add_connection_never_duplicates_an_existing_key() {
        let config = config();
        let mut r = rng(5);
        let mut genome = Genome::configure_new(0, &config, &mut r);
        let before: Vec<ConnKey> = genome.connections().keys().copied().collect();
        if let Some(key) = genome.mutate_add_connection(&config, &mut r) {
            assert!(!before.contains(&key));
        }
    }

    #[test]
    fn feed_forward_mode_never_creates_cycles() {
        let mut config = config();
        config.conn_add_prob = 1.0;
        config.node_add_prob = 1.0;
        config.conn_delete_prob = 0.0;
        config.node_delete_prob = 0.0;
        let mut r = rng(6);
        let mut innovations = InnovationTracker::new(config.num_outputs);
        let mut genome = Genome::configure_new(0, &config, &mut r);
        for _ in 0..30 {
            genome.mutate(&config, &mut innovations, &mut r);
        }
        assert!(!graphs::has_cycle(genome.connections().keys().copied()));
    }

    #[test]
    fn recurrent_mode_allows_self_loops() {
        let mut config = config();
        config.feed_forward = false;
        config.structural_mutation_attempts = 500;
        let mut r = rng(13);
        let mut genome = Genome::configure_new(0, &config, &mut r);
        let mut found_loop = false;
        for _ in 0..50 {
            if let Some((source, target)) = genome.mutate_add_connection(&config, &mut r) {
                if source == target {
                    found_loop = true;
                }
            }
        }
        // With a single possible self-loop pair (0, 0) and 50 rounds of
        // attempts, the loop shows up with near certainty.
        assert!(found_loop || genome.connections().contains_key(&(0, 0)));
    }

    #[test]
    fn delete_node_drops_referencing_connections() {
        let config = config();
        let mut r = rng(7);
        let mut genome = Genome::configure_new(0, &config, &mut r);
        let mut innovations = InnovationTracker::new(config.num_outputs);
        let node_key = genome.mutate_add_node(&config, &mut innovations, &mut r).unwrap();
        let removed = genome.mutate_delete_node(&config, &mut r).unwrap();
        assert_eq!(removed, node_key);
        assert!(genome
            .connections()
            .keys()
            .all(|&(source, target)| source != node_key && target != node_key));
    }

    #[test]
    fn output_nodes_are_never_deleted() {
        let config = config();
        let mut r = rng(8);
        let mut genome = Genome::configure_new(0, &config, &mut r);
        assert!(genome.mutate_delete_node(&config, &mut r).is_none());
        assert!(genome.nodes().contains_key(&0));
    }

    #[test]
    fn crossover_child_genes_come_from_the_fitter_parent_or_both() {
        let config = config();
        let mut r = rng(9);
        let mut innovations = InnovationTracker::new(config.num_outputs);
        let mut p1 = Genome::configure_new(0, &config, &mut r);
        let mut p2 = Genome::configure_new(1, &config, &mut r);
        for _ in 0..5 {
            p1.mutate(&config, &mut innovations, &mut r);
            p2.mutate(&config, &mut innovations, &mut r);
        }
        p1.set_fitness(2.0);
        p2.set_fitness(1.0);
        let child = Genome::crossover(2, &p1, &p2, &config, &mut r);

        // Child structure is the fitter parent's key set: a subset of the
        // union, with disjoint/excess genes solely from the fitter parent.
        assert!(child.connections().keys().all(|k| p1.connections().contains_key(k)));
        assert!(child.nodes().keys().all(|k| p1.nodes().contains_key(k)));
    }

    #[test]
    fn crossover_is_deterministic_for_a_fixed_seed() {
        let config = config();
        let mut r = rng(10);
        let mut innovations = InnovationTracker::new(config.num_outputs);
        let mut p1 = Genome::configure_new(0, &config, &mut r);
        let mut p2 = Genome::configure_new(1, &config, &mut r);
        p1.mutate(&config, &mut innovations, &mut r);
        p2.mutate(&config, &mut innovations, &mut r);
        p1.set_fitness(1.0);
        p2.set_fitness(1.0);

        let c1 = Genome::crossover(2, &p1, &p2, &config, &mut rng(42));
        let c2 = Genome::crossover(2, &p1, &p2, &config, &mut rng(42));
        assert_eq!(c1, c2);
    }

    #[test]
    fn equal_fitness_tie_prefers_the_smaller_parent() {
        let mut config = config();
        config.initial_connectivity = InitialConnectivity::None;
        let mut r = rng(11);
        let mut small = Genome::configure_new(0, &config, &mut r);
        let mut large = Genome::configure_new(1, &config, &mut r);
        small.insert_connection((-1, 0), ConnectionGene::new(0.5));
        large.insert_connection((-1, 0), ConnectionGene::new(0.5));
        large.insert_connection((-2, 0), ConnectionGene::new(0.5));
        small.set_fitness(1.0);
        large.set_fitness(1.0);
        let child = Genome::crossover(2, &large, &small, &config, &mut r);
        // The structurally smaller parent wins the tie, so the gene unique
        // to the larger parent is never inherited.
        assert!(!child.connections().contains_key(&(-2, 0)));
    }

    #[test]
    fn genome_serializes_and_restores() {
        let config = config();
        let mut r = rng(12);
        let mut innovations = InnovationTracker::new(config.num_outputs);
        let mut genome = Genome::configure_new(7, &config, &mut r);
        for _ in 0..5 {
            genome.mutate(&config, &mut innovations, &mut r);
        }
        genome.set_fitness(1.25);
        let json = serde_json::to_string(&genome).unwrap();
        let restored: Genome = serde_json::from_str(&json).unwrap();
        assert_eq!(genome, restored);
    }
}
