//! Feed-forward phenotype.
//!
//! Compiles a genome whose enabled connection subgraph is acyclic into a
//! topologically ordered evaluation plan. Construction fails on a cycle;
//! it never attempts to evaluate one. `activate` is a single forward pass
//! with no retained state.

use std::collections::HashMap;

use crate::activations::ActivationFn;
use crate::aggregations::AggregationFn;
use crate::config::Config;
use crate::errors::NeatError;
use crate::genome::Genome;
use crate::graphs;

struct NodeEval {
    key: i64,
    activation: ActivationFn,
    aggregation: AggregationFn,
    bias: f64,
    response: f64,
    /// Incoming enabled connections: (source node key, weight).
    links: Vec<(i64, f64)>,
}

pub struct FeedForwardNetwork {
    input_keys: Vec<i64>,
    output_keys: Vec<i64>,
    evals: Vec<NodeEval>,
    values: HashMap<i64, f64>,
}

impl FeedForwardNetwork {
    /// Compile the genome. Fails with [`NeatError::CycleRejected`] when the
    /// enabled connection subgraph contains a cycle, and with a
    /// configuration error for unknown function names or missing output
    /// node genes.
    pub fn create(genome: &Genome, config: &Config) -> Result<FeedForwardNetwork, NeatError> {
        let input_keys = config.genome.input_keys();
        let output_keys = config.genome.output_keys();
        for key in &output_keys {
            if !genome.nodes().contains_key(key) {
                return Err(NeatError::Config(format!("genome lacks output node {key}")));
            }
        }

        let edges: Vec<_> =
            genome.connections().iter().filter(|(_, g)| g.enabled).map(|(k, _)| *k).collect();
        let required = graphs::required_for_output(&input_keys, &output_keys, &edges);
        let used: Vec<_> = edges
            .iter()
            .copied()
            .filter(|&(source, target)| {
                required.contains(&target)
                    && (required.contains(&source) || input_keys.contains(&source))
            })
            .collect();

        let mut order = graphs::topological_order(&input_keys, &used)?;
        // Required nodes without any used connection (e.g. an isolated
        // output) still evaluate to activation(bias).
        for &key in &required {
            if !order.contains(&key) {
                order.push(key);
            }
        }

        let mut evals = Vec::with_capacity(order.len());
        for key in order {
            let node = genome
                .nodes()
                .get(&key)
                .ok_or_else(|| NeatError::Config(format!("connection references missing node {key}")))?;
            let links = used
                .iter()
                .filter(|&&(_, target)| target == key)
                .map(|&(source, _)| (source, genome.connections()[&(source, key)].weight))
                .collect();
            evals.push(NodeEval {
                key,
                activation: config.activations.get(&node.activation)?,
                aggregation: config.aggregations.get(&node.aggregation)?,
                bias: node.bias,
                response: node.response,
                links,
            });
        }

        Ok(FeedForwardNetwork { input_keys, output_keys, evals, values: HashMap::new() })
    }

    /// One full forward pass.
    pub fn activate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NeatError> {
        if inputs.len() != self.input_keys.len() {
            return Err(NeatError::Config(format!(
                "expected {} inputs, got {}",
                self.input_keys.len(),
                inputs.len()
            )));
        }
        self.values.clear();
        for (key, value) in self.input_keys.iter().zip(inputs) {
            self.values.insert(*key, *value);
        }
        for eval in &self.evals {
            let weighted: Vec<f64> = eval
                .links
                .iter()
                .map(|(source, weight)| self.values.get(source).copied().unwrap_or(0.0) * weight)
                .collect();
            let aggregated = (eval.aggregation)(&weighted);
            let output = (eval.activation)(eval.bias + eval.response * aggregated);
            self.values.insert(eval.key, output);
        }
        Ok(self
            .output_keys
            .iter()
            .map(|key| self.values.get(key).copied().unwrap_or(0.0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitialConnectivity;
    use crate::genome::{ConnectionGene, NodeGene};
    use crate::innovation::InnovationTracker;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn identity_config(num_inputs: usize) -> Config {
        let mut config = Config::new(num_inputs, 1);
        config.genome.activation_default = "identity".to_owned();
        config.genome.activation_options = vec!["identity".to_owned()];
        config.genome.bias_init_range = 0.0;
        config
    }

    fn node(bias: f64, activation: &str) -> NodeGene {
        NodeGene {
            bias,
            response: 1.0,
            activation: activation.to_owned(),
            aggregation: "sum".to_owned(),
        }
    }

    #[test]
    fn propagates_weighted_inputs() {
        let config = identity_config(2);
        let mut genome = Genome::configure_new(0, &config.genome, &mut ChaCha8Rng::seed_from_u64(0));
        genome.insert_node(0, node(0.25, "identity"));
        genome.insert_connection((-1, 0), ConnectionGene::new(2.0));
        genome.insert_connection((-2, 0), ConnectionGene::new(-1.0));

        let mut net = FeedForwardNetwork::create(&genome, &config).unwrap();
        let output = net.activate(&[1.0, 0.5]).unwrap();
        assert_abs_diff_eq!(output[0], 0.25 + 2.0 - 0.5);
    }

    #[test]
    fn sigmoid_output_at_zero_input_is_half() {
        let mut config = Config::new(2, 1);
        config.genome.bias_init_range = 0.0;
        let genome = Genome::configure_new(0, &config.genome, &mut ChaCha8Rng::seed_from_u64(0));
        let mut net = FeedForwardNetwork::create(&genome, &config).unwrap();
        let output = net.activate(&[0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(output[0], 0.5);
    }

    #[test]
    fn construction_rejects_cycles() {
        let mut config = identity_config(1);
        config.genome.feed_forward = false;
        let mut genome = Genome::configure_new(0, &config.genome, &mut ChaCha8Rng::seed_from_u64(0));
        genome.insert_node(1, node(0.0, "identity"));
        genome.insert_node(2, node(0.0, "identity"));
        genome.insert_connection((1, 2), ConnectionGene::new(1.0));
        genome.insert_connection((2, 1), ConnectionGene::new(1.0));
        genome.insert_connection((2, 0), ConnectionGene::new(1.0));
        genome.insert_connection((-1, 1), ConnectionGene::new(1.0));

        assert!(matches!(
            FeedForwardNetwork::create(&genome, &config),
            Err(NeatError::CycleRejected)
        ));
    }

    #[test]
    fn disabled_cycle_does_not_reject_construction() {
        let mut config = identity_config(1);
        config.genome.feed_forward = false;
        let mut genome = Genome::configure_new(0, &config.genome, &mut ChaCha8Rng::seed_from_u64(0));
        let mut back = ConnectionGene::new(1.0);
        back.disable();
        genome.insert_connection((0, 0), back);
        assert!(FeedForwardNetwork::create(&genome, &config).is_ok());
    }

    #[test]
    fn unknown_activation_fails_construction() {
        let config = identity_config(1);
        let mut genome = Genome::configure_new(0, &config.genome, &mut ChaCha8Rng::seed_from_u64(0));
        genome.insert_node(0, node(0.0, "warp"));
        assert!(matches!(FeedForwardNetwork::create(&genome, &config), Err(NeatError::Config(_))));
    }

    #[test]
    fn input_arity_mismatch_fails_activation() {
        let config = identity_config(2);
        let genome = Genome::configure_new(0, &config.genome, &mut ChaCha8Rng::seed_from_u64(0));
        let mut net = FeedForwardNetwork::create(&genome, &config).unwrap();
        assert!(net.activate(&[1.0]).is_err());
    }

    #[test]
    fn unconnected_output_evaluates_its_bias() {
        let mut config = identity_config(1);
        config.genome.initial_connectivity = InitialConnectivity::None;
        let mut genome = Genome::configure_new(0, &config.genome, &mut ChaCha8Rng::seed_from_u64(0));
        genome.insert_node(0, node(0.75, "identity"));
        let mut net = FeedForwardNetwork::create(&genome, &config).unwrap();
        assert_abs_diff_eq!(net.activate(&[1.0]).unwrap()[0], 0.75);
    }

    #[test]
    fn add_node_mutation_preserves_behavior() {
        let config = identity_config(1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut genome = Genome::configure_new(0, &config.genome, &mut rng);
        genome.insert_node(0, node(0.0, "identity"));

        let mut before = FeedForwardNetwork::create(&genome, &config).unwrap();
        let expected = before.activate(&[0.8]).unwrap();

        let mut innovations = InnovationTracker::new(1);
        genome.mutate_add_node(&config.genome, &mut innovations, &mut rng).unwrap();

        let mut after = FeedForwardNetwork::create(&genome, &config).unwrap();
        let actual = after.activate(&[0.8]).unwrap();
        assert_abs_diff_eq!(expected[0], actual[0], epsilon = 1e-9);
    }
}
