//! Recurrent phenotype.
//!
//! Supports arbitrary cycles, including self-loops. Every node reads the
//! *previous* tick's outputs of its predecessors and all nodes are updated
//! in one synchronous sweep into a separate buffer, so activation is
//! order-independent and deterministic regardless of gene insertion order.
//! The carried buffer is what gives the network memory across calls.

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
    links: Vec<(i64, f64)>,
}

pub struct RecurrentNetwork {
    input_keys: Vec<i64>,
    output_keys: Vec<i64>,
    evals: Vec<NodeEval>,
    /// Double-buffered node outputs; `active` indexes the buffer holding
    /// the previous tick's values.
    values: [HashMap<i64, f64>; 2],
    active: usize,
}

impl RecurrentNetwork {
    /// Compile the genome. Cycles never fail construction here; only
    /// unknown function names and missing output node genes do.
    pub fn create(genome: &Genome, config: &Config) -> Result<RecurrentNetwork, NeatError> {
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

        let mut evals = Vec::new();
        for (&key, node) in genome.nodes() {
            if !required.contains(&key) {
                continue;
            }
            let links = edges
                .iter()
                .filter(|&&(source, target)| {
                    target == key && (required.contains(&source) || input_keys.contains(&source))
                })
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

        let mut net = RecurrentNetwork {
            input_keys,
            output_keys,
            evals,
            values: [HashMap::new(), HashMap::new()],
            active: 0,
        };
        net.reset();
        Ok(net)
    }

    /// Clear all carried state to zero.
    pub fn reset(&mut self) {
        for buffer in &mut self.values {
            buffer.clear();
            for eval in &self.evals {
                buffer.insert(eval.key, 0.0);
            }
            for &key in &self.input_keys {
                buffer.insert(key, 0.0);
            }
        }
        self.active = 0;
    }

    /// Advance one tick: every node output is computed from the previous
    /// tick's predecessor outputs.
    pub fn activate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NeatError> {
        if inputs.len() != self.input_keys.len() {
            return Err(NeatError::Config(format!(
                "expected {} inputs, got {}",
                self.input_keys.len(),
                inputs.len()
            )));
        }

        for (i, &key) in self.input_keys.iter().enumerate() {
            self.values[0].insert(key, inputs[i]);
            self.values[1].insert(key, inputs[i]);
        }

        let previous = self.active;
        let current = 1 - self.active;
        for eval in &self.evals {
            let weighted: Vec<f64> = eval
                .links
                .iter()
                .map(|(source, weight)| {
                    self.values[previous].get(source).copied().unwrap_or(0.0) * weight
                })
                .collect();
            let aggregated = (eval.aggregation)(&weighted);
            let output = (eval.activation)(eval.bias + eval.response * aggregated);
            self.values[current].insert(eval.key, output);
        }
        self.active = current;

        Ok(self
            .output_keys
            .iter()
            .map(|key| self.values[current].get(key).copied().unwrap_or(0.0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitialConnectivity;
    use crate::genome::{ConnectionGene, NodeGene};
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn identity_config(num_inputs: usize) -> Config {
        let mut config = Config::new(num_inputs, 1);
        config.genome.feed_forward = false;
        config.genome.activation_default = "identity".to_owned();
        config.genome.activation_options = vec!["identity".to_owned()];
        config.genome.bias_init_range = 0.0;
        config.genome.initial_connectivity = InitialConnectivity::None;
        config
    }

    fn node(bias: f64) -> NodeGene {
        NodeGene {
            bias,
            response: 1.0,
            activation: "identity".to_owned(),
            aggregation: "sum".to_owned(),
        }
    }

    fn genome_with_self_loop(config: &Config) -> Genome {
        let mut genome =
            Genome::configure_new(0, &config.genome, &mut ChaCha8Rng::seed_from_u64(0));
        genome.insert_node(0, node(0.0));
        genome.insert_connection((-1, 0), ConnectionGene::new(1.0));
        genome.insert_connection((0, 0), ConnectionGene::new(1.0));
        genome
    }

    #[test]
    fn construction_accepts_cycles() {
        let config = identity_config(1);
        let genome = genome_with_self_loop(&config);
        assert!(RecurrentNetwork::create(&genome, &config).is_ok());
    }

    #[test]
    fn zero_state_zero_input_gives_zero_output() {
        let config = identity_config(1);
        let genome = genome_with_self_loop(&config);
        let mut net = RecurrentNetwork::create(&genome, &config).unwrap();
        let output = net.activate(&[0.0]).unwrap();
        assert_abs_diff_eq!(output[0], 0.0);
    }

    #[test]
    fn self_loop_accumulates_across_ticks() {
        let config = identity_config(1);
        let genome = genome_with_self_loop(&config);
        let mut net = RecurrentNetwork::create(&genome, &config).unwrap();
        // y(t) = x(t) + y(t-1) with identity activation and unit weights.
        assert_abs_diff_eq!(net.activate(&[1.0]).unwrap()[0], 1.0);
        assert_abs_diff_eq!(net.activate(&[1.0]).unwrap()[0], 2.0);
        assert_abs_diff_eq!(net.activate(&[1.0]).unwrap()[0], 3.0);
    }

    #[test]
    fn reset_clears_carried_state() {
        let config = identity_config(1);
        let genome = genome_with_self_loop(&config);
        let mut net = RecurrentNetwork::create(&genome, &config).unwrap();
        net.activate(&[1.0]).unwrap();
        net.activate(&[1.0]).unwrap();
        net.reset();
        assert_abs_diff_eq!(net.activate(&[0.0]).unwrap()[0], 0.0);
    }

    #[test]
    fn sweep_uses_previous_tick_values_only() {
        // -1 -> 1 -> 0: a two-step pipeline. With a synchronous sweep the
        // input needs two ticks to reach the output, regardless of the
        // order the nodes happen to be stored in.
        let config = identity_config(1);
        let mut genome =
            Genome::configure_new(0, &config.genome, &mut ChaCha8Rng::seed_from_u64(0));
        genome.insert_node(0, node(0.0));
        genome.insert_node(1, node(0.0));
        genome.insert_connection((-1, 1), ConnectionGene::new(1.0));
        genome.insert_connection((1, 0), ConnectionGene::new(1.0));

        let mut net = RecurrentNetwork::create(&genome, &config).unwrap();
        assert_abs_diff_eq!(net.activate(&[1.0]).unwrap()[0], 0.0);
        assert_abs_diff_eq!(net.activate(&[0.0]).unwrap()[0], 1.0);
    }
}
