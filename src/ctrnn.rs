//! Continuous-time recurrent neural network (CTRNN) phenotype.
//!
//! One state variable per node, integrated with classic 4th-order
//! Runge-Kutta at a fixed step size:
//!
//!   τᵢ·dyᵢ/dt = −yᵢ + σ(θᵢ + rᵢ·agg(wⱼᵢ·vⱼ))
//!
//! where vⱼ is the external input value for input keys and the state of
//! node j otherwise. Each `activate` call advances the system by
//! `sub_steps` integration steps; state persists across calls and is
//! cleared by `reset`.

use std::collections::HashMap;

use ndarray::Array1;

use crate::activations::ActivationFn;
use crate::aggregations::AggregationFn;
use crate::config::Config;
use crate::errors::NeatError;
use crate::genome::Genome;
use crate::graphs;

enum Link {
    /// Index into the external input slice.
    Input(usize),
    /// Index into the state vector.
    Node(usize),
}

struct NodeEval {
    activation: ActivationFn,
    aggregation: AggregationFn,
    bias: f64,
    response: f64,
    links: Vec<(Link, f64)>,
}

pub struct Ctrnn {
    input_keys: Vec<i64>,
    /// State-vector indices of the output nodes.
    output_indices: Vec<usize>,
    evals: Vec<NodeEval>,
    /// τ - time constant per node. The neuron's speed of response.
    tau: Array1<f64>,
    /// Current state of each node.
    y: Array1<f64>,
    step_size: f64,
    sub_steps: usize,
}

impl Ctrnn {
    pub fn create(genome: &Genome, config: &Config) -> Result<Ctrnn, NeatError> {
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

        let keys: Vec<i64> =
            genome.nodes().keys().copied().filter(|k| required.contains(k)).collect();
        let index: HashMap<i64, usize> = keys.iter().enumerate().map(|(i, &k)| (k, i)).collect();

        let mut evals = Vec::with_capacity(keys.len());
        for &key in &keys {
            let node = &genome.nodes()[&key];
            let links = edges
                .iter()
                .filter(|&&(_, target)| target == key)
                .filter_map(|&(source, _)| {
                    let weight = genome.connections()[&(source, key)].weight;
                    if let Some(pos) = input_keys.iter().position(|&k| k == source) {
                        Some((Link::Input(pos), weight))
                    } else {
                        index.get(&source).map(|&i| (Link::Node(i), weight))
                    }
                })
                .collect();
            evals.push(NodeEval {
                activation: config.activations.get(&node.activation)?,
                aggregation: config.aggregations.get(&node.aggregation)?,
                bias: node.bias,
                response: node.response,
                links,
            });
        }

        Ok(Ctrnn {
            input_keys,
            output_indices: output_keys.iter().map(|k| index[k]).collect(),
            tau: Array1::from_elem(keys.len(), config.ctrnn.time_constant),
            y: Array1::zeros(keys.len()),
            evals,
            step_size: config.ctrnn.step_size,
            sub_steps: config.ctrnn.sub_steps,
        })
    }

    /// Clear the state to zero.
    pub fn reset(&mut self) {
        self.y.fill(0.0);
    }

    fn derivative(&self, y: &Array1<f64>, inputs: &[f64]) -> Array1<f64> {
        let mut dy = Array1::zeros(y.len());
        for (i, eval) in self.evals.iter().enumerate() {
            let weighted: Vec<f64> = eval
                .links
                .iter()
                .map(|(link, weight)| {
                    let value = match link {
                        Link::Input(j) => inputs[*j],
                        Link::Node(j) => y[*j],
                    };
                    value * weight
                })
                .collect();
            let aggregated = (eval.aggregation)(&weighted);
            let target = (eval.activation)(eval.bias + eval.response * aggregated);
            dy[i] = (target - y[i]) / self.tau[i];
        }
        dy
    }

    /// Advance the system by `sub_steps` Runge-Kutta steps under the given
    /// constant external input and return the output node states.
    pub fn activate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NeatError> {
        if inputs.len() != self.input_keys.len() {
            return Err(NeatError::Config(format!(
                "expected {} inputs, got {}",
                self.input_keys.len(),
                inputs.len()
            )));
        }

        let h = self.step_size;
        for _ in 0..self.sub_steps {
            let k1 = self.derivative(&self.y, inputs);
            let k2 = self.derivative(&(&self.y + &(&k1 * (h / 2.0))), inputs);
            let k3 = self.derivative(&(&self.y + &(&k2 * (h / 2.0))), inputs);
            let k4 = self.derivative(&(&self.y + &(&k3 * h)), inputs);
            self.y = &self.y + &((k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0));
        }

        Ok(self.output_indices.iter().map(|&i| self.y[i]).collect())
    }
}
