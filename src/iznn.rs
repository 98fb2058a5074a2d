//! Izhikevich spiking phenotype.
//!
//! Every node is a spiking neuron with membrane potential `v` and recovery
//! variable `u`:
//!
//!   v' = 0.04v² + 5v + 140 − u + I
//!   u' = a(bv − u)
//!
//! with the after-spike reset `v ← c, u ← u + d` once v reaches 30 mV.
//! The input current I of a node is `bias + response * agg(wⱼᵢ·sⱼ)` where
//! sⱼ is the external input value for input keys and the 0/1 spike output
//! of node j on the previous internal step otherwise. Each `activate` call
//! advances the network by `sub_steps` internal steps of `dt` milliseconds.

use std::collections::HashMap;

use ndarray::Array1;

use crate::aggregations::AggregationFn;
use crate::config::{Config, SpikeOutput};
use crate::errors::NeatError;
use crate::genome::Genome;
use crate::graphs;

enum Link {
    /// Index into the external input slice.
    Input(usize),
    /// Index into the neuron state vectors.
    Node(usize),
}

struct NodeEval {
    aggregation: AggregationFn,
    bias: f64,
    response: f64,
    links: Vec<(Link, f64)>,
}

pub struct IzhikevichNetwork {
    input_keys: Vec<i64>,
    output_indices: Vec<usize>,
    evals: Vec<NodeEval>,
    /// Membrane potential per neuron.
    v: Array1<f64>,
    /// Recovery variable per neuron.
    u: Array1<f64>,
    /// 0/1 spike output of the previous internal step.
    fired: Array1<f64>,
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    dt: f64,
    sub_steps: usize,
    output: SpikeOutput,
}

impl IzhikevichNetwork {
    pub fn create(genome: &Genome, config: &Config) -> Result<IzhikevichNetwork, NeatError> {
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
                aggregation: config.aggregations.get(&node.aggregation)?,
                bias: node.bias,
                response: node.response,
                links,
            });
        }

        let n = keys.len();
        let iznn = &config.iznn;
        Ok(IzhikevichNetwork {
            input_keys,
            output_indices: output_keys.iter().map(|k| index[k]).collect(),
            evals,
            v: Array1::from_elem(n, iznn.c),
            u: Array1::from_elem(n, iznn.b * iznn.c),
            fired: Array1::zeros(n),
            a: iznn.a,
            b: iznn.b,
            c: iznn.c,
            d: iznn.d,
            dt: iznn.dt,
            sub_steps: iznn.sub_steps,
            output: iznn.output,
        })
    }

    /// Return every neuron to its resting state.
    pub fn reset(&mut self) {
        self.v.fill(self.c);
        self.u.fill(self.b * self.c);
        self.fired.fill(0.0);
    }

    /// Advance the network by `sub_steps` internal steps under the given
    /// constant external input.
    ///
    /// In [`SpikeOutput::Spike`] mode an output reads 1.0 when the neuron
    /// fired on any internal step of this call; in
    /// [`SpikeOutput::MembranePotential`] mode it reads the final membrane
    /// potential.
    pub fn activate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NeatError> {
        if inputs.len() != self.input_keys.len() {
            return Err(NeatError::Config(format!(
                "expected {} inputs, got {}",
                self.input_keys.len(),
                inputs.len()
            )));
        }

        let mut spiked = vec![false; self.evals.len()];
        for _ in 0..self.sub_steps {
            let currents: Vec<f64> = self
                .evals
                .iter()
                .map(|eval| {
                    let weighted: Vec<f64> = eval
                        .links
                        .iter()
                        .map(|(link, weight)| {
                            let value = match link {
                                Link::Input(j) => inputs[*j],
                                Link::Node(j) => self.fired[*j],
                            };
                            value * weight
                        })
                        .collect();
                    eval.bias + eval.response * (eval.aggregation)(&weighted)
                })
                .collect();

            for (i, current) in currents.iter().enumerate() {
                // Two half-steps on v for numerical stability near a spike.
                for _ in 0..2 {
                    self.v[i] += 0.5
                        * self.dt
                        * (0.04 * self.v[i] * self.v[i] + 5.0 * self.v[i] + 140.0 - self.u[i]
                            + current);
                }
                self.u[i] += self.dt * self.a * (self.b * self.v[i] - self.u[i]);
                if self.v[i] >= 30.0 {
                    self.fired[i] = 1.0;
                    spiked[i] = true;
                    self.v[i] = self.c;
                    self.u[i] += self.d;
                } else {
                    self.fired[i] = 0.0;
                }
            }
        }

        Ok(self
            .output_indices
            .iter()
            .map(|&i| match self.output {
                SpikeOutput::Spike => {
                    if spiked[i] {
                        1.0
                    } else {
                        0.0
                    }
                }
                SpikeOutput::MembranePotential => self.v[i],
            })
            .collect())
    }
}
