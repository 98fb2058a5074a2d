//! Node activation functions, resolved by name through a registry.
//!
//! The registry ships the usual built-ins and accepts user-registered
//! functions before a run starts. Resolution happens once, at network
//! construction; an unknown name is a configuration error, never a
//! silent no-op.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::NeatError;

/// An activation function applied to the aggregated, biased node input.
pub type ActivationFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

fn sigmoid(x: f64) -> f64 {
    let z = (5.0 * x).clamp(-60.0, 60.0);
    1.0 / (1.0 + (-z).exp())
}

fn tanh(x: f64) -> f64 {
    (2.5 * x).clamp(-60.0, 60.0).tanh()
}

fn sin(x: f64) -> f64 {
    (5.0 * x).clamp(-60.0, 60.0).sin()
}

fn gauss(x: f64) -> f64 {
    let z = x.clamp(-3.4, 3.4);
    (-5.0 * z * z).exp()
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

fn softplus(x: f64) -> f64 {
    let z = (5.0 * x).clamp(-60.0, 60.0);
    0.2 * (1.0 + z.exp()).ln()
}

fn identity(x: f64) -> f64 {
    x
}

fn clamped(x: f64) -> f64 {
    x.clamp(-1.0, 1.0)
}

fn abs(x: f64) -> f64 {
    x.abs()
}

fn hat(x: f64) -> f64 {
    (1.0 - x.abs()).max(0.0)
}

fn square(x: f64) -> f64 {
    x * x
}

fn cube(x: f64) -> f64 {
    x * x * x
}

/// Named activation functions available to genomes.
#[derive(Clone)]
pub struct ActivationRegistry {
    functions: HashMap<String, ActivationFn>,
}

impl Default for ActivationRegistry {
    fn default() -> Self {
        let mut registry = ActivationRegistry { functions: HashMap::new() };
        registry.register("sigmoid", sigmoid);
        registry.register("tanh", tanh);
        registry.register("sin", sin);
        registry.register("gauss", gauss);
        registry.register("relu", relu);
        registry.register("softplus", softplus);
        registry.register("identity", identity);
        registry.register("clamped", clamped);
        registry.register("abs", abs);
        registry.register("hat", hat);
        registry.register("square", square);
        registry.register("cube", cube);
        registry
    }
}

impl ActivationRegistry {
    /// Register a function under the given name, replacing any previous
    /// binding. Must happen before the run starts; genomes refer to
    /// activation functions by name only.
    pub fn register(&mut self, name: &str, f: impl Fn(f64) -> f64 + Send + Sync + 'static) {
        self.functions.insert(name.to_owned(), Arc::new(f));
    }

    /// Resolve a name. Unknown names fail construction.
    pub fn get(&self, name: &str) -> Result<ActivationFn, NeatError> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| NeatError::Config(format!("unknown activation function: {name}")))
    }

    /// Whether the name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}
