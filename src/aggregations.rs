//! Node aggregation functions: how a node combines its weighted inputs
//! before bias and activation are applied.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::NeatError;

/// Aggregation over the weighted inputs of a node. Called with an empty
/// slice when a node has no incoming enabled connections; the built-ins
/// return 0.0 in that case, except `product`, which returns the empty
/// product 1.0.
pub type AggregationFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

fn product(values: &[f64]) -> f64 {
    values.iter().product()
}

fn max(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn maxabs(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Named aggregation functions available to genomes.
#[derive(Clone)]
pub struct AggregationRegistry {
    functions: HashMap<String, AggregationFn>,
}

impl Default for AggregationRegistry {
    fn default() -> Self {
        let mut registry = AggregationRegistry { functions: HashMap::new() };
        registry.register("sum", sum);
        registry.register("product", product);
        registry.register("max", max);
        registry.register("min", min);
        registry.register("maxabs", maxabs);
        registry.register("mean", mean);
        registry.register("median", median);
        registry
    }
}

impl AggregationRegistry {
    /// Register a function under the given name, replacing any previous
    /// binding.
    pub fn register(&mut self, name: &str, f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) {
        self.functions.insert(name.to_owned(), Arc::new(f));
    }

    /// Resolve a name. Unknown names fail construction.
    pub fn get(&self, name: &str) -> Result<AggregationFn, NeatError> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| NeatError::Config(format!("unknown aggregation function: {name}")))
    }

    /// Whether the name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}
