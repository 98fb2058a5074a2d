//! Historical markings.
//!
//! > Whenever a new gene appears (through structural mutation), a global
//! > innovation number is incremented and assigned to that gene. [...]
//! > by keeping a list of the innovations that occurred in the current
//! > generation, it is possible to ensure that when the same structure
//! > arises more than once through independent mutations in the same
//! > generation, each identical mutation is assigned the same innovation
//! > number. [Pag. 108, NEAT](http://nn.cs.utexas.edu/downloads/papers/stanley.ec02.pdf)
//!
//! Connection genes are keyed by their (input, output) node pair, which is
//! self-aligning: two independent add-connection mutations between the same
//! nodes produce the same innovation key by construction. Node keys are the
//! part that needs tracking: splitting the same connection twice in one
//! generation must yield the same new node key in both genomes.
//!
//! The tracker is explicit per-run state owned by the population context,
//! passed by reference into every mutation call. Never an ambient global.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::genome::ConnKey;

/// Issues node keys and deduplicates same-generation connection splits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnovationTracker {
    next_node_key: i64,
    #[serde(with = "crate::genome::map_as_pairs")]
    splits: HashMap<ConnKey, i64>,
}

impl InnovationTracker {
    /// Start the counter past the reserved output keys `0..num_outputs`.
    pub fn new(num_outputs: usize) -> Self {
        InnovationTracker { next_node_key: num_outputs as i64, splits: HashMap::new() }
    }

    /// Resume a checkpointed run with the counter it left off at.
    pub fn with_next_node_key(next_node_key: i64) -> Self {
        InnovationTracker { next_node_key, splits: HashMap::new() }
    }

    /// Forget this generation's split table. Innovation reuse is scoped to
    /// a single generation; the same split next generation is a new
    /// innovation.
    pub fn begin_generation(&mut self) {
        self.splits.clear();
    }

    /// The node key for splitting `conn`. Re-issues the key handed out for
    /// the same split earlier in this generation.
    pub fn node_for_split(&mut self, conn: ConnKey) -> i64 {
        if let Some(&key) = self.splits.get(&conn) {
            return key;
        }
        let key = self.next_node_key;
        self.next_node_key += 1;
        self.splits.insert(conn, key);
        key
    }

    /// An unconditionally fresh node key, bypassing split deduplication.
    /// Needed when a genome splits the same connection twice in one
    /// generation and already contains the shared key.
    pub fn fresh_node_key(&mut self) -> i64 {
        let key = self.next_node_key;
        self.next_node_key += 1;
        key
    }

    /// The next key that would be issued, for checkpointing.
    pub fn next_node_key(&self) -> i64 {
        self.next_node_key
    }
}
